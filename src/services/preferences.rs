use serde::{Deserialize, Serialize};

use crate::db::keys::PREFERENCES;
use crate::db::{DocumentStore, StoreError};

const MIN_FONT_SCALE: f64 = 0.75;
const MAX_FONT_SCALE: f64 = 2.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub has_seen_onboarding: bool,
    pub theme: Theme,
    pub font_scale: f64,
    pub high_contrast: bool,
    pub reduced_motion: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            has_seen_onboarding: false,
            theme: Theme::System,
            font_scale: 1.0,
            high_contrast: false,
            reduced_motion: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    pub has_seen_onboarding: Option<bool>,
    pub theme: Option<Theme>,
    pub font_scale: Option<f64>,
    pub high_contrast: Option<bool>,
    pub reduced_motion: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum PreferencesError {
    #[error("fontScale must be between {MIN_FONT_SCALE} and {MAX_FONT_SCALE}")]
    FontScale,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn get_preferences(store: &DocumentStore, user_id: &str) -> Result<Preferences, StoreError> {
    Ok(store.get(PREFERENCES, user_id).await?.unwrap_or_default())
}

pub async fn update_preferences(
    store: &DocumentStore,
    user_id: &str,
    patch: PreferencesPatch,
) -> Result<Preferences, PreferencesError> {
    if let Some(scale) = patch.font_scale {
        if !scale.is_finite() || !(MIN_FONT_SCALE..=MAX_FONT_SCALE).contains(&scale) {
            return Err(PreferencesError::FontScale);
        }
    }

    let mut prefs = get_preferences(store, user_id).await?;
    if let Some(v) = patch.has_seen_onboarding {
        prefs.has_seen_onboarding = v;
    }
    if let Some(v) = patch.theme {
        prefs.theme = v;
    }
    if let Some(v) = patch.font_scale {
        prefs.font_scale = v;
    }
    if let Some(v) = patch.high_contrast {
        prefs.high_contrast = v;
    }
    if let Some(v) = patch.reduced_motion {
        prefs.reduced_motion = v;
    }

    store.set(PREFERENCES, user_id, &prefs).await?;
    Ok(prefs)
}
