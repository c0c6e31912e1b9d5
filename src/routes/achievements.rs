use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::response::{ok, AppError};
use crate::routes::require_user;
use crate::services::achievements::{self, Achievement, AchievementCategory, AchievementStatus, ACHIEVEMENTS};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_user_achievements))
        .route("/catalog", get(get_catalog))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserAchievementsData {
    achievements: Vec<AchievementStatus>,
    grouped: BTreeMap<String, Vec<AchievementStatus>>,
    total_count: usize,
    unlocked_count: usize,
}

async fn get_user_achievements(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let statuses = achievements::get_user_achievements(state.store(), &user.id).await?;

    let mut grouped: BTreeMap<String, Vec<AchievementStatus>> = BTreeMap::new();
    for status in &statuses {
        grouped
            .entry(status.achievement.category.as_str().to_string())
            .or_default()
            .push(status.clone());
    }

    Ok(ok(UserAchievementsData {
        total_count: statuses.len(),
        unlocked_count: statuses.iter().filter(|s| s.unlocked).count(),
        grouped,
        achievements: statuses,
    }))
}

#[derive(Debug, Deserialize)]
struct CatalogQuery {
    category: Option<String>,
}

async fn get_catalog(Query(query): Query<CatalogQuery>) -> Result<impl IntoResponse, AppError> {
    let catalog: Vec<&'static Achievement> = match query.category.as_deref() {
        Some(raw) => {
            let category = AchievementCategory::parse(raw)
                .ok_or_else(|| AppError::validation("Danh mục thành tựu không hợp lệ"))?;
            achievements::achievements_in(category).collect()
        }
        None => ACHIEVEMENTS.iter().collect(),
    };
    Ok(ok(catalog))
}
