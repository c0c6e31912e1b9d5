use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::db::keys::{self, DAILY_MISSIONS};
use crate::db::{DocumentStore, StoreError};
use crate::services::achievements::{self, Achievement, AchievementCategory};
use crate::services::daily_counter;
use crate::services::progress::XpChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionType {
    Review,
    Quiz,
    Challenge,
    Pomodoro,
    Habit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub xp: i64,
    #[serde(rename = "type")]
    pub mission_type: MissionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMissions {
    pub user_id: String,
    pub date: String,
    pub missions: Vec<Mission>,
    pub completed_count: i64,
    #[serde(rename = "totalXP")]
    pub total_xp: i64,
}

struct MissionTemplate {
    id: &'static str,
    text: &'static str,
    xp: i64,
    mission_type: MissionType,
}

const TEMPLATES: [MissionTemplate; 5] = [
    MissionTemplate {
        id: "review_cards",
        text: "Ôn tập 10 thẻ từ vựng",
        xp: 20,
        mission_type: MissionType::Review,
    },
    MissionTemplate {
        id: "daily_quiz",
        text: "Hoàn thành một bài kiểm tra nhanh",
        xp: 30,
        mission_type: MissionType::Quiz,
    },
    MissionTemplate {
        id: "learn_new_words",
        text: "Học 5 từ mới",
        xp: 25,
        mission_type: MissionType::Challenge,
    },
    MissionTemplate {
        id: "focus_session",
        text: "Hoàn thành một phiên Pomodoro",
        xp: 20,
        mission_type: MissionType::Pomodoro,
    },
    MissionTemplate {
        id: "keep_habit",
        text: "Hoàn thành một thói quen hôm nay",
        xp: 15,
        mission_type: MissionType::Habit,
    },
];

impl DailyMissions {
    fn from_templates(user_id: &str, day: NaiveDate) -> Self {
        Self {
            user_id: user_id.to_string(),
            date: keys::date_key(day),
            missions: TEMPLATES
                .iter()
                .map(|t| Mission {
                    id: t.id.to_string(),
                    text: t.text.to_string(),
                    completed: false,
                    xp: t.xp,
                    mission_type: t.mission_type,
                    completed_at: None,
                })
                .collect(),
            completed_count: 0,
            total_xp: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MissionError {
    #[error("mission not found: {0}")]
    NotFound(String),
    #[error("mission already completed: {0}")]
    AlreadyCompleted(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionCompletion {
    pub mission: Mission,
    pub missions: DailyMissions,
    pub xp_earned: i64,
    pub unlocked_achievements: Vec<Achievement>,
    pub xp_change: XpChange,
}

pub async fn get_daily_missions(
    store: &DocumentStore,
    user_id: &str,
    day: NaiveDate,
) -> Result<DailyMissions, StoreError> {
    let doc_id = keys::daily_doc_id(user_id, day);
    if let Some(missions) = store.get::<DailyMissions>(DAILY_MISSIONS, &doc_id).await? {
        return Ok(missions);
    }

    let missions = DailyMissions::from_templates(user_id, day);
    store.set(DAILY_MISSIONS, &doc_id, &missions).await?;
    tracing::info!(user_id, date = %missions.date, "daily missions generated");
    Ok(missions)
}

/// Marks a mission done and pays out its XP plus any `missions` or `level`
/// achievements it unlocks.
pub async fn complete_mission(
    store: &DocumentStore,
    user_id: &str,
    mission_id: &str,
    day: NaiveDate,
) -> Result<MissionCompletion, MissionError> {
    let mut missions = get_daily_missions(store, user_id, day).await?;

    let mission = missions
        .missions
        .iter_mut()
        .find(|m| m.id == mission_id)
        .ok_or_else(|| MissionError::NotFound(mission_id.to_string()))?;
    if mission.completed {
        return Err(MissionError::AlreadyCompleted(mission_id.to_string()));
    }

    mission.completed = true;
    mission.completed_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
    let mission = mission.clone();

    missions.completed_count = missions.missions.iter().filter(|m| m.completed).count() as i64;
    missions.total_xp += mission.xp;
    store
        .set(DAILY_MISSIONS, &keys::daily_doc_id(user_id, day), &missions)
        .await?;

    daily_counter::record_mission_completed(store, user_id, day).await?;
    let mut update =
        achievements::update_achievement_progress(store, user_id, AchievementCategory::Missions, 1)
            .await?;
    let (xp_change, level_rewards) =
        achievements::credit_xp(store, user_id, mission.xp + update.xp_awarded, day).await?;
    update.merge(level_rewards);
    let xp_earned = mission.xp + update.xp_awarded;

    tracing::info!(user_id, mission_id, xp_earned, "mission completed");

    Ok(MissionCompletion {
        mission,
        missions,
        xp_earned,
        unlocked_achievements: update.unlocked,
        xp_change,
    })
}

/// Completes the first open mission of `mission_type`. `None` means there was
/// nothing left to complete.
pub async fn complete_mission_by_type(
    store: &DocumentStore,
    user_id: &str,
    mission_type: MissionType,
    day: NaiveDate,
) -> Result<Option<MissionCompletion>, MissionError> {
    let missions = get_daily_missions(store, user_id, day).await?;
    let Some(open) = missions
        .missions
        .iter()
        .find(|m| m.mission_type == mission_type && !m.completed)
    else {
        return Ok(None);
    };

    complete_mission(store, user_id, &open.id, day).await.map(Some)
}
