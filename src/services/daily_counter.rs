use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::keys::{
    self, DAILY_STATS, FLASHCARD_STATS, HABIT_COMPLETIONS, HABIT_STATS, POMODORO_STATS,
};
use crate::db::{DocumentStore, StoreError};
use crate::services::progress::daily_stats_seed;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyStats {
    pub user_id: String,
    pub date: String,
    pub words_learned: i64,
    pub study_time: i64,
    pub missions_completed: i64,
    pub xp_earned: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlashcardDayStats {
    pub user_id: String,
    pub date: String,
    pub words_learned: i64,
    pub study_minutes: i64,
    pub sessions: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PomodoroDayStats {
    pub user_id: String,
    pub date: String,
    pub sessions_completed: i64,
    pub focus_minutes: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HabitDayStats {
    pub user_id: String,
    pub date: String,
    pub completed: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitCompletion {
    pub user_id: String,
    pub habit_id: String,
    pub date: String,
    pub completed: bool,
    pub updated_at: String,
}

pub async fn record_flashcard_activity(
    store: &DocumentStore,
    user_id: &str,
    words_learned: i64,
    minutes: i64,
    day: NaiveDate,
) -> Result<(), StoreError> {
    let doc_id = keys::daily_doc_id(user_id, day);
    let (words_learned, minutes) = (words_learned.max(0), minutes.max(0));

    store
        .increment(
            FLASHCARD_STATS,
            &doc_id,
            json!({ "userId": user_id, "date": keys::date_key(day) }),
            &[
                ("wordsLearned", words_learned),
                ("studyMinutes", minutes),
                ("sessions", 1),
            ],
        )
        .await?;
    store
        .increment(
            DAILY_STATS,
            &doc_id,
            daily_stats_seed(user_id, day),
            &[("wordsLearned", words_learned), ("studyTime", minutes)],
        )
        .await?;

    tracing::debug!(user_id, words_learned, minutes, "flashcard activity recorded");
    Ok(())
}

pub async fn record_pomodoro_activity(
    store: &DocumentStore,
    user_id: &str,
    count: i64,
    minutes: i64,
    day: NaiveDate,
) -> Result<(), StoreError> {
    let doc_id = keys::daily_doc_id(user_id, day);
    let (count, minutes) = (count.max(0), minutes.max(0));

    store
        .increment(
            POMODORO_STATS,
            &doc_id,
            json!({ "userId": user_id, "date": keys::date_key(day) }),
            &[("sessionsCompleted", count), ("focusMinutes", minutes)],
        )
        .await?;
    store
        .increment(
            DAILY_STATS,
            &doc_id,
            daily_stats_seed(user_id, day),
            &[("studyTime", minutes)],
        )
        .await?;

    tracing::debug!(user_id, count, minutes, "pomodoro activity recorded");
    Ok(())
}

/// Stores the per-habit flag for `day` and moves the day's completion counter.
/// Re-recording the same state leaves the counter untouched.
pub async fn record_habit_completion(
    store: &DocumentStore,
    user_id: &str,
    habit_id: &str,
    completed: bool,
    day: NaiveDate,
) -> Result<(), StoreError> {
    let completion_id = keys::habit_day_doc_id(user_id, habit_id, day);
    let previous = store
        .get::<HabitCompletion>(HABIT_COMPLETIONS, &completion_id)
        .await?
        .map(|c| c.completed)
        .unwrap_or(false);

    store
        .set(
            HABIT_COMPLETIONS,
            &completion_id,
            &HabitCompletion {
                user_id: user_id.to_string(),
                habit_id: habit_id.to_string(),
                date: keys::date_key(day),
                completed,
                updated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        )
        .await?;

    let delta = match (previous, completed) {
        (false, true) => 1,
        (true, false) => -1,
        _ => 0,
    };
    if delta != 0 {
        store
            .increment(
                HABIT_STATS,
                &keys::daily_doc_id(user_id, day),
                json!({ "userId": user_id, "date": keys::date_key(day) }),
                &[("completed", delta)],
            )
            .await?;
    }

    tracing::debug!(user_id, habit_id, completed, "habit completion recorded");
    Ok(())
}

pub async fn record_mission_completed(
    store: &DocumentStore,
    user_id: &str,
    day: NaiveDate,
) -> Result<(), StoreError> {
    store
        .increment(
            DAILY_STATS,
            &keys::daily_doc_id(user_id, day),
            daily_stats_seed(user_id, day),
            &[("missionsCompleted", 1)],
        )
        .await
}

pub async fn habit_completed_on(
    store: &DocumentStore,
    user_id: &str,
    habit_id: &str,
    day: NaiveDate,
) -> Result<bool, StoreError> {
    Ok(store
        .get::<HabitCompletion>(
            HABIT_COMPLETIONS,
            &keys::habit_day_doc_id(user_id, habit_id, day),
        )
        .await?
        .is_some_and(|c| c.completed))
}

pub async fn get_daily_stats(
    store: &DocumentStore,
    user_id: &str,
    day: NaiveDate,
) -> Result<DailyStats, StoreError> {
    Ok(store
        .get(DAILY_STATS, &keys::daily_doc_id(user_id, day))
        .await?
        .unwrap_or_else(|| DailyStats {
            user_id: user_id.to_string(),
            date: keys::date_key(day),
            ..DailyStats::default()
        }))
}

pub async fn get_flashcard_stats(
    store: &DocumentStore,
    user_id: &str,
    day: NaiveDate,
) -> Result<FlashcardDayStats, StoreError> {
    Ok(store
        .get(FLASHCARD_STATS, &keys::daily_doc_id(user_id, day))
        .await?
        .unwrap_or_default())
}

pub async fn get_pomodoro_stats(
    store: &DocumentStore,
    user_id: &str,
    day: NaiveDate,
) -> Result<PomodoroDayStats, StoreError> {
    Ok(store
        .get(POMODORO_STATS, &keys::daily_doc_id(user_id, day))
        .await?
        .unwrap_or_default())
}

pub async fn get_habit_stats(
    store: &DocumentStore,
    user_id: &str,
    day: NaiveDate,
) -> Result<HabitDayStats, StoreError> {
    Ok(store
        .get(HABIT_STATS, &keys::daily_doc_id(user_id, day))
        .await?
        .unwrap_or_default())
}
