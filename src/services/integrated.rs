use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::{keys, DocumentStore, StoreError};
use crate::services::daily_counter;
use crate::services::habits;
use crate::services::progress::{self, DEFAULT_DAILY_GOAL};

const AGGREGATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Flat read-only view over the learner's counters. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegratedProgress {
    pub user_id: String,
    pub words_learned_today: i64,
    pub flashcard_minutes_today: i64,
    pub flashcard_sessions_today: i64,
    pub pomodoros_today: i64,
    pub focus_minutes_today: i64,
    pub habits_completed_today: i64,
    pub habits_completed_this_week: i64,
    pub today_progress: i64,
    pub daily_goal: i64,
    pub total_words_learned: i64,
    pub streak: i64,
    pub level: i64,
    pub xp: i64,
    pub xp_to_next_level: i64,
}

impl IntegratedProgress {
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            words_learned_today: 0,
            flashcard_minutes_today: 0,
            flashcard_sessions_today: 0,
            pomodoros_today: 0,
            focus_minutes_today: 0,
            habits_completed_today: 0,
            habits_completed_this_week: 0,
            today_progress: 0,
            daily_goal: DEFAULT_DAILY_GOAL,
            total_words_learned: 0,
            streak: 0,
            level: 1,
            xp: 0,
            xp_to_next_level: progress::XP_PER_LEVEL,
        }
    }
}

/// Never fails: a store error or a slow store yields [`IntegratedProgress::empty`].
pub async fn get_integrated_progress(
    store: &DocumentStore,
    user_id: &str,
    day: NaiveDate,
) -> IntegratedProgress {
    match tokio::time::timeout(AGGREGATION_TIMEOUT, aggregate(store, user_id, day)).await {
        Ok(Ok(progress)) => progress,
        Ok(Err(e)) => {
            tracing::warn!(user_id, error = %e, "integrated progress failed, using defaults");
            IntegratedProgress::empty(user_id)
        }
        Err(_) => {
            tracing::warn!(user_id, "integrated progress timed out, using defaults");
            IntegratedProgress::empty(user_id)
        }
    }
}

async fn aggregate(
    store: &DocumentStore,
    user_id: &str,
    day: NaiveDate,
) -> Result<IntegratedProgress, StoreError> {
    let (flashcards, pomodoro, habits_today, week, base) = tokio::join!(
        daily_counter::get_flashcard_stats(store, user_id, day),
        daily_counter::get_pomodoro_stats(store, user_id, day),
        daily_counter::get_habit_stats(store, user_id, day),
        habits::calculate_weekly_habit_progress(store, user_id, day),
        progress::load_user_progress(store, user_id),
    );
    let (flashcards, pomodoro, habits_today, base) = (flashcards?, pomodoro?, habits_today?, base?);

    // A stale todayProgress belongs to the last active day, not today.
    let today_progress = if base.last_active_date.as_deref() == Some(keys::date_key(day).as_str()) {
        base.today_progress
    } else {
        0
    };

    Ok(IntegratedProgress {
        user_id: user_id.to_string(),
        words_learned_today: flashcards.words_learned,
        flashcard_minutes_today: flashcards.study_minutes,
        flashcard_sessions_today: flashcards.sessions,
        pomodoros_today: pomodoro.sessions_completed,
        focus_minutes_today: pomodoro.focus_minutes,
        habits_completed_today: habits_today.completed,
        habits_completed_this_week: week.iter().map(|d| d.completed).sum(),
        today_progress,
        daily_goal: base.daily_goal,
        total_words_learned: base.total_words_learned,
        streak: base.streak,
        level: base.level,
        xp: base.xp,
        xp_to_next_level: base.xp_to_next_level(),
    })
}
