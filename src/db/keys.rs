use chrono::NaiveDate;

pub const USER_PROGRESS: &str = "user_progress";
pub const DAILY_STATS: &str = "daily_stats";
pub const FLASHCARD_STATS: &str = "flashcard_stats";
pub const POMODORO_STATS: &str = "pomodoro_stats";
pub const HABIT_STATS: &str = "habit_stats";
pub const HABITS: &str = "habits";
pub const HABIT_COMPLETIONS: &str = "habit_completions";
pub const HABIT_RESETS: &str = "habit_resets";
pub const DAILY_MISSIONS: &str = "daily_missions";
pub const USER_ACHIEVEMENTS: &str = "user_achievements";
pub const DECKS: &str = "decks";
pub const PREFERENCES: &str = "preferences";

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `{userId}_{date}`
pub fn daily_doc_id(user_id: &str, date: NaiveDate) -> String {
    format!("{}_{}", user_id, date_key(date))
}

/// `{userId}_{habitId}_{date}`
pub fn habit_day_doc_id(user_id: &str, habit_id: &str, date: NaiveDate) -> String {
    format!("{}_{}_{}", user_id, habit_id, date_key(date))
}

pub fn user_achievement_doc_id(user_id: &str, achievement_id: &str) -> String {
    format!("{}_{}", user_id, achievement_id)
}
