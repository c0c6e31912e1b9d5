use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::keys::{self, DAILY_STATS, USER_PROGRESS};
use crate::db::{DocumentStore, StoreError};

pub const XP_PER_LEVEL: i64 = 100;
pub const DEFAULT_DAILY_GOAL: i64 = 20;
const MAX_DAILY_GOAL: i64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub user_id: String,
    pub today_progress: i64,
    pub daily_goal: i64,
    pub total_words_learned: i64,
    pub streak: i64,
    pub level: i64,
    pub xp: i64,
    #[serde(default)]
    pub last_active_date: Option<String>,
}

impl UserProgress {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            today_progress: 0,
            daily_goal: DEFAULT_DAILY_GOAL,
            total_words_learned: 0,
            streak: 0,
            level: 1,
            xp: 0,
            last_active_date: None,
        }
    }

    pub fn xp_to_next_level(&self) -> i64 {
        XP_PER_LEVEL - self.xp.max(0) % XP_PER_LEVEL
    }

    fn last_active(&self) -> Option<NaiveDate> {
        self.last_active_date
            .as_deref()
            .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XpChange {
    pub applied: i64,
    pub xp: i64,
    pub previous_level: i64,
    pub level: i64,
}

impl XpChange {
    pub fn leveled_up(&self) -> bool {
        self.level > self.previous_level
    }
}

pub fn level_for_xp(xp: i64) -> i64 {
    xp.max(0) / XP_PER_LEVEL + 1
}

/// Streak after an activity on `today`: unchanged on the same day, +1 when the
/// previous active day was yesterday, otherwise a fresh streak of one.
pub fn next_streak(streak: i64, last_active: Option<NaiveDate>, today: NaiveDate) -> i64 {
    match last_active {
        Some(last) if last == today => streak.max(1),
        Some(last) if today.pred_opt() == Some(last) => streak.saturating_add(1),
        _ => 1,
    }
}

/// Reads the progress record without creating it.
pub async fn load_user_progress(
    store: &DocumentStore,
    user_id: &str,
) -> Result<UserProgress, StoreError> {
    Ok(store
        .get::<UserProgress>(USER_PROGRESS, user_id)
        .await?
        .unwrap_or_else(|| UserProgress::new(user_id)))
}

pub async fn get_user_progress(
    store: &DocumentStore,
    user_id: &str,
    default_daily_goal: i64,
) -> Result<UserProgress, StoreError> {
    if let Some(progress) = store.get::<UserProgress>(USER_PROGRESS, user_id).await? {
        return Ok(progress);
    }

    let mut progress = UserProgress::new(user_id);
    progress.daily_goal = default_daily_goal;
    store.set(USER_PROGRESS, user_id, &progress).await?;
    tracing::info!(user_id, "user progress created");
    Ok(progress)
}

/// Adds `delta` XP (negative for penalties) and recomputes the level.
/// XP never drops below zero, so the level never drops below one.
pub async fn add_xp(
    store: &DocumentStore,
    user_id: &str,
    delta: i64,
    day: NaiveDate,
) -> Result<XpChange, StoreError> {
    let mut progress = load_user_progress(store, user_id).await?;
    let previous_level = progress.level;
    let previous_xp = progress.xp;

    progress.xp = progress.xp.saturating_add(delta).max(0);
    progress.level = level_for_xp(progress.xp);
    let applied = progress.xp - previous_xp;

    store.set(USER_PROGRESS, user_id, &progress).await?;

    if applied != 0 {
        store
            .increment(
                DAILY_STATS,
                &keys::daily_doc_id(user_id, day),
                daily_stats_seed(user_id, day),
                &[("xpEarned", applied)],
            )
            .await?;
    }

    tracing::debug!(user_id, delta, applied, xp = progress.xp, level = progress.level, "xp updated");

    Ok(XpChange {
        applied,
        xp: progress.xp,
        previous_level,
        level: progress.level,
    })
}

/// Registers study activity on `day`: rolls `todayProgress` over on a new day,
/// adds learned words and advances the streak.
pub async fn record_activity(
    store: &DocumentStore,
    user_id: &str,
    words_learned: i64,
    day: NaiveDate,
) -> Result<UserProgress, StoreError> {
    let mut progress = load_user_progress(store, user_id).await?;
    let last_active = progress.last_active();
    let words_learned = words_learned.max(0);

    if last_active != Some(day) {
        progress.today_progress = 0;
    }
    progress.streak = next_streak(progress.streak, last_active, day);
    progress.today_progress = progress.today_progress.saturating_add(words_learned);
    progress.total_words_learned = progress.total_words_learned.saturating_add(words_learned);
    progress.last_active_date = Some(keys::date_key(day));

    store.set(USER_PROGRESS, user_id, &progress).await?;

    Ok(progress)
}

pub async fn set_daily_goal(
    store: &DocumentStore,
    user_id: &str,
    goal: i64,
) -> Result<Option<UserProgress>, StoreError> {
    if !(1..=MAX_DAILY_GOAL).contains(&goal) {
        return Ok(None);
    }

    let mut progress = load_user_progress(store, user_id).await?;
    progress.daily_goal = goal;
    store.set(USER_PROGRESS, user_id, &progress).await?;
    Ok(Some(progress))
}

pub(crate) fn daily_stats_seed(user_id: &str, day: NaiveDate) -> serde_json::Value {
    json!({
        "userId": user_id,
        "date": keys::date_key(day),
        "wordsLearned": 0,
        "studyTime": 0,
        "missionsCompleted": 0,
        "xpEarned": 0,
    })
}
