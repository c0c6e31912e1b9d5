//! One-call entry points that chain the counter update, XP grant, mission and
//! achievement steps behind a user action.
//!
//! The steps are independent writes. When a later step fails the earlier ones
//! stay applied and the whole action is reported as failed.

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::{
    AchievementUnlockedPayload, EventBus, HabitToggledPayload, LevelUpPayload,
    MissionCompletedPayload, ProgressEvent, XpAwardedPayload,
};
use crate::db::{DocumentStore, StoreError};
use crate::services::achievements::{self, Achievement, AchievementCategory, AchievementUpdate};
use crate::services::daily_counter;
use crate::services::habits::{self, HabitError};
use crate::services::missions::{self, Mission, MissionCompletion, MissionError, MissionType};
use crate::services::progress::{self, XpChange};

pub const XP_PER_WORD: i64 = 5;
pub const XP_PER_POMODORO: i64 = 20;
pub const XP_PER_HABIT: i64 = 10;
pub const XP_HABIT_UNDO_PENALTY: i64 = -5;
pub const MAX_SESSION_WORDS: i64 = 1000;
pub const MAX_SESSION_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickActionResult {
    pub success: bool,
    pub message: String,
    pub xp_earned: i64,
    pub unlocked_achievements: Vec<Achievement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_mission: Option<Mission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<i64>,
}

impl QuickActionResult {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            xp_earned: 0,
            unlocked_achievements: Vec::new(),
            completed_mission: None,
            level: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum QuickActionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Mission(#[from] MissionError),
    #[error(transparent)]
    Habit(#[from] HabitError),
}

/// Accumulates what one action earned and announces it on the bus.
struct Rewards<'a> {
    store: &'a DocumentStore,
    events: &'a EventBus,
    user_id: &'a str,
    day: NaiveDate,
    xp_earned: i64,
    unlocked: Vec<Achievement>,
    mission: Option<Mission>,
    level: i64,
}

impl<'a> Rewards<'a> {
    fn new(store: &'a DocumentStore, events: &'a EventBus, user_id: &'a str, day: NaiveDate) -> Self {
        Self {
            store,
            events,
            user_id,
            day,
            xp_earned: 0,
            unlocked: Vec::new(),
            mission: None,
            level: 1,
        }
    }

    async fn grant_xp(&mut self, delta: i64, source: &str) -> Result<(), StoreError> {
        let (change, level_rewards) =
            achievements::credit_xp(self.store, self.user_id, delta, self.day).await?;
        self.xp_earned = self.xp_earned.saturating_add(change.applied);
        self.level = change.level;
        announce_xp(self.events, self.user_id, &change, source).await;
        if !level_rewards.unlocked.is_empty() {
            announce_unlocks(self.events, self.user_id, &level_rewards.unlocked).await;
            self.unlocked.extend(level_rewards.unlocked);
        }
        Ok(())
    }

    async fn achievements(&mut self, update: AchievementUpdate) -> Result<(), StoreError> {
        if update.unlocked.is_empty() {
            return Ok(());
        }
        announce_unlocks(self.events, self.user_id, &update.unlocked).await;
        self.unlocked.extend(update.unlocked);
        self.grant_xp(update.xp_awarded, "achievement").await
    }

    async fn mission(&mut self, mission_type: MissionType) -> Result<(), MissionError> {
        if let Some(completion) =
            missions::complete_mission_by_type(self.store, self.user_id, mission_type, self.day).await?
        {
            announce_mission(self.events, self.user_id, &completion).await;
            self.xp_earned = self.xp_earned.saturating_add(completion.xp_earned);
            self.level = completion.xp_change.level;
            self.unlocked.extend(completion.unlocked_achievements.iter().copied());
            self.mission = Some(completion.mission);
        }
        Ok(())
    }

    /// Streak is a gauge, read back once the session's XP has landed.
    async fn gauges(&mut self) -> Result<(), StoreError> {
        let current = progress::load_user_progress(self.store, self.user_id).await?;
        let update = achievements::raise_achievement_progress(
            self.store,
            self.user_id,
            AchievementCategory::Streak,
            current.streak,
        )
        .await?;
        self.achievements(update).await?;

        self.level = progress::load_user_progress(self.store, self.user_id).await?.level;
        Ok(())
    }

    fn finish(self, message: String) -> QuickActionResult {
        QuickActionResult {
            success: true,
            message,
            xp_earned: self.xp_earned,
            unlocked_achievements: self.unlocked,
            completed_mission: self.mission,
            level: Some(self.level),
        }
    }
}

pub(crate) async fn announce_xp(events: &EventBus, user_id: &str, change: &XpChange, source: &str) {
    if change.applied != 0 {
        events
            .publish(ProgressEvent::XpAwarded(XpAwardedPayload {
                user_id: user_id.to_string(),
                delta: change.applied,
                total_xp: change.xp,
                source: source.to_string(),
            }))
            .await;
    }
    if change.leveled_up() {
        events
            .publish(ProgressEvent::LevelUp(LevelUpPayload {
                user_id: user_id.to_string(),
                previous_level: change.previous_level,
                level: change.level,
            }))
            .await;
    }
}

pub(crate) async fn announce_unlocks(events: &EventBus, user_id: &str, unlocked: &[Achievement]) {
    for achievement in unlocked {
        events
            .publish(ProgressEvent::AchievementUnlocked(AchievementUnlockedPayload {
                user_id: user_id.to_string(),
                achievement_id: achievement.id.to_string(),
                title: achievement.title.to_string(),
                xp_reward: achievement.xp_reward,
            }))
            .await;
    }
}

pub(crate) async fn announce_mission(events: &EventBus, user_id: &str, completion: &MissionCompletion) {
    events
        .publish(ProgressEvent::MissionCompleted(MissionCompletedPayload {
            user_id: user_id.to_string(),
            mission_id: completion.mission.id.clone(),
            xp: completion.mission.xp,
        }))
        .await;
    announce_unlocks(events, user_id, &completion.unlocked_achievements).await;
    announce_xp(events, user_id, &completion.xp_change, "mission").await;
}

pub async fn complete_flashcard_session(
    store: &DocumentStore,
    events: &EventBus,
    user_id: &str,
    words_learned: i64,
    minutes: i64,
    day: NaiveDate,
) -> QuickActionResult {
    let words_learned = words_learned.clamp(0, MAX_SESSION_WORDS);
    let minutes = minutes.clamp(0, MAX_SESSION_MINUTES);
    match flashcard_session(store, events, user_id, words_learned, minutes, day).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(user_id, error = %e, "flashcard session failed");
            QuickActionResult::failed("Không thể lưu phiên học thẻ từ. Vui lòng thử lại.")
        }
    }
}

async fn flashcard_session(
    store: &DocumentStore,
    events: &EventBus,
    user_id: &str,
    words_learned: i64,
    minutes: i64,
    day: NaiveDate,
) -> Result<QuickActionResult, QuickActionError> {
    let mut rewards = Rewards::new(store, events, user_id, day);

    daily_counter::record_flashcard_activity(store, user_id, words_learned, minutes, day).await?;
    progress::record_activity(store, user_id, words_learned, day).await?;
    rewards.grant_xp(words_learned.saturating_mul(XP_PER_WORD), "flashcards").await?;
    rewards.mission(MissionType::Review).await?;

    let mut update =
        achievements::update_achievement_progress(store, user_id, AchievementCategory::Words, words_learned)
            .await?;
    update.merge(
        achievements::update_achievement_progress(store, user_id, AchievementCategory::Time, minutes).await?,
    );
    rewards.achievements(update).await?;
    rewards.gauges().await?;

    tracing::info!(user_id, words_learned, minutes, xp = rewards.xp_earned, "flashcard session completed");
    let message = format!(
        "Hoàn thành phiên học: {} từ mới, +{} XP",
        words_learned, rewards.xp_earned
    );
    Ok(rewards.finish(message))
}

pub async fn complete_pomodoro_session(
    store: &DocumentStore,
    events: &EventBus,
    user_id: &str,
    minutes: i64,
    day: NaiveDate,
) -> QuickActionResult {
    match pomodoro_session(store, events, user_id, minutes.clamp(0, MAX_SESSION_MINUTES), day).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(user_id, error = %e, "pomodoro session failed");
            QuickActionResult::failed("Không thể lưu phiên Pomodoro. Vui lòng thử lại.")
        }
    }
}

async fn pomodoro_session(
    store: &DocumentStore,
    events: &EventBus,
    user_id: &str,
    minutes: i64,
    day: NaiveDate,
) -> Result<QuickActionResult, QuickActionError> {
    let mut rewards = Rewards::new(store, events, user_id, day);

    daily_counter::record_pomodoro_activity(store, user_id, 1, minutes, day).await?;
    rewards.grant_xp(XP_PER_POMODORO, "pomodoro").await?;
    rewards.mission(MissionType::Pomodoro).await?;

    let mut update =
        achievements::update_achievement_progress(store, user_id, AchievementCategory::Pomodoro, 1).await?;
    update.merge(
        achievements::update_achievement_progress(store, user_id, AchievementCategory::Time, minutes).await?,
    );
    rewards.achievements(update).await?;
    rewards.gauges().await?;

    tracing::info!(user_id, minutes, xp = rewards.xp_earned, "pomodoro session completed");
    let message = format!("Hoàn thành phiên Pomodoro {} phút, +{} XP", minutes, rewards.xp_earned);
    Ok(rewards.finish(message))
}

pub async fn toggle_habit_completion(
    store: &DocumentStore,
    events: &EventBus,
    user_id: &str,
    habit_id: &str,
    day: NaiveDate,
) -> QuickActionResult {
    match habit_toggle(store, events, user_id, habit_id, day).await {
        Ok(result) => result,
        Err(QuickActionError::Habit(HabitError::NotFound(_))) => {
            QuickActionResult::failed("Không tìm thấy thói quen.")
        }
        Err(e) => {
            tracing::error!(user_id, habit_id, error = %e, "habit toggle failed");
            QuickActionResult::failed("Không thể cập nhật thói quen. Vui lòng thử lại.")
        }
    }
}

async fn habit_toggle(
    store: &DocumentStore,
    events: &EventBus,
    user_id: &str,
    habit_id: &str,
    day: NaiveDate,
) -> Result<QuickActionResult, QuickActionError> {
    let mut rewards = Rewards::new(store, events, user_id, day);

    let habit = habits::toggle_habit(store, user_id, habit_id, day).await?;
    events
        .publish(ProgressEvent::HabitToggled(HabitToggledPayload {
            user_id: user_id.to_string(),
            habit_id: habit.id.clone(),
            completed: habit.today_completed,
            current_streak: habit.current_streak,
        }))
        .await;

    if habit.today_completed {
        rewards.grant_xp(XP_PER_HABIT, "habit").await?;
        rewards.mission(MissionType::Habit).await?;
    } else {
        rewards.grant_xp(XP_HABIT_UNDO_PENALTY, "habit").await?;
    }
    rewards.gauges().await?;

    let message = if habit.today_completed {
        format!("Đã hoàn thành \"{}\", +{} XP", habit.title, rewards.xp_earned)
    } else {
        format!("Đã bỏ đánh dấu \"{}\"", habit.title)
    };
    Ok(rewards.finish(message))
}
