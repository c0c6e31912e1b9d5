//! Static achievement catalog and per-user unlock tracking.
//!
//! Progress for an achievement only ever grows and an unlocked achievement is
//! never evaluated again, so its XP reward is paid exactly once.

use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::db::keys::{self, USER_ACHIEVEMENTS};
use crate::db::{DocumentStore, StoreError};
use crate::services::progress::{self, XpChange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Words,
    Streak,
    Pomodoro,
    Level,
    Missions,
    Time,
}

impl AchievementCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Words => "words",
            Self::Streak => "streak",
            Self::Pomodoro => "pomodoro",
            Self::Level => "level",
            Self::Missions => "missions",
            Self::Time => "time",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "words" => Some(Self::Words),
            "streak" => Some(Self::Streak),
            "pomodoro" => Some(Self::Pomodoro),
            "level" => Some(Self::Level),
            "missions" => Some(Self::Missions),
            "time" => Some(Self::Time),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub category: AchievementCategory,
    pub requirement: i64,
    pub xp_reward: i64,
    pub rarity: Rarity,
}

impl Achievement {
    const fn new(
        id: &'static str,
        title: &'static str,
        description: &'static str,
        icon: &'static str,
        category: AchievementCategory,
        requirement: i64,
        xp_reward: i64,
        rarity: Rarity,
    ) -> Self {
        Self {
            id,
            title,
            description,
            icon,
            category,
            requirement,
            xp_reward,
            rarity,
        }
    }
}

use AchievementCategory::{Level, Missions, Pomodoro, Streak, Time, Words};
use Rarity::{Common, Epic, Legendary, Rare};

pub const ACHIEVEMENTS: &[Achievement] = &[
    Achievement::new("words_10", "Học 10 từ", "Học được 10 từ vựng đầu tiên", "📖", Words, 10, 20, Common),
    Achievement::new("words_50", "Học 50 từ", "Học được 50 từ vựng", "📚", Words, 50, 50, Common),
    Achievement::new("words_100", "Học 100 từ", "Học được 100 từ vựng", "🎓", Words, 100, 100, Rare),
    Achievement::new("words_250", "Học 250 từ", "Học được 250 từ vựng", "🧠", Words, 250, 200, Rare),
    Achievement::new("words_500", "Học 500 từ", "Học được 500 từ vựng", "🏅", Words, 500, 400, Epic),
    Achievement::new("words_1000", "Bậc thầy từ vựng", "Học được 1000 từ vựng", "👑", Words, 1000, 1000, Legendary),
    Achievement::new("streak_3", "Khởi đầu tốt", "Học liên tục 3 ngày", "🔥", Streak, 3, 30, Common),
    Achievement::new("streak_7", "Một tuần kiên trì", "Học liên tục 7 ngày", "📅", Streak, 7, 70, Rare),
    Achievement::new("streak_14", "Hai tuần bền bỉ", "Học liên tục 14 ngày", "💪", Streak, 14, 150, Rare),
    Achievement::new("streak_30", "Một tháng không nghỉ", "Học liên tục 30 ngày", "🌟", Streak, 30, 300, Epic),
    Achievement::new("streak_100", "Huyền thoại chuỗi ngày", "Học liên tục 100 ngày", "🏆", Streak, 100, 1000, Legendary),
    Achievement::new("pomodoro_1", "Pomodoro đầu tiên", "Hoàn thành phiên Pomodoro đầu tiên", "🍅", Pomodoro, 1, 10, Common),
    Achievement::new("pomodoro_10", "Tập trung cao độ", "Hoàn thành 10 phiên Pomodoro", "⏱️", Pomodoro, 10, 50, Common),
    Achievement::new("pomodoro_50", "Chuyên gia tập trung", "Hoàn thành 50 phiên Pomodoro", "🎯", Pomodoro, 50, 200, Rare),
    Achievement::new("pomodoro_100", "Bậc thầy Pomodoro", "Hoàn thành 100 phiên Pomodoro", "⚡", Pomodoro, 100, 500, Epic),
    Achievement::new("level_5", "Cấp độ 5", "Đạt cấp độ 5", "⭐", Level, 5, 50, Common),
    Achievement::new("level_10", "Cấp độ 10", "Đạt cấp độ 10", "🌠", Level, 10, 150, Rare),
    Achievement::new("level_25", "Cấp độ 25", "Đạt cấp độ 25", "💫", Level, 25, 500, Legendary),
    Achievement::new("missions_10", "Người làm nhiệm vụ", "Hoàn thành 10 nhiệm vụ hằng ngày", "✅", Missions, 10, 50, Common),
    Achievement::new("missions_50", "Chiến binh nhiệm vụ", "Hoàn thành 50 nhiệm vụ hằng ngày", "🛡️", Missions, 50, 200, Rare),
    Achievement::new("missions_100", "Anh hùng nhiệm vụ", "Hoàn thành 100 nhiệm vụ hằng ngày", "🦸", Missions, 100, 500, Epic),
    Achievement::new("time_60", "Một giờ học tập", "Tổng thời gian học đạt 60 phút", "⌛", Time, 60, 30, Common),
    Achievement::new("time_600", "Mười giờ học tập", "Tổng thời gian học đạt 600 phút", "🕰️", Time, 600, 150, Rare),
    Achievement::new("time_3000", "Năm mươi giờ học tập", "Tổng thời gian học đạt 3000 phút", "🏛️", Time, 3000, 600, Epic),
];

pub fn achievements_in(category: AchievementCategory) -> impl Iterator<Item = &'static Achievement> {
    ACHIEVEMENTS.iter().filter(move |a| a.category == category)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAchievement {
    pub user_id: String,
    pub achievement_id: String,
    pub unlocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<String>,
    pub progress: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementUpdate {
    pub unlocked: Vec<Achievement>,
    pub xp_awarded: i64,
}

impl AchievementUpdate {
    pub fn merge(&mut self, other: AchievementUpdate) {
        self.unlocked.extend(other.unlocked);
        self.xp_awarded += other.xp_awarded;
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementStatus {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub unlocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<String>,
    pub progress: i64,
    pub percentage: i64,
}

enum ProgressRule {
    Add(i64),
    AtLeast(i64),
}

/// Adds `increment` to every locked achievement of `category` and unlocks the
/// ones whose requirement is now met. The returned XP is not credited here.
pub async fn update_achievement_progress(
    store: &DocumentStore,
    user_id: &str,
    category: AchievementCategory,
    increment: i64,
) -> Result<AchievementUpdate, StoreError> {
    if increment <= 0 {
        return Ok(AchievementUpdate::default());
    }
    apply_progress(store, user_id, category, ProgressRule::Add(increment)).await
}

/// Raises locked achievements of `category` to at least `value`. Used for
/// gauges such as the current streak or level, where the value itself is the
/// progress rather than a delta.
pub async fn raise_achievement_progress(
    store: &DocumentStore,
    user_id: &str,
    category: AchievementCategory,
    value: i64,
) -> Result<AchievementUpdate, StoreError> {
    if value <= 0 {
        return Ok(AchievementUpdate::default());
    }
    apply_progress(store, user_id, category, ProgressRule::AtLeast(value)).await
}

async fn apply_progress(
    store: &DocumentStore,
    user_id: &str,
    category: AchievementCategory,
    rule: ProgressRule,
) -> Result<AchievementUpdate, StoreError> {
    let mut update = AchievementUpdate::default();

    for achievement in achievements_in(category) {
        let doc_id = keys::user_achievement_doc_id(user_id, achievement.id);
        let mut state = store
            .get::<UserAchievement>(USER_ACHIEVEMENTS, &doc_id)
            .await?
            .unwrap_or_else(|| UserAchievement {
                user_id: user_id.to_string(),
                achievement_id: achievement.id.to_string(),
                unlocked: false,
                unlocked_at: None,
                progress: 0,
            });

        if state.unlocked {
            continue;
        }

        let next = match rule {
            ProgressRule::Add(increment) => state.progress.saturating_add(increment),
            ProgressRule::AtLeast(value) => state.progress.max(value),
        };
        if next == state.progress {
            continue;
        }
        state.progress = next;

        if state.progress >= achievement.requirement {
            state.unlocked = true;
            state.unlocked_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
            update.xp_awarded += achievement.xp_reward;
            update.unlocked.push(*achievement);
            tracing::info!(user_id, achievement = achievement.id, "achievement unlocked");
        }

        store.set(USER_ACHIEVEMENTS, &doc_id, &state).await?;
    }

    Ok(update)
}

/// Credits `xp`, then pays out every `level` achievement the new level reaches.
/// Those rewards can lift the level again, so this repeats until it settles.
pub async fn credit_xp(
    store: &DocumentStore,
    user_id: &str,
    xp: i64,
    day: NaiveDate,
) -> Result<(XpChange, AchievementUpdate), StoreError> {
    let mut change = progress::add_xp(store, user_id, xp, day).await?;
    let mut rewards = AchievementUpdate::default();

    loop {
        let update =
            raise_achievement_progress(store, user_id, AchievementCategory::Level, change.level).await?;
        if update.unlocked.is_empty() {
            return Ok((change, rewards));
        }

        let next = progress::add_xp(store, user_id, update.xp_awarded, day).await?;
        change = XpChange {
            applied: change.applied.saturating_add(next.applied),
            xp: next.xp,
            previous_level: change.previous_level,
            level: next.level,
        };
        rewards.merge(update);
    }
}

pub async fn get_user_achievements(
    store: &DocumentStore,
    user_id: &str,
) -> Result<Vec<AchievementStatus>, StoreError> {
    let states: Vec<UserAchievement> = store.query(USER_ACHIEVEMENTS, "userId", user_id).await?;

    Ok(ACHIEVEMENTS
        .iter()
        .map(|achievement| {
            let state = states.iter().find(|s| s.achievement_id == achievement.id);
            let progress = state.map(|s| s.progress).unwrap_or(0);
            let unlocked = state.is_some_and(|s| s.unlocked);
            let percentage = if unlocked {
                100
            } else {
                (progress.saturating_mul(100) / achievement.requirement).clamp(0, 100)
            };
            AchievementStatus {
                achievement: *achievement,
                unlocked,
                unlocked_at: state.and_then(|s| s.unlocked_at.clone()),
                progress,
                percentage,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    async fn seed_progress(store: &DocumentStore, user_id: &str, id: &str, progress: i64, unlocked: bool) {
        store
            .set(
                USER_ACHIEVEMENTS,
                &keys::user_achievement_doc_id(user_id, id),
                &UserAchievement {
                    user_id: user_id.to_string(),
                    achievement_id: id.to_string(),
                    unlocked,
                    unlocked_at: unlocked.then(|| "2024-01-01T00:00:00.000Z".to_string()),
                    progress,
                },
            )
            .await
            .unwrap();
    }

    #[test]
    fn catalog_has_unique_ids_and_positive_thresholds() {
        assert_eq!(ACHIEVEMENTS.len(), 24);
        let ids: HashSet<_> = ACHIEVEMENTS.iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), ACHIEVEMENTS.len());
        assert!(ACHIEVEMENTS.iter().all(|a| a.requirement > 0 && a.xp_reward > 0));
    }

    #[tokio::test]
    async fn crossing_fifty_words_unlocks_once() {
        let store = DocumentStore::in_memory().await.unwrap();
        seed_progress(&store, "u1", "words_10", 45, true).await;
        seed_progress(&store, "u1", "words_50", 45, false).await;

        let update = update_achievement_progress(&store, "u1", AchievementCategory::Words, 60)
            .await
            .unwrap();
        let fifty: Vec<_> = update.unlocked.iter().filter(|a| a.id == "words_50").collect();
        assert_eq!(fifty.len(), 1);
        assert_eq!(fifty[0].title, "Học 50 từ");
        assert!(update.unlocked.iter().all(|a| a.id != "words_10"));
        assert_eq!(
            update.xp_awarded,
            update.unlocked.iter().map(|a| a.xp_reward).sum::<i64>()
        );

        let again = update_achievement_progress(&store, "u1", AchievementCategory::Words, 0)
            .await
            .unwrap();
        assert!(again.unlocked.is_empty());
        assert_eq!(again.xp_awarded, 0);
    }

    #[tokio::test]
    async fn one_large_increment_unlocks_every_crossed_threshold() {
        let store = DocumentStore::in_memory().await.unwrap();
        let update = update_achievement_progress(&store, "u1", AchievementCategory::Pomodoro, 12)
            .await
            .unwrap();
        let ids: Vec<_> = update.unlocked.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["pomodoro_1", "pomodoro_10"]);
        assert_eq!(update.xp_awarded, 60);

        let update = update_achievement_progress(&store, "u1", AchievementCategory::Pomodoro, 1)
            .await
            .unwrap();
        assert!(update.unlocked.is_empty());
    }

    #[tokio::test]
    async fn gauges_do_not_accumulate() {
        let store = DocumentStore::in_memory().await.unwrap();
        for _ in 0..5 {
            raise_achievement_progress(&store, "u1", AchievementCategory::Streak, 2)
                .await
                .unwrap();
        }
        let statuses = get_user_achievements(&store, "u1").await.unwrap();
        let streak_3 = statuses.iter().find(|s| s.achievement.id == "streak_3").unwrap();
        assert_eq!(streak_3.progress, 2);
        assert!(!streak_3.unlocked);
        assert_eq!(streak_3.percentage, 66);

        let update = raise_achievement_progress(&store, "u1", AchievementCategory::Streak, 3)
            .await
            .unwrap();
        assert_eq!(update.unlocked.len(), 1);
        assert_eq!(update.unlocked[0].id, "streak_3");
    }

    #[tokio::test]
    async fn level_rewards_are_paid_when_xp_crosses_a_level() {
        let store = DocumentStore::in_memory().await.unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        progress::add_xp(&store, "u1", 390, today).await.unwrap();

        let (change, rewards) = credit_xp(&store, "u1", 10, today).await.unwrap();
        let ids: Vec<_> = rewards.unlocked.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["level_5"]);
        assert_eq!(change.applied, 60);
        assert_eq!(change.xp, 450);
        assert_eq!(change.level, 5);
        assert_eq!(change.previous_level, 4);

        let (again, rewards) = credit_xp(&store, "u1", 10, today).await.unwrap();
        assert!(rewards.unlocked.is_empty());
        assert_eq!(again.xp, 460);
    }

    #[test]
    fn parses_categories() {
        assert_eq!(AchievementCategory::parse("WORDS"), Some(AchievementCategory::Words));
        assert_eq!(AchievementCategory::parse("unknown"), None);
    }
}
