use std::time::Duration;

use chrono::{DateTime, Datelike, Local, NaiveDate, SecondsFormat, Utc};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use crate::db::keys::{self, HABITS, HABIT_RESETS};
use crate::db::{DocumentStore, StoreError};
use crate::services::calendar;
use crate::services::daily_counter;

const WEEKLY_AGGREGATION_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_TITLE_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    pub current_streak: i64,
    pub today_completed: bool,
    pub weekly_progress: Vec<bool>,
    pub monthly_progress: Vec<bool>,
    /// `YYYY-MM` the monthly array belongs to.
    pub progress_month: String,
    #[serde(default)]
    pub last_toggled_date: Option<String>,
    pub created_at: String,
}

impl Habit {
    /// Whether the weekly array was last written before `day`. An unreadable
    /// toggle date counts as old.
    fn predates(&self, day: NaiveDate) -> bool {
        match self.last_toggled_date.as_deref() {
            None => false,
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_or(true, |toggled| toggled < day),
        }
    }

    /// Aligns the derived fields with `day`: a new month gets a fresh monthly
    /// array, and `todayCompleted` only holds for the day it was toggled on.
    fn normalize(&mut self, day: NaiveDate) {
        let month = day.format("%Y-%m").to_string();
        if self.progress_month != month || self.monthly_progress.len() != calendar::days_in_month(day) {
            self.monthly_progress = vec![false; calendar::days_in_month(day)];
            self.progress_month = month;
        }
        if self.weekly_progress.len() != 7 {
            self.weekly_progress.resize(7, false);
        }
        if self.last_toggled_date.as_deref() != Some(keys::date_key(day).as_str()) {
            self.today_completed = false;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHabit {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeeklyResetMarker {
    user_id: String,
    last_reset_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyHabitDay {
    pub date: NaiveDate,
    pub completed: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum HabitError {
    #[error("habit not found: {0}")]
    NotFound(String),
    #[error("invalid habit: {0}")]
    Invalid(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn create_habit(
    store: &DocumentStore,
    user_id: &str,
    input: NewHabit,
    day: NaiveDate,
) -> Result<Habit, HabitError> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(HabitError::Invalid("title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(HabitError::Invalid("title is too long"));
    }

    let habit = Habit {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        title: title.to_string(),
        description: input.description,
        icon: input.icon,
        color: input.color,
        current_streak: 0,
        today_completed: false,
        weekly_progress: vec![false; 7],
        monthly_progress: vec![false; calendar::days_in_month(day)],
        progress_month: day.format("%Y-%m").to_string(),
        last_toggled_date: None,
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    store.set(HABITS, &habit.id, &habit).await?;

    tracing::info!(user_id, habit_id = %habit.id, "habit created");
    Ok(habit)
}

pub async fn list_habits(
    store: &DocumentStore,
    user_id: &str,
    day: NaiveDate,
) -> Result<Vec<Habit>, StoreError> {
    let mut habits: Vec<Habit> = store.query(HABITS, "userId", user_id).await?;
    for habit in &mut habits {
        habit.normalize(day);
    }
    Ok(habits)
}

async fn load_owned_habit(
    store: &DocumentStore,
    user_id: &str,
    habit_id: &str,
) -> Result<Habit, HabitError> {
    store
        .get::<Habit>(HABITS, habit_id)
        .await?
        .filter(|h| h.user_id == user_id)
        .ok_or_else(|| HabitError::NotFound(habit_id.to_string()))
}

pub async fn delete_habit(
    store: &DocumentStore,
    user_id: &str,
    habit_id: &str,
) -> Result<(), HabitError> {
    load_owned_habit(store, user_id, habit_id).await?;
    store.delete(HABITS, habit_id).await?;
    tracing::info!(user_id, habit_id, "habit deleted");
    Ok(())
}

/// Flips today's completion. Both progress arrays follow the new state and the
/// streak moves by exactly one, never below zero.
pub async fn toggle_habit(
    store: &DocumentStore,
    user_id: &str,
    habit_id: &str,
    day: NaiveDate,
) -> Result<Habit, HabitError> {
    let mut habit = load_owned_habit(store, user_id, habit_id).await?;
    habit.normalize(day);

    let completed = !habit.today_completed;
    habit.today_completed = completed;
    habit.weekly_progress[calendar::weekday_index(day)] = completed;
    if let Some(slot) = habit.monthly_progress.get_mut(day.day0() as usize) {
        *slot = completed;
    }
    habit.current_streak = if completed {
        habit.current_streak.saturating_add(1)
    } else {
        (habit.current_streak - 1).max(0)
    };
    habit.last_toggled_date = Some(keys::date_key(day));

    store.set(HABITS, habit_id, &habit).await?;
    daily_counter::record_habit_completion(store, user_id, habit_id, completed, day).await?;

    tracing::debug!(user_id, habit_id, completed, streak = habit.current_streak, "habit toggled");
    Ok(habit)
}

/// Clears weekly arrays left over from an earlier ISO week. Runs at most once
/// per week per user and returns whether any habit was cleared. Habits toggled
/// since the week started keep their progress.
pub async fn reset_weekly_habits(
    store: &DocumentStore,
    user_id: &str,
    now: DateTime<Local>,
) -> Result<bool, StoreError> {
    let week_start = calendar::start_of_iso_week(now);
    let marker = store.get::<WeeklyResetMarker>(HABIT_RESETS, user_id).await?;

    let stale = marker.map_or(true, |marker| {
        DateTime::parse_from_rfc3339(&marker.last_reset_at)
            .map(|at| at < week_start)
            .unwrap_or(true)
    });
    if !stale {
        return Ok(false);
    }

    let first_day = week_start.date_naive();
    let habits: Vec<Habit> = store.query(HABITS, "userId", user_id).await?;
    let mut cleared = 0;
    for mut habit in habits {
        if !habit.predates(first_day) || !habit.weekly_progress.contains(&true) {
            continue;
        }
        habit.weekly_progress = vec![false; 7];
        store.set(HABITS, &habit.id, &habit).await?;
        cleared += 1;
    }
    if cleared > 0 {
        tracing::info!(user_id, cleared, "weekly habit progress reset");
    }

    store
        .set(
            HABIT_RESETS,
            user_id,
            &WeeklyResetMarker {
                user_id: user_id.to_string(),
                last_reset_at: now.to_rfc3339_opts(SecondsFormat::Millis, false),
            },
        )
        .await?;
    Ok(cleared > 0)
}

/// Habits completed on each of the last seven days, oldest first. Falls back to
/// zeros when the store fails or the aggregation times out.
pub async fn calculate_weekly_habit_progress(
    store: &DocumentStore,
    user_id: &str,
    today: NaiveDate,
) -> Vec<WeeklyHabitDay> {
    let days = calendar::trailing_days(today, 7);
    let zeros = || {
        days.iter()
            .map(|&date| WeeklyHabitDay { date, completed: 0 })
            .collect::<Vec<_>>()
    };

    match tokio::time::timeout(
        WEEKLY_AGGREGATION_TIMEOUT,
        count_weekly_completions(store, user_id, &days),
    )
    .await
    {
        Ok(Ok(week)) => week,
        Ok(Err(e)) => {
            tracing::warn!(user_id, error = %e, "weekly habit aggregation failed");
            zeros()
        }
        Err(_) => {
            tracing::warn!(user_id, "weekly habit aggregation timed out");
            zeros()
        }
    }
}

async fn count_weekly_completions(
    store: &DocumentStore,
    user_id: &str,
    days: &[NaiveDate],
) -> Result<Vec<WeeklyHabitDay>, StoreError> {
    let habits: Vec<Habit> = store.query(HABITS, "userId", user_id).await?;
    let habits = &habits;

    let per_day = days.iter().map(move |&date| {
        async move {
            let checks = join_all(
                habits
                    .iter()
                    .map(|h| daily_counter::habit_completed_on(store, user_id, &h.id, date)),
            )
            .await;
            let mut completed = 0;
            for check in checks {
                if check? {
                    completed += 1;
                }
            }
            Ok::<_, StoreError>(WeeklyHabitDay { date, completed })
        }
    });

    join_all(per_day).await.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 17).unwrap()
    }

    async fn habit(store: &DocumentStore, title: &str) -> Habit {
        create_habit(
            store,
            "u1",
            NewHabit {
                title: title.to_string(),
                description: String::new(),
                icon: "💧".to_string(),
                color: "#00aaff".to_string(),
            },
            wednesday(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn toggle_round_trip_restores_state() {
        let store = DocumentStore::in_memory().await.unwrap();
        let original = habit(&store, "Uống nước").await;

        let on = toggle_habit(&store, "u1", &original.id, wednesday()).await.unwrap();
        assert!(on.today_completed);
        assert_eq!(on.current_streak, 1);
        assert!(on.weekly_progress[2]);
        assert!(on.monthly_progress[16]);
        assert_eq!(on.monthly_progress.len(), 31);

        let off = toggle_habit(&store, "u1", &original.id, wednesday()).await.unwrap();
        assert!(!off.today_completed);
        assert_eq!(off.current_streak, original.current_streak);
        assert_eq!(off.weekly_progress, original.weekly_progress);
        assert_eq!(off.monthly_progress, original.monthly_progress);
    }

    #[tokio::test]
    async fn other_users_cannot_touch_a_habit() {
        let store = DocumentStore::in_memory().await.unwrap();
        let h = habit(&store, "Đọc sách").await;
        let err = toggle_habit(&store, "u2", &h.id, wednesday()).await.unwrap_err();
        assert!(matches!(err, HabitError::NotFound(_)));
        assert!(delete_habit(&store, "u2", &h.id).await.is_err());
        delete_habit(&store, "u1", &h.id).await.unwrap();
        assert!(list_habits(&store, "u1", wednesday()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_title_is_rejected() {
        let store = DocumentStore::in_memory().await.unwrap();
        let err = create_habit(
            &store,
            "u1",
            NewHabit {
                title: "   ".to_string(),
                description: String::new(),
                icon: String::new(),
                color: String::new(),
            },
            wednesday(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HabitError::Invalid(_)));
    }

    #[tokio::test]
    async fn weekly_reset_runs_once_per_week() {
        let store = DocumentStore::in_memory().await.unwrap();
        let h = habit(&store, "Thiền").await;
        let last_wednesday = NaiveDate::from_ymd_opt(2024, 7, 10).unwrap();
        toggle_habit(&store, "u1", &h.id, last_wednesday).await.unwrap();

        let then = Local.with_ymd_and_hms(2024, 7, 10, 9, 0, 0).unwrap();
        assert!(!reset_weekly_habits(&store, "u1", then).await.unwrap());
        let stored: Habit = store.get(HABITS, &h.id).await.unwrap().unwrap();
        assert!(stored.weekly_progress[2]);

        let now = Local.with_ymd_and_hms(2024, 7, 17, 9, 0, 0).unwrap();
        assert!(reset_weekly_habits(&store, "u1", now).await.unwrap());
        let habits = list_habits(&store, "u1", wednesday()).await.unwrap();
        assert!(habits[0].weekly_progress.iter().all(|done| !done));

        assert!(!reset_weekly_habits(&store, "u1", now).await.unwrap());
    }

    #[tokio::test]
    async fn first_reset_clears_only_last_weeks_progress() {
        let store = DocumentStore::in_memory().await.unwrap();
        let old = habit(&store, "Viết nhật ký").await;
        let fresh = habit(&store, "Đọc báo").await;
        toggle_habit(&store, "u1", &old.id, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap())
            .await
            .unwrap();
        toggle_habit(&store, "u1", &fresh.id, NaiveDate::from_ymd_opt(2024, 7, 16).unwrap())
            .await
            .unwrap();

        let thursday = Local.with_ymd_and_hms(2024, 7, 18, 8, 0, 0).unwrap();
        assert!(reset_weekly_habits(&store, "u1", thursday).await.unwrap());

        let old: Habit = store.get(HABITS, &old.id).await.unwrap().unwrap();
        assert_eq!(old.weekly_progress, vec![false; 7]);
        let fresh: Habit = store.get(HABITS, &fresh.id).await.unwrap().unwrap();
        assert!(fresh.weekly_progress[1]);

        assert!(!reset_weekly_habits(&store, "u1", thursday).await.unwrap());
    }

    #[tokio::test]
    async fn weekly_progress_counts_each_day() {
        let store = DocumentStore::in_memory().await.unwrap();
        let a = habit(&store, "A").await;
        let b = habit(&store, "B").await;
        let monday = NaiveDate::from_ymd_opt(2024, 7, 15).unwrap();
        toggle_habit(&store, "u1", &a.id, monday).await.unwrap();
        toggle_habit(&store, "u1", &a.id, wednesday()).await.unwrap();
        toggle_habit(&store, "u1", &b.id, wednesday()).await.unwrap();

        let week = calculate_weekly_habit_progress(&store, "u1", wednesday()).await;
        assert_eq!(week.len(), 7);
        assert_eq!(week[6].date, wednesday());
        assert_eq!(week[6].completed, 2);
        assert_eq!(week[4].date, monday);
        assert_eq!(week[4].completed, 1);
        assert_eq!(week[5].completed, 0);
    }
}
