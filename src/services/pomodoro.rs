//! Wall-clock pomodoro timer. Remaining time is always `phase_end - now`, so a
//! suspended client or a slow poll never drifts the countdown.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PomodoroSettings {
    pub focus_minutes: i64,
    pub short_break_minutes: i64,
    pub long_break_minutes: i64,
    pub long_break_every: u32,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            long_break_every: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Focus,
    ShortBreak,
    LongBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running { ends_at: DateTime<Utc> },
    Paused { remaining: Duration },
}

#[derive(Debug, Clone)]
pub struct PomodoroTimer {
    settings: PomodoroSettings,
    phase: Phase,
    state: RunState,
    completed_focus: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroSnapshot {
    pub phase: Phase,
    pub status: &'static str,
    pub remaining_seconds: i64,
    pub completed_focus_sessions: u32,
    /// Set when this call observed a focus phase ending; holds its length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_focus_minutes: Option<i64>,
}

impl PomodoroTimer {
    pub fn new(settings: PomodoroSettings) -> Self {
        Self {
            settings,
            phase: Phase::Focus,
            state: RunState::Idle,
            completed_focus: 0,
        }
    }

    fn phase_length(&self, phase: Phase) -> Duration {
        let minutes = match phase {
            Phase::Focus => self.settings.focus_minutes,
            Phase::ShortBreak => self.settings.short_break_minutes,
            Phase::LongBreak => self.settings.long_break_minutes,
        };
        Duration::minutes(minutes)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn completed_focus(&self) -> u32 {
        self.completed_focus
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        match self.state {
            RunState::Idle => {
                self.state = RunState::Running {
                    ends_at: now + self.phase_length(self.phase),
                }
            }
            RunState::Paused { .. } => self.resume(now),
            RunState::Running { .. } => {}
        }
    }

    pub fn pause(&mut self, now: DateTime<Utc>) {
        if let RunState::Running { ends_at } = self.state {
            self.state = RunState::Paused {
                remaining: (ends_at - now).max(Duration::zero()),
            };
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) {
        if let RunState::Paused { remaining } = self.state {
            self.state = RunState::Running {
                ends_at: now + remaining,
            };
        }
    }

    /// Back to an idle focus phase. Completed sessions are kept.
    pub fn stop(&mut self) {
        self.phase = Phase::Focus;
        self.state = RunState::Idle;
    }

    /// Applies phase ends that happened before `now`. A finished focus phase
    /// starts its break at the focus end time; a finished break leaves the next
    /// focus phase idle. Returns the focus length when a focus phase ended.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<i64> {
        let mut finished_focus = None;

        while let RunState::Running { ends_at } = self.state {
            if now < ends_at {
                break;
            }
            match self.phase {
                Phase::Focus => {
                    self.completed_focus += 1;
                    finished_focus = Some(self.settings.focus_minutes);
                    self.phase = if self.settings.long_break_every > 0
                        && self.completed_focus % self.settings.long_break_every == 0
                    {
                        Phase::LongBreak
                    } else {
                        Phase::ShortBreak
                    };
                    self.state = RunState::Running {
                        ends_at: ends_at + self.phase_length(self.phase),
                    };
                }
                Phase::ShortBreak | Phase::LongBreak => {
                    self.phase = Phase::Focus;
                    self.state = RunState::Idle;
                }
            }
        }

        finished_focus
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        match self.state {
            RunState::Idle => self.phase_length(self.phase),
            RunState::Running { ends_at } => (ends_at - now).max(Duration::zero()),
            RunState::Paused { remaining } => remaining,
        }
    }

    fn snapshot(&self, now: DateTime<Utc>, finished_focus_minutes: Option<i64>) -> PomodoroSnapshot {
        PomodoroSnapshot {
            phase: self.phase,
            status: match self.state {
                RunState::Idle => "idle",
                RunState::Running { .. } => "running",
                RunState::Paused { .. } => "paused",
            },
            remaining_seconds: self.remaining(now).num_seconds(),
            completed_focus_sessions: self.completed_focus,
            finished_focus_minutes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PomodoroCommand {
    Status,
    Start,
    Pause,
    Resume,
    Stop,
}

/// One timer per user, kept in memory for the lifetime of the process.
#[derive(Default)]
pub struct PomodoroRegistry {
    settings: PomodoroSettings,
    timers: RwLock<HashMap<String, PomodoroTimer>>,
}

impl PomodoroRegistry {
    pub fn new(settings: PomodoroSettings) -> Self {
        Self {
            settings,
            timers: RwLock::new(HashMap::new()),
        }
    }

    /// Catches the timer up to `now`, then applies `command`.
    pub async fn apply(&self, user_id: &str, command: PomodoroCommand, now: DateTime<Utc>) -> PomodoroSnapshot {
        let mut timers = self.timers.write().await;
        let timer = timers
            .entry(user_id.to_string())
            .or_insert_with(|| PomodoroTimer::new(self.settings));

        let finished = timer.tick(now);
        match command {
            PomodoroCommand::Status => {}
            PomodoroCommand::Start => timer.start(now),
            PomodoroCommand::Pause => timer.pause(now),
            PomodoroCommand::Resume => timer.resume(now),
            PomodoroCommand::Stop => timer.stop(),
        }

        tracing::debug!(user_id, ?command, phase = ?timer.phase(), "pomodoro command applied");
        timer.snapshot(now, finished)
    }

    pub async fn active_timers(&self) -> usize {
        self.timers.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap()
    }

    fn minutes(m: i64) -> Duration {
        Duration::minutes(m)
    }

    #[test]
    fn remaining_is_derived_from_the_clock() {
        let mut timer = PomodoroTimer::new(PomodoroSettings::default());
        timer.start(t0());
        assert_eq!(timer.remaining(t0() + minutes(10)), minutes(15));
        assert_eq!(timer.tick(t0() + minutes(10)), None);
    }

    #[test]
    fn pause_freezes_the_countdown() {
        let mut timer = PomodoroTimer::new(PomodoroSettings::default());
        timer.start(t0());
        timer.pause(t0() + minutes(5));
        assert_eq!(timer.remaining(t0() + minutes(60)), minutes(20));
        timer.resume(t0() + minutes(60));
        assert_eq!(timer.remaining(t0() + minutes(70)), minutes(10));
    }

    #[test]
    fn focus_end_rolls_into_a_break_even_after_suspension() {
        let mut timer = PomodoroTimer::new(PomodoroSettings::default());
        timer.start(t0());
        assert_eq!(timer.tick(t0() + minutes(27)), Some(25));
        assert_eq!(timer.phase(), Phase::ShortBreak);
        assert_eq!(timer.remaining(t0() + minutes(27)), minutes(3));

        // Slept through the break as well.
        let mut timer = PomodoroTimer::new(PomodoroSettings::default());
        timer.start(t0());
        assert_eq!(timer.tick(t0() + minutes(90)), Some(25));
        assert_eq!(timer.phase(), Phase::Focus);
        assert_eq!(timer.remaining(t0() + minutes(90)), minutes(25));
    }

    #[test]
    fn every_fourth_focus_earns_a_long_break() {
        let mut timer = PomodoroTimer::new(PomodoroSettings::default());
        let mut now = t0();
        for round in 1..=4 {
            timer.start(now);
            now = now + minutes(25);
            timer.tick(now);
            let expected = if round == 4 { Phase::LongBreak } else { Phase::ShortBreak };
            assert_eq!(timer.phase(), expected);
            timer.stop();
        }
        assert_eq!(timer.completed_focus(), 4);
    }

    #[tokio::test]
    async fn registry_reports_finished_focus_once() {
        let registry = PomodoroRegistry::default();
        let started = registry.apply("u1", PomodoroCommand::Start, t0()).await;
        assert_eq!(started.status, "running");
        assert_eq!(started.remaining_seconds, 25 * 60);

        let later = registry
            .apply("u1", PomodoroCommand::Status, t0() + minutes(26))
            .await;
        assert_eq!(later.finished_focus_minutes, Some(25));
        assert_eq!(later.phase, Phase::ShortBreak);

        let again = registry
            .apply("u1", PomodoroCommand::Status, t0() + minutes(27))
            .await;
        assert_eq!(again.finished_focus_minutes, None);
        assert_eq!(registry.active_timers().await, 1);
    }
}
