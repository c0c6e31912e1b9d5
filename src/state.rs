use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::config::Config;
use crate::core::EventBus;
use crate::db::DocumentStore;
use crate::services::llm_provider::LLMProvider;
use crate::services::pomodoro::{PomodoroRegistry, PomodoroSettings};

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    config: Arc<Config>,
    store: DocumentStore,
    llm: Arc<LLMProvider>,
    events: Arc<EventBus>,
    pomodoro: Arc<PomodoroRegistry>,
}

impl AppState {
    pub fn new(config: Config, store: DocumentStore, llm: LLMProvider) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            config: Arc::new(config),
            store,
            llm: Arc::new(llm),
            events: Arc::new(EventBus::new()),
            pomodoro: Arc::new(PomodoroRegistry::new(PomodoroSettings::default())),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn llm(&self) -> &LLMProvider {
        &self.llm
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    pub fn pomodoro(&self) -> &PomodoroRegistry {
        &self.pomodoro
    }
}
