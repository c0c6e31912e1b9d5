mod event_bus;

pub use event_bus::{
    AchievementUnlockedPayload, EventBus, EventEnvelope, HabitToggledPayload, LevelUpPayload,
    MissionCompletedPayload, NavigationPayload, ProgressEvent, XpAwardedPayload,
};
