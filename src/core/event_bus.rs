use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

const CHANNEL_CAPACITY: usize = 256;

/// Everything a view may want to react to after a progress mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ProgressEvent {
    #[serde(rename = "XP_AWARDED")]
    XpAwarded(XpAwardedPayload),

    #[serde(rename = "LEVEL_UP")]
    LevelUp(LevelUpPayload),

    #[serde(rename = "ACHIEVEMENT_UNLOCKED")]
    AchievementUnlocked(AchievementUnlockedPayload),

    #[serde(rename = "MISSION_COMPLETED")]
    MissionCompleted(MissionCompletedPayload),

    #[serde(rename = "HABIT_TOGGLED")]
    HabitToggled(HabitToggledPayload),

    #[serde(rename = "NAVIGATION_REQUESTED")]
    NavigationRequested(NavigationPayload),
}

impl ProgressEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ProgressEvent::XpAwarded(_) => "XP_AWARDED",
            ProgressEvent::LevelUp(_) => "LEVEL_UP",
            ProgressEvent::AchievementUnlocked(_) => "ACHIEVEMENT_UNLOCKED",
            ProgressEvent::MissionCompleted(_) => "MISSION_COMPLETED",
            ProgressEvent::HabitToggled(_) => "HABIT_TOGGLED",
            ProgressEvent::NavigationRequested(_) => "NAVIGATION_REQUESTED",
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            ProgressEvent::XpAwarded(p) => &p.user_id,
            ProgressEvent::LevelUp(p) => &p.user_id,
            ProgressEvent::AchievementUnlocked(p) => &p.user_id,
            ProgressEvent::MissionCompleted(p) => &p.user_id,
            ProgressEvent::HabitToggled(p) => &p.user_id,
            ProgressEvent::NavigationRequested(p) => &p.user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpAwardedPayload {
    pub user_id: String,
    pub delta: i64,
    pub total_xp: i64,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelUpPayload {
    pub user_id: String,
    pub previous_level: i64,
    pub level: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementUnlockedPayload {
    pub user_id: String,
    pub achievement_id: String,
    pub title: String,
    pub xp_reward: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionCompletedPayload {
    pub user_id: String,
    pub mission_id: String,
    pub xp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitToggledPayload {
    pub user_id: String,
    pub habit_id: String,
    pub completed: bool,
    pub current_streak: i64,
}

/// Replaces ad hoc "switch tab" broadcasts between views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationPayload {
    pub user_id: String,
    pub tab: String,
}

/// What a stream client receives: `{id, type, payload, createdAt}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub id: String,
    #[serde(flatten)]
    pub event: ProgressEvent,
    pub created_at: DateTime<Utc>,
}

impl EventEnvelope {
    pub fn new(event: ProgressEvent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event,
            created_at: Utc::now(),
        }
    }
}

struct Subscriber {
    user_id: Option<String>,
    event_types: Option<Vec<String>>,
    sender: broadcast::Sender<EventEnvelope>,
}

impl Subscriber {
    fn matches(&self, envelope: &EventEnvelope) -> bool {
        if let Some(ref user_id) = self.user_id {
            if envelope.event.user_id() != user_id {
                return false;
            }
        }

        if let Some(ref event_types) = self.event_types {
            if !event_types.iter().any(|t| t == envelope.event.event_type()) {
                return false;
            }
        }

        true
    }
}

pub struct EventBus {
    global_sender: broadcast::Sender<EventEnvelope>,
    subscribers: RwLock<HashMap<String, Subscriber>>,
    event_count: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        let (global_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            global_sender,
            subscribers: RwLock::new(HashMap::new()),
            event_count: AtomicU64::new(0),
        }
    }

    pub async fn publish(&self, event: ProgressEvent) {
        let envelope = EventEnvelope::new(event);
        self.event_count.fetch_add(1, Ordering::Relaxed);

        let subscribers = self.subscribers.read().await;
        let sent_to = subscribers
            .values()
            .filter(|subscriber| subscriber.matches(&envelope))
            .filter(|subscriber| subscriber.sender.send(envelope.clone()).is_ok())
            .count();

        // No receivers is the normal state between page loads.
        let _ = self.global_sender.send(envelope.clone());

        debug!(
            event_type = envelope.event.event_type(),
            user_id = envelope.event.user_id(),
            sent_to,
            "progress event published"
        );
    }

    pub fn subscribe_global(&self) -> broadcast::Receiver<EventEnvelope> {
        self.global_sender.subscribe()
    }

    pub async fn subscribe_filtered(
        &self,
        user_id: Option<String>,
        event_types: Option<Vec<String>>,
    ) -> (String, broadcast::Receiver<EventEnvelope>) {
        let (sender, receiver) = broadcast::channel(CHANNEL_CAPACITY);
        let subscriber_id = uuid::Uuid::new_v4().to_string();

        self.subscribers.write().await.insert(
            subscriber_id.clone(),
            Subscriber {
                user_id,
                event_types,
                sender,
            },
        );

        debug!(subscriber_id = %subscriber_id, "filtered subscription created");
        (subscriber_id, receiver)
    }

    pub async fn unsubscribe(&self, subscriber_id: &str) {
        if self.subscribers.write().await.remove(subscriber_id).is_some() {
            debug!(subscriber_id = %subscriber_id, "subscription removed");
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len() + self.global_sender.receiver_count()
    }

    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xp_event(user_id: &str) -> ProgressEvent {
        ProgressEvent::XpAwarded(XpAwardedPayload {
            user_id: user_id.to_string(),
            delta: 20,
            total_xp: 120,
            source: "pomodoro".to_string(),
        })
    }

    #[tokio::test]
    async fn global_subscribers_see_every_event() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe_global();

        bus.publish(xp_event("u1")).await;

        let envelope = receiver.recv().await.unwrap();
        assert_eq!(envelope.event.event_type(), "XP_AWARDED");
        assert_eq!(envelope.event.user_id(), "u1");
        assert_eq!(bus.event_count(), 1);
    }

    #[test]
    fn envelope_serializes_flat_with_timestamp() {
        let envelope = EventEnvelope::new(xp_event("u1"));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "XP_AWARDED");
        assert_eq!(value["payload"]["totalXp"], 120);
        assert_eq!(value["id"], envelope.id.as_str());
        assert_eq!(
            value["createdAt"].as_str().unwrap(),
            serde_json::to_value(envelope.created_at).unwrap().as_str().unwrap()
        );
    }

    #[tokio::test]
    async fn filtered_subscription_only_sees_its_user_and_types() {
        let bus = EventBus::new();
        let (sub_id, mut receiver) = bus
            .subscribe_filtered(
                Some("u1".to_string()),
                Some(vec!["NAVIGATION_REQUESTED".to_string()]),
            )
            .await;

        bus.publish(xp_event("u1")).await;
        bus.publish(ProgressEvent::NavigationRequested(NavigationPayload {
            user_id: "u2".to_string(),
            tab: "habits".to_string(),
        }))
        .await;
        bus.publish(ProgressEvent::NavigationRequested(NavigationPayload {
            user_id: "u1".to_string(),
            tab: "flashcards".to_string(),
        }))
        .await;

        let envelope = receiver.recv().await.unwrap();
        match envelope.event {
            ProgressEvent::NavigationRequested(p) => assert_eq!(p.tab, "flashcards"),
            other => panic!("unexpected event {other:?}"),
        }

        bus.unsubscribe(&sub_id).await;
        assert_eq!(bus.subscriber_count().await, 0);
    }
}
