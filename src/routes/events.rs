use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};

use crate::core::{EventBus, NavigationPayload, ProgressEvent};
use crate::response::{ok, AppError};
use crate::routes::require_user;
use crate::state::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(30);
const NAVIGATION_TABS: &[&str] = &[
    "dashboard",
    "flashcards",
    "pomodoro",
    "habits",
    "chat",
    "achievements",
    "settings",
];
const EVENT_TYPES: &[&str] = &[
    "XP_AWARDED",
    "LEVEL_UP",
    "ACHIEVEMENT_UNLOCKED",
    "MISSION_COMPLETED",
    "HABIT_TOGGLED",
    "NAVIGATION_REQUESTED",
];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(stream_events))
        .route("/navigate", post(request_navigation))
}

/// Drops the bus subscription when the client disconnects.
struct SubscriptionGuard {
    bus: Arc<EventBus>,
    subscriber_id: String,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let bus = Arc::clone(&self.bus);
        let id = std::mem::take(&mut self.subscriber_id);
        tokio::spawn(async move {
            bus.unsubscribe(&id).await;
        });
    }
}

#[derive(Debug, Deserialize)]
struct StreamQuery {
    /// Comma separated event type filter.
    types: Option<String>,
}

async fn stream_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<StreamQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;

    let event_types = query.types.as_deref().map(|raw| {
        raw.split(',')
            .map(|v| v.trim().to_ascii_uppercase())
            .filter(|v| EVENT_TYPES.contains(&v.as_str()))
            .collect::<Vec<_>>()
    });

    let bus = state.events();
    let (subscriber_id, receiver) = bus
        .subscribe_filtered(Some(user.id.clone()), event_types)
        .await;
    let guard = SubscriptionGuard {
        bus,
        subscriber_id,
    };
    tracing::debug!(user_id = %user.id, "event stream opened");

    let events = BroadcastStream::new(receiver).filter_map(move |msg| {
        let _guard = &guard;
        let event = match msg {
            Ok(envelope) => serde_json::to_string(&envelope).ok().map(|data| {
                Event::default()
                    .id(envelope.id.as_str())
                    .event(envelope.event.event_type())
                    .data(data)
            }),
            // Lagged receivers just skip what they missed.
            Err(_) => None,
        };
        async move { event.map(Ok::<Event, Infallible>) }
    });

    let ping_event = || {
        Event::default()
            .event("ping")
            .data(chrono::Utc::now().to_rfc3339())
    };
    let initial = stream::once(async move { Ok::<Event, Infallible>(ping_event()) });
    let pings = IntervalStream::new(tokio::time::interval(PING_INTERVAL))
        .map(move |_| Ok::<Event, Infallible>(ping_event()));

    Ok(Sse::new(initial.chain(stream::select(events, pings))))
}

#[derive(Debug, Deserialize)]
struct NavigationRequest {
    tab: String,
}

async fn request_navigation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NavigationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let tab = body.tab.trim().to_ascii_lowercase();
    if !NAVIGATION_TABS.contains(&tab.as_str()) {
        return Err(AppError::validation("Tab không hợp lệ"));
    }

    state
        .events()
        .publish(ProgressEvent::NavigationRequested(NavigationPayload {
            user_id: user.id,
            tab: tab.clone(),
        }))
        .await;
    Ok(ok(serde_json::json!({ "tab": tab })))
}
