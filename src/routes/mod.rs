mod achievements;
mod chat;
mod dashboard;
mod decks;
mod events;
mod habits;
mod health;
mod missions;
mod pomodoro;
mod preferences;
mod progress;
mod quick;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::auth::{self, AuthError, AuthUser};
use crate::response::{json_error, AppError};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest("/api/progress", progress::router())
        .nest("/api/missions", missions::router())
        .nest("/api/achievements", achievements::router())
        .nest("/api/habits", habits::router())
        .nest("/api/decks", decks::router())
        .nest("/api/quick", quick::router())
        .nest("/api/pomodoro", pomodoro::router())
        .nest("/api/chat", chat::router())
        .nest("/api/preferences", preferences::router())
        .nest("/api/events", events::router())
        .nest("/api/dashboard", dashboard::router())
        .fallback(fallback_handler)
        .with_state(state)
}

/// Resolves the caller from the `auth_token` cookie or bearer header.
pub(crate) fn require_user(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    let token = auth::extract_token(headers)
        .ok_or_else(|| AppError::unauthorized(AuthError::MissingToken.user_message()))?;

    auth::verify_token(&token, state.config().jwt_secret.as_deref()).map_err(|err| match err {
        AuthError::MissingSecret => {
            tracing::error!("JWT_SECRET is not configured, rejecting authenticated request");
            AppError::service_unavailable(err.user_message())
        }
        other => {
            tracing::debug!(error = %other, "token rejected");
            AppError::unauthorized(other.user_message())
        }
    })
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Không tìm thấy tài nguyên").into_response()
}
