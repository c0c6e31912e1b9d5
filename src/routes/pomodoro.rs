use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde::Serialize;

use crate::response::{ok, AppError};
use crate::routes::require_user;
use crate::services::pomodoro::{PomodoroCommand, PomodoroSnapshot};
use crate::services::quick_actions::{self, QuickActionResult};
use crate::services::calendar;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(status))
        .route("/start", post(start))
        .route("/pause", post(pause))
        .route("/resume", post(resume))
        .route("/stop", post(stop))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TimerData {
    timer: PomodoroSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<QuickActionResult>,
}

/// Applies `command` and books a focus phase that ended since the last call.
async fn run(state: &AppState, headers: &HeaderMap, command: PomodoroCommand) -> Result<TimerData, AppError> {
    let user = require_user(state, headers)?;
    let timer = state.pomodoro().apply(&user.id, command, Utc::now()).await;

    let session = match timer.finished_focus_minutes {
        Some(minutes) => Some(
            quick_actions::complete_pomodoro_session(
                state.store(),
                &state.events(),
                &user.id,
                minutes,
                calendar::today(),
            )
            .await,
        ),
        None => None,
    };

    Ok(TimerData { timer, session })
}

async fn status(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, AppError> {
    Ok(ok(run(&state, &headers, PomodoroCommand::Status).await?))
}

async fn start(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, AppError> {
    Ok(ok(run(&state, &headers, PomodoroCommand::Start).await?))
}

async fn pause(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, AppError> {
    Ok(ok(run(&state, &headers, PomodoroCommand::Pause).await?))
}

async fn resume(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, AppError> {
    Ok(ok(run(&state, &headers, PomodoroCommand::Resume).await?))
}

async fn stop(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, AppError> {
    Ok(ok(run(&state, &headers, PomodoroCommand::Stop).await?))
}
