use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::response::{AppError, SuccessResponse};
use crate::routes::require_user;
use crate::services::calendar;
use crate::services::quick_actions::{self, MAX_SESSION_MINUTES, MAX_SESSION_WORDS};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/flashcard-session", post(flashcard_session))
        .route("/pomodoro-session", post(pomodoro_session))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlashcardSessionRequest {
    words_learned: i64,
    #[serde(default)]
    minutes: i64,
}

async fn flashcard_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<FlashcardSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    if body.words_learned < 0 || body.minutes < 0 {
        return Err(AppError::validation("Số từ và số phút không được âm"));
    }
    if body.words_learned > MAX_SESSION_WORDS || body.minutes > MAX_SESSION_MINUTES {
        return Err(AppError::validation(format!(
            "Một phiên tối đa {MAX_SESSION_WORDS} từ và {MAX_SESSION_MINUTES} phút"
        )));
    }

    let result = quick_actions::complete_flashcard_session(
        state.store(),
        &state.events(),
        &user.id,
        body.words_learned,
        body.minutes,
        calendar::today(),
    )
    .await;
    Ok(Json(SuccessResponse {
        success: result.success,
        data: result,
    }))
}

#[derive(Debug, Deserialize)]
struct PomodoroSessionRequest {
    minutes: i64,
}

async fn pomodoro_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PomodoroSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    if body.minutes <= 0 || body.minutes > MAX_SESSION_MINUTES {
        return Err(AppError::validation(format!(
            "Thời lượng phiên phải từ 1 đến {MAX_SESSION_MINUTES} phút"
        )));
    }

    let result = quick_actions::complete_pomodoro_session(
        state.store(),
        &state.events(),
        &user.id,
        body.minutes,
        calendar::today(),
    )
    .await;
    Ok(Json(SuccessResponse {
        success: result.success,
        data: result,
    }))
}
