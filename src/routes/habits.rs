use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Local;
use serde::Serialize;

use crate::response::{ok, AppError, SuccessResponse};
use crate::routes::require_user;
use crate::services::habits::{self, NewHabit, WeeklyHabitDay};
use crate::services::outcome::FetchOutcome;
use crate::services::{calendar, quick_actions};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_habits).post(create_habit))
        .route("/weekly", get(weekly_progress))
        .route("/reset-weekly", post(reset_weekly))
        .route("/:id", delete(delete_habit))
        .route("/:id/toggle", post(toggle_habit))
}

async fn list_habits(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let result = habits::list_habits(state.store(), &user.id, calendar::today()).await;
    Ok(ok(FetchOutcome::from_list(result, "habits")))
}

async fn create_habit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewHabit>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let habit = habits::create_habit(state.store(), &user.id, body, calendar::today()).await?;
    Ok(ok(habit))
}

async fn delete_habit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(habit_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    habits::delete_habit(state.store(), &user.id, &habit_id).await?;
    Ok(ok(serde_json::json!({ "deleted": habit_id })))
}

async fn toggle_habit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(habit_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let result = quick_actions::toggle_habit_completion(
        state.store(),
        &state.events(),
        &user.id,
        &habit_id,
        calendar::today(),
    )
    .await;
    Ok(Json(SuccessResponse {
        success: result.success,
        data: result,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WeeklyData {
    days: Vec<WeeklyHabitDay>,
    total: i64,
}

async fn weekly_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let days = habits::calculate_weekly_habit_progress(state.store(), &user.id, calendar::today()).await;
    Ok(ok(WeeklyData {
        total: days.iter().map(|d| d.completed).sum(),
        days,
    }))
}

async fn reset_weekly(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let reset = habits::reset_weekly_habits(state.store(), &user.id, Local::now()).await?;
    Ok(ok(serde_json::json!({ "reset": reset })))
}
