use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::routes::require_user;
use crate::services::{calendar, daily_counter, integrated, progress};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_progress))
        .route("/daily-goal", put(update_daily_goal))
        .route("/integrated", get(get_integrated))
        .route("/daily-stats", get(get_daily_stats))
}

async fn get_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let progress =
        progress::get_user_progress(state.store(), &user.id, state.config().default_daily_goal).await?;
    Ok(ok(progress))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyGoalRequest {
    daily_goal: i64,
}

async fn update_daily_goal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<DailyGoalRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let progress = progress::set_daily_goal(state.store(), &user.id, body.daily_goal)
        .await?
        .ok_or_else(|| AppError::validation("Mục tiêu hằng ngày phải từ 1 đến 500"))?;
    Ok(ok(progress))
}

async fn get_integrated(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let view = integrated::get_integrated_progress(state.store(), &user.id, calendar::today()).await;
    Ok(ok(view))
}

#[derive(Debug, Deserialize)]
struct DailyStatsQuery {
    date: Option<String>,
}

async fn get_daily_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DailyStatsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let day = match query.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| AppError::bad_request("Ngày không hợp lệ, dùng định dạng YYYY-MM-DD"))?,
        None => calendar::today(),
    };
    let stats = daily_counter::get_daily_stats(state.store(), &user.id, day).await?;
    Ok(ok(stats))
}
