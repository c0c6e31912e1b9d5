use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;

use crate::response::{ok, AppError};
use crate::routes::require_user;
use crate::services::{calendar, missions, quick_actions};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_missions))
        .route("/:id/complete", post(complete_mission))
}

async fn get_missions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let missions = missions::get_daily_missions(state.store(), &user.id, calendar::today()).await?;
    Ok(ok(missions))
}

async fn complete_mission(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(mission_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let completion =
        missions::complete_mission(state.store(), &user.id, &mission_id, calendar::today()).await?;
    quick_actions::announce_mission(&state.events(), &user.id, &completion).await;
    Ok(ok(completion))
}
