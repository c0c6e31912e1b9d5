use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::response::{ok, AppError};
use crate::routes::require_user;
use crate::services::preferences::{self, PreferencesPatch};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_preferences).put(update_preferences))
}

async fn get_preferences(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    Ok(ok(preferences::get_preferences(state.store(), &user.id).await?))
}

async fn update_preferences(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(patch): Json<PreferencesPatch>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    Ok(ok(preferences::update_preferences(state.store(), &user.id, patch).await?))
}
