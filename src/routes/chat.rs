use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::routes::require_user;
use crate::services::chat::{self, ChatTurn};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(send_message))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    history: Vec<ChatTurn>,
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    tracing::debug!(user_id = %user.id, history = body.history.len(), "chat message received");
    let reply = chat::reply(state.llm(), &body.message, &body.history).await?;
    Ok(ok(reply))
}
