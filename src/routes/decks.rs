use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::routes::require_user;
use crate::services::decks::{self, NewCard, NewDeck};
use crate::services::outcome::FetchOutcome;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_decks).post(create_deck))
        .route("/generate", post(generate_deck))
        .route("/:id", get(get_deck).delete(delete_deck))
        .route("/:id/cards", post(add_card))
        .route("/:id/cards/:card_id", delete(remove_card))
        .route("/:id/cards/:card_id/learned", put(set_learned))
}

async fn list_decks(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let result = decks::list_decks(state.store(), &user.id).await;
    Ok(ok(FetchOutcome::from_list(result, "decks")))
}

async fn create_deck(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewDeck>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    Ok(ok(decks::create_deck(state.store(), &user.id, body).await?))
}

async fn get_deck(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(deck_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    Ok(ok(decks::get_deck(state.store(), &user.id, &deck_id).await?))
}

async fn delete_deck(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(deck_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    decks::delete_deck(state.store(), &user.id, &deck_id).await?;
    Ok(ok(serde_json::json!({ "deleted": deck_id })))
}

async fn add_card(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(deck_id): Path<String>,
    Json(body): Json<NewCard>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    Ok(ok(decks::add_card(state.store(), &user.id, &deck_id, body).await?))
}

async fn remove_card(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((deck_id, card_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    Ok(ok(decks::remove_card(state.store(), &user.id, &deck_id, &card_id).await?))
}

#[derive(Debug, Deserialize)]
struct LearnedRequest {
    learned: bool,
}

async fn set_learned(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((deck_id, card_id)): Path<(String, String)>,
    Json(body): Json<LearnedRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let deck =
        decks::set_card_learned(state.store(), &user.id, &deck_id, &card_id, body.learned).await?;
    Ok(ok(deck))
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    topic: String,
    count: Option<usize>,
}

async fn generate_deck(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<GenerateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let deck = decks::generate_deck(state.store(), state.llm(), &user.id, &body.topic, body.count).await?;
    Ok(ok(deck))
}
