use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::db::keys::DECKS;
use crate::db::{DocumentStore, StoreError};
use crate::services::flashcard_parser::{self, ParsedCard};
use crate::services::llm_provider::{ChatMessage, LLMError, TextGenerator};

const MAX_GENERATED_CARDS: usize = 30;
const DEFAULT_GENERATED_CARDS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: String,
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub example: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_translation: Option<String>,
    #[serde(default)]
    pub learned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub cards: Vec<Flashcard>,
    pub total: i64,
    pub learned: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Deck {
    /// Re-derives `total` and `learned` from the cards.
    fn recount(&mut self) {
        self.total = self.cards.len() as i64;
        self.learned = self.cards.iter().filter(|c| c.learned).count() as i64;
        self.updated_at = now_rfc3339();
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub example_translation: Option<String>,
}

impl From<ParsedCard> for NewCard {
    fn from(card: ParsedCard) -> Self {
        Self {
            front: card.front,
            back: card.back,
            example: card.example,
            example_translation: card.example_translation,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeck {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cards: Vec<NewCard>,
}

#[derive(Debug, thiserror::Error)]
pub enum DeckError {
    #[error("deck not found: {0}")]
    NotFound(String),
    #[error("card not found: {0}")]
    CardNotFound(String),
    #[error("invalid deck: {0}")]
    Invalid(&'static str),
    #[error("flashcard generation failed: {0}")]
    Generation(#[from] LLMError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn build_card(card: NewCard) -> Result<Flashcard, DeckError> {
    let (front, back) = (card.front.trim(), card.back.trim());
    if front.is_empty() || back.is_empty() {
        return Err(DeckError::Invalid("card front and back are required"));
    }
    Ok(Flashcard {
        id: uuid::Uuid::new_v4().to_string(),
        front: front.to_string(),
        back: back.to_string(),
        example: card.example.trim().to_string(),
        example_translation: card
            .example_translation
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()),
        learned: false,
    })
}

pub async fn create_deck(
    store: &DocumentStore,
    user_id: &str,
    input: NewDeck,
) -> Result<Deck, DeckError> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(DeckError::Invalid("title must not be empty"));
    }

    let cards = input
        .cards
        .into_iter()
        .map(build_card)
        .collect::<Result<Vec<_>, _>>()?;

    let now = now_rfc3339();
    let mut deck = Deck {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        title: title.to_string(),
        description: input.description.trim().to_string(),
        cards,
        total: 0,
        learned: 0,
        created_at: now.clone(),
        updated_at: now,
    };
    deck.recount();
    store.set(DECKS, &deck.id, &deck).await?;

    tracing::info!(user_id, deck_id = %deck.id, cards = deck.total, "deck created");
    Ok(deck)
}

pub async fn list_decks(store: &DocumentStore, user_id: &str) -> Result<Vec<Deck>, StoreError> {
    store.query(DECKS, "userId", user_id).await
}

pub async fn get_deck(store: &DocumentStore, user_id: &str, deck_id: &str) -> Result<Deck, DeckError> {
    store
        .get::<Deck>(DECKS, deck_id)
        .await?
        .filter(|d| d.user_id == user_id)
        .ok_or_else(|| DeckError::NotFound(deck_id.to_string()))
}

pub async fn delete_deck(store: &DocumentStore, user_id: &str, deck_id: &str) -> Result<(), DeckError> {
    get_deck(store, user_id, deck_id).await?;
    store.delete(DECKS, deck_id).await?;
    tracing::info!(user_id, deck_id, "deck deleted");
    Ok(())
}

pub async fn add_card(
    store: &DocumentStore,
    user_id: &str,
    deck_id: &str,
    card: NewCard,
) -> Result<Deck, DeckError> {
    let mut deck = get_deck(store, user_id, deck_id).await?;
    deck.cards.push(build_card(card)?);
    deck.recount();
    store.set(DECKS, deck_id, &deck).await?;
    Ok(deck)
}

pub async fn set_card_learned(
    store: &DocumentStore,
    user_id: &str,
    deck_id: &str,
    card_id: &str,
    learned: bool,
) -> Result<Deck, DeckError> {
    let mut deck = get_deck(store, user_id, deck_id).await?;
    let card = deck
        .cards
        .iter_mut()
        .find(|c| c.id == card_id)
        .ok_or_else(|| DeckError::CardNotFound(card_id.to_string()))?;
    card.learned = learned;
    deck.recount();
    store.set(DECKS, deck_id, &deck).await?;
    Ok(deck)
}

pub async fn remove_card(
    store: &DocumentStore,
    user_id: &str,
    deck_id: &str,
    card_id: &str,
) -> Result<Deck, DeckError> {
    let mut deck = get_deck(store, user_id, deck_id).await?;
    let before = deck.cards.len();
    deck.cards.retain(|c| c.id != card_id);
    if deck.cards.len() == before {
        return Err(DeckError::CardNotFound(card_id.to_string()));
    }
    deck.recount();
    store.set(DECKS, deck_id, &deck).await?;
    Ok(deck)
}

fn generation_prompt(topic: &str, count: usize) -> String {
    format!(
        "Tạo {count} thẻ từ vựng tiếng Anh về chủ đề \"{topic}\" cho người Việt học tiếng Anh.\n\
         Chỉ trả về một bảng Markdown với đúng các cột:\n\
         | Front | Back | Example | ExampleTranslation |\n\
         Front là từ tiếng Anh, Back là nghĩa tiếng Việt, Example là câu ví dụ tiếng Anh, \
         ExampleTranslation là bản dịch tiếng Việt của câu ví dụ."
    )
}

/// Asks the model for a Markdown table of cards on `topic` and stores the
/// parsed result as a new deck.
pub async fn generate_deck<G: TextGenerator>(
    store: &DocumentStore,
    generator: &G,
    user_id: &str,
    topic: &str,
    count: Option<usize>,
) -> Result<Deck, DeckError> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(DeckError::Invalid("topic must not be empty"));
    }
    let count = count.unwrap_or(DEFAULT_GENERATED_CARDS).clamp(1, MAX_GENERATED_CARDS);

    let messages = [
        ChatMessage::system("Bạn là trợ lý tạo thẻ ghi nhớ. Luôn trả lời bằng bảng Markdown."),
        ChatMessage::user(generation_prompt(topic, count)),
    ];
    let raw = generator.generate(&messages).await?;
    let parsed = flashcard_parser::parse_flashcards(&raw);
    tracing::info!(user_id, topic, requested = count, parsed = parsed.len(), "flashcards generated");

    create_deck(
        store,
        user_id,
        NewDeck {
            title: topic.to_string(),
            description: format!("Bộ thẻ được tạo tự động về chủ đề \"{topic}\""),
            cards: parsed.into_iter().take(count.max(2)).map(NewCard::from).collect(),
        },
    )
    .await
}
