//! Best-effort scraper for AI-generated flashcard tables of the form
//! `Front | Back | Example | ExampleTranslation`.

use serde::{Deserialize, Serialize};

const FRONT_HEADERS: &[&str] = &["front", "mặt trước", "từ", "từ vựng", "word", "term"];
const BACK_HEADERS: &[&str] = &["back", "mặt sau", "nghĩa", "meaning", "definition", "translation"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCard {
    pub front: String,
    pub back: String,
    pub example: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_translation: Option<String>,
}

/// Extracts one card per data row. Never fails: text without a usable row
/// yields the two default cards.
pub fn parse_flashcards(raw: &str) -> Vec<ParsedCard> {
    let cards: Vec<ParsedCard> = raw.lines().filter_map(parse_row).collect();
    if cards.is_empty() {
        tracing::warn!(len = raw.len(), "no flashcard rows found, using defaults");
        return default_cards();
    }
    cards
}

pub fn default_cards() -> Vec<ParsedCard> {
    vec![
        ParsedCard {
            front: "Hello".to_string(),
            back: "Xin chào".to_string(),
            example: "Hello, how are you?".to_string(),
            example_translation: Some("Xin chào, bạn khỏe không?".to_string()),
        },
        ParsedCard {
            front: "Thank you".to_string(),
            back: "Cảm ơn".to_string(),
            example: "Thank you for your help.".to_string(),
            example_translation: Some("Cảm ơn vì sự giúp đỡ của bạn.".to_string()),
        },
    ]
}

fn parse_row(line: &str) -> Option<ParsedCard> {
    let line = line.trim();
    if !line.contains('|') {
        return None;
    }

    let trimmed = line.trim_start_matches('|').trim_end_matches('|');
    let cells: Vec<String> = trimmed.split('|').map(clean_cell).collect();

    if cells.iter().all(|c| is_separator(c)) {
        return None;
    }
    if cells.len() < 2 {
        return None;
    }
    if is_header(&cells[0], &cells[1]) {
        return None;
    }

    let front = cells[0].clone();
    let back = cells[1].clone();
    if front.is_empty() || back.is_empty() {
        return None;
    }

    Some(ParsedCard {
        front,
        back,
        example: cells.get(2).cloned().unwrap_or_default(),
        example_translation: cells.get(3).filter(|c| !c.is_empty()).cloned(),
    })
}

fn clean_cell(cell: &str) -> String {
    let stripped = cell.replace("**", "").replace('`', "");
    let mut value = stripped.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”')] {
        if value.len() >= 2 && value.starts_with(open) && value.ends_with(close) {
            value = value[open.len_utf8()..value.len() - close.len_utf8()].trim();
        }
    }
    value.to_string()
}

fn is_separator(cell: &str) -> bool {
    !cell.is_empty() && cell.chars().all(|c| matches!(c, '-' | ':' | ' '))
        || cell.is_empty()
}

/// A header needs both columns labelled; a lone "word" is still vocabulary.
fn is_header(front: &str, back: &str) -> bool {
    let (front, back) = (front.to_lowercase(), back.to_lowercase());
    FRONT_HEADERS.contains(&front.as_str()) && BACK_HEADERS.contains(&back.as_str())
}
