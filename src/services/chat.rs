use serde::{Deserialize, Serialize};

use crate::services::llm_provider::{ChatMessage, LLMError, TextGenerator};

const MAX_HISTORY_TURNS: usize = 10;
const MAX_MESSAGE_CHARS: usize = 2_000;

const TUTOR_PROMPT: &str = "Bạn là gia sư tiếng Anh thân thiện cho người Việt. \
Trả lời ngắn gọn bằng tiếng Việt, kèm ví dụ tiếng Anh khi phù hợp. \
Nếu người học viết tiếng Anh sai, hãy sửa lỗi nhẹ nhàng và giải thích ngắn.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub reply: String,
    pub history_used: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("message is longer than {MAX_MESSAGE_CHARS} characters")]
    MessageTooLong,
    #[error(transparent)]
    Generation(#[from] LLMError),
}

/// Only the most recent turns are sent along with the tutor prompt.
fn build_conversation(message: &str, history: &[ChatTurn]) -> Vec<ChatMessage> {
    let recent = &history[history.len().saturating_sub(MAX_HISTORY_TURNS)..];

    let mut messages = Vec::with_capacity(recent.len() + 2);
    messages.push(ChatMessage::system(TUTOR_PROMPT));
    messages.extend(
        recent
            .iter()
            .filter(|turn| !turn.content.trim().is_empty())
            .map(|turn| match turn.role {
                ChatRole::User => ChatMessage::user(turn.content.as_str()),
                ChatRole::Assistant => ChatMessage::assistant(turn.content.as_str()),
            }),
    );
    messages.push(ChatMessage::user(message));
    messages
}

pub async fn reply<G: TextGenerator>(
    generator: &G,
    message: &str,
    history: &[ChatTurn],
) -> Result<ChatReply, ChatError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ChatError::MessageTooLong);
    }

    let conversation = build_conversation(message, history);
    let history_used = conversation.len() - 2;
    let reply = generator.generate(&conversation).await?;

    Ok(ChatReply {
        reply: reply.trim().to_string(),
        history_used,
    })
}
