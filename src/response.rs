use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::StoreError;
use crate::services::chat::ChatError;
use crate::services::decks::DeckError;
use crate::services::habits::HabitError;
use crate::services::llm_provider::LLMError;
use crate::services::missions::MissionError;
use crate::services::preferences::PreferencesError;

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<SuccessResponse<T>> {
    Json(SuccessResponse {
        success: true,
        data,
    })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::operational(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            message,
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            is_operational: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    fn operational(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            is_operational: true,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "document store failure");
        Self::internal(err.to_string())
    }
}

impl From<MissionError> for AppError {
    fn from(err: MissionError) -> Self {
        match err {
            MissionError::NotFound(_) => Self::not_found("Không tìm thấy nhiệm vụ"),
            MissionError::AlreadyCompleted(_) => Self::conflict("Nhiệm vụ đã được hoàn thành"),
            MissionError::Store(e) => e.into(),
        }
    }
}

impl From<HabitError> for AppError {
    fn from(err: HabitError) -> Self {
        match err {
            HabitError::NotFound(_) => Self::not_found("Không tìm thấy thói quen"),
            HabitError::Invalid(reason) => Self::validation(reason),
            HabitError::Store(e) => e.into(),
        }
    }
}

impl From<LLMError> for AppError {
    fn from(err: LLMError) -> Self {
        tracing::warn!(error = %err, "text generation failed");
        match err {
            LLMError::NotConfigured(_) => Self::service_unavailable("Trợ lý AI chưa được cấu hình"),
            _ => Self::service_unavailable("Trợ lý AI tạm thời không khả dụng"),
        }
    }
}

impl From<DeckError> for AppError {
    fn from(err: DeckError) -> Self {
        match err {
            DeckError::NotFound(_) => Self::not_found("Không tìm thấy bộ thẻ"),
            DeckError::CardNotFound(_) => Self::not_found("Không tìm thấy thẻ"),
            DeckError::Invalid(reason) => Self::validation(reason),
            DeckError::Generation(e) => e.into(),
            DeckError::Store(e) => e.into(),
        }
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage | ChatError::MessageTooLong => Self::validation(err.to_string()),
            ChatError::Generation(e) => e.into(),
        }
    }
}

impl From<PreferencesError> for AppError {
    fn from(err: PreferencesError) -> Self {
        match err {
            PreferencesError::FontScale => Self::validation(err.to_string()),
            PreferencesError::Store(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            "Lỗi máy chủ nội bộ".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
        };

        (self.status, Json(body)).into_response()
    }
}

pub fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> AppError {
    AppError {
        status,
        code: code.into(),
        message: message.into(),
        is_operational: true,
    }
}
