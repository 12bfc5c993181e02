use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Failures of a single LLM round trip
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    /// Provider credential is absent; raised before any network I/O
    #[error("LLM configuration error: {0}")]
    Configuration(String),

    #[error("LLM provider error: {0}")]
    Provider(String),

    #[error("Failed to parse LLM response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        LLMError::Provider(err.to_string())
    }
}

/// Centralized error types for consistent API error handling
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("LLM API key not configured")]
    Configuration(String),

    #[error("{0}")]
    Provider(String),

    #[error("Failed to parse AI response")]
    Parse(String),

    #[error("{0}")]
    DatabaseError(#[from] anyhow::Error),

    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Wire shape of every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Error context for structured logging
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub resource_id: Option<String>,
    pub resource_type: String,
}

impl ErrorContext {
    pub fn new(operation: &str, resource_type: &str) -> Self {
        Self {
            operation: operation.to_string(),
            resource_id: None,
            resource_type: resource_type.to_string(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }
}

pub type ErrorResponse = (StatusCode, Json<ErrorBody>);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Configuration(_)
            | ApiError::Provider(_)
            | ApiError::Parse(_)
            | ApiError::DatabaseError(_)
            | ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert API error to HTTP response with consistent structure and logging
    pub fn to_response_with_context(self, context: ErrorContext) -> ErrorResponse {
        match &self {
            ApiError::NotFound(_) => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Resource not found"
                );
            }
            ApiError::ValidationError(_)
            | ApiError::BadRequest(_)
            | ApiError::Conflict(_)
            | ApiError::Unauthorized(_)
            | ApiError::PayloadTooLarge(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Request rejected"
                );
            }
            ApiError::Configuration(detail) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    detail = %detail,
                    "LLM provider is not configured"
                );
            }
            ApiError::Parse(detail) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    detail = %detail,
                    "LLM response could not be parsed"
                );
            }
            ApiError::Provider(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "LLM provider error"
                );
            }
            ApiError::InternalError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Internal server error"
                );
            }
            ApiError::DatabaseError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Database error"
                );
            }
        }

        (
            self.status_code(),
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.to_response_with_context(ErrorContext::new("unknown", "resource"))
            .into_response()
    }
}

impl From<LLMError> for ApiError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::Configuration(msg) => ApiError::Configuration(msg),
            LLMError::Provider(msg) => ApiError::Provider(msg),
            LLMError::Parse(msg) => ApiError::Parse(msg),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(anyhow::Error::from(err))
    }
}

/// Helper macro for structured error responses
#[macro_export]
macro_rules! api_error {
    (not_found, $operation:expr, $resource_type:expr, $id:expr) => {
        $crate::errors::ApiError::NotFound(format!("{} '{}' not found", $resource_type, $id))
            .to_response_with_context(
                $crate::errors::ErrorContext::new($operation, $resource_type)
                    .with_id(&$id.to_string()),
            )
    };

    (validation, $operation:expr, $resource_type:expr, $message:expr) => {
        $crate::errors::ApiError::ValidationError($message.to_string())
            .to_response_with_context($crate::errors::ErrorContext::new($operation, $resource_type))
    };

    (bad_request, $operation:expr, $resource_type:expr, $message:expr) => {
        $crate::errors::ApiError::BadRequest($message.to_string())
            .to_response_with_context($crate::errors::ErrorContext::new($operation, $resource_type))
    };

    (llm, $operation:expr, $resource_type:expr, $error:expr) => {
        $crate::errors::ApiError::from($error)
            .to_response_with_context($crate::errors::ErrorContext::new($operation, $resource_type))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_creation() {
        let context = ErrorContext::new("grade_frq", "frq_attempt").with_id("123");

        assert_eq!(context.operation, "grade_frq");
        assert_eq!(context.resource_type, "frq_attempt");
        assert_eq!(context.resource_id, Some("123".to_string()));
    }

    #[test]
    fn test_llm_error_mapping() {
        let err: ApiError = LLMError::Configuration("LLM_API_KEY is empty".into()).into();
        assert!(matches!(err, ApiError::Configuration(_)));
        assert_eq!(err.to_string(), "LLM API key not configured");

        let err: ApiError = LLMError::Provider("rate limited".into()).into();
        assert_eq!(err.to_string(), "rate limited");

        let err: ApiError = LLMError::Parse("expected value at line 1".into()).into();
        assert_eq!(err.to_string(), "Failed to parse AI response");
    }

    #[test]
    fn test_api_error_responses() {
        let (status, body) = ApiError::NotFound("Study tool not found".to_string())
            .to_response_with_context(ErrorContext::new("get_study_tool", "study_tool").with_id("1"));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Study tool not found");

        let (status, _) = ApiError::ValidationError("Answer is empty".to_string())
            .to_response_with_context(ErrorContext::new("submit_attempt", "frq_attempt"));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = ApiError::Conflict("Already grading".to_string())
            .to_response_with_context(ErrorContext::new("submit_draft", "practice"));
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = ApiError::PayloadTooLarge("Upload exceeds the size limit".to_string())
            .to_response_with_context(ErrorContext::new("upload_pdf", "pdf"));
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let (status, body) = ApiError::Parse("trailing characters".to_string())
            .to_response_with_context(ErrorContext::new("generate_frq", "frq"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Failed to parse AI response");
    }
}
