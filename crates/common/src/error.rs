//! Error types for fedipress.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
///
/// Domain operations with expected alternative outcomes return tagged
/// result enums instead; this type covers failures that terminate a
/// request or a delivery attempt.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Post not found: {0}")]
    PostNotFound(String),

    #[error("Invalid type: {0}")]
    InvalidType(String),

    #[error("Not a post: {0}")]
    NotAPost(String),

    #[error("Missing author")]
    MissingAuthor,

    #[error("Not the author")]
    NotAuthor,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Signature invalid")]
    SignatureInvalid,

    #[error("Site disabled: {0}")]
    SiteDisabled(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Queue not ready")]
    QueueNotReady,

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Lookup error: {0}")]
    Lookup(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::NotFound(_)
            | Self::AccountNotFound(_)
            | Self::PostNotFound(_)
            | Self::NotAPost(_) => StatusCode::NOT_FOUND,
            Self::SignatureInvalid => StatusCode::UNAUTHORIZED,
            Self::SiteDisabled(_) | Self::NotAuthor => StatusCode::FORBIDDEN,
            Self::BadRequest(_)
            | Self::Validation(_)
            | Self::InvalidType(_)
            | Self::MissingAuthor => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::QueueNotReady => StatusCode::TOO_MANY_REQUESTS,

            // 5xx Server Errors
            Self::Database(_)
            | Self::Redis(_)
            | Self::Lookup(_)
            | Self::Upstream(_)
            | Self::Queue(_)
            | Self::Config(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the stable error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not-found",
            Self::AccountNotFound(_) => "account-not-found",
            Self::PostNotFound(_) => "post-not-found",
            Self::InvalidType(_) => "invalid-type",
            Self::NotAPost(_) => "not-a-post",
            Self::MissingAuthor => "missing-author",
            Self::NotAuthor => "not-author",
            Self::BadRequest(_) => "bad-request",
            Self::Validation(_) => "validation-error",
            Self::SignatureInvalid => "signature-invalid",
            Self::SiteDisabled(_) => "site-disabled",
            Self::Conflict(_) => "conflict",
            Self::QueueNotReady => "queue-not-ready",
            Self::Database(_) => "database-error",
            Self::Redis(_) => "redis-error",
            Self::Lookup(_) => "lookup-error",
            Self::Upstream(_) => "upstream-error",
            Self::Queue(_) => "queue-error",
            Self::Config(_) => "config-error",
            Self::Internal(_) => "internal-error",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        // Signature and timestamp failures produce 401 with no body.
        if matches!(self, Self::SignatureInvalid) {
            return status.into_response();
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        Self::BadRequest(format!("Invalid URL: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::SignatureInvalid.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::SiteDisabled("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Conflict("already-following".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::QueueNotReady.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::Upstream("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes_are_kebab_case() {
        for err in [
            AppError::NotAuthor,
            AppError::MissingAuthor,
            AppError::QueueNotReady,
            AppError::SignatureInvalid,
        ] {
            let code = err.error_code();
            assert!(code.chars().all(|c| c.is_ascii_lowercase() || c == '-'));
        }
    }
}
