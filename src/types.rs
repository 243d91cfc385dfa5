//! Error types for transferable
//!
//! One variant per entry in the API error taxonomy. Route handlers map
//! `TransferableError` to an HTTP status and a short machine-readable code
//! at the response boundary; nothing below the routes layer touches HTTP.

use hyper::StatusCode;
use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, TransferableError>;

/// Error taxonomy for the TransferAble API
#[derive(Debug, Error)]
pub enum TransferableError {
    /// No verified caller identity (401)
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated but lacking role, tier, or ownership (403)
    #[error("{0}")]
    Forbidden(String),

    /// Malformed or missing required input (400)
    #[error("{0}")]
    Validation(String),

    /// Referenced row absent (404)
    #[error("{0}")]
    NotFound(String),

    /// A required catalog reference could not be resolved or fabricated (400)
    #[error("{0}")]
    MissingReference(String),

    /// Identity, billing, or completion-service collaborator failure (500)
    #[error("upstream service error: {0}")]
    Upstream(String),

    /// MongoDB failure (500)
    #[error("database error: {0}")]
    Database(String),

    /// Request-level HTTP failure: unreadable or oversized body, bad JSON (400)
    #[error("{0}")]
    Http(String),

    /// Startup/configuration failure (500)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferableError {
    /// HTTP status for the route boundary
    pub fn http_status(&self) -> StatusCode {
        match self {
            TransferableError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            TransferableError::Forbidden(_) => StatusCode::FORBIDDEN,
            TransferableError::Validation(_)
            | TransferableError::MissingReference(_)
            | TransferableError::Http(_) => StatusCode::BAD_REQUEST,
            TransferableError::NotFound(_) => StatusCode::NOT_FOUND,
            TransferableError::Upstream(_)
            | TransferableError::Database(_)
            | TransferableError::Config(_)
            | TransferableError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable code included in error bodies
    pub fn code(&self) -> &'static str {
        match self {
            TransferableError::Unauthenticated(_) => "UNAUTHENTICATED",
            TransferableError::Forbidden(_) => "FORBIDDEN",
            TransferableError::Validation(_) => "VALIDATION",
            TransferableError::NotFound(_) => "NOT_FOUND",
            TransferableError::MissingReference(_) => "MISSING_REFERENCE",
            TransferableError::Upstream(_) => "UPSTREAM_ERROR",
            TransferableError::Database(_) => "DB_ERROR",
            TransferableError::Http(_) => "BAD_REQUEST",
            TransferableError::Config(_) => "CONFIG_ERROR",
            TransferableError::Io(_) => "IO_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            TransferableError::Unauthenticated("no token".into()).http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            TransferableError::Forbidden("Premium subscription required".into()).http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            TransferableError::MissingReference("University is required".into()).http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TransferableError::NotFound("application not found".into()).http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TransferableError::Upstream("billing unreachable".into()).http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_message_passthrough() {
        let err = TransferableError::Validation("deadline must be a valid date".into());
        assert_eq!(err.to_string(), "deadline must be a valid date");
        assert_eq!(err.code(), "VALIDATION");
    }
}
