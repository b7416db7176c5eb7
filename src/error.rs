//! Error types for the BreakIn Direct tracking pipeline
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation at the
//! binary edge.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for tracking and evaluation operations
#[derive(Error, Debug)]
pub enum BreakinError {
    /// Snapshot body could not be parsed or is missing required fields
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Scoring service failed to produce an evaluation
    #[error("Scoring error: {0}")]
    Scoring(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for tracking operations
pub type Result<T> = std::result::Result<T, BreakinError>;

/// Convert anyhow::Error to BreakinError
impl From<anyhow::Error> for BreakinError {
    fn from(err: anyhow::Error) -> Self {
        BreakinError::Other(err.to_string())
    }
}

impl BreakinError {
    /// HTTP status reported to API callers
    pub fn status_code(&self) -> StatusCode {
        match self {
            BreakinError::InvalidSnapshot(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BreakinError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BreakinError::InvalidSnapshot("missing userId".to_string());
        assert_eq!(err.to_string(), "Invalid snapshot: missing userId");
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json");
        assert!(json_err.is_err());

        let err: BreakinError = json_err.unwrap_err().into();
        assert!(matches!(err, BreakinError::Serialization(_)));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            BreakinError::InvalidSnapshot("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            BreakinError::Scoring("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            BreakinError::Other("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
