//! Error types for the planning subsystem.
//!
//! Collaborator faults (catalog or capacity fetch failing) abort the whole
//! planning call; no partial plan is ever synthesized. Logical non-solutions
//! are not errors at all — they travel in the plan's `unsatisfied` list.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    /// Network/HTTP request to the SIS failed
    #[error("Network error: {message}")]
    Network { message: String },

    /// SIS returned a non-success status
    #[error("Unexpected SIS response: {message}")]
    UnexpectedResponse { message: String },

    /// SIS payload could not be decoded
    #[error("Malformed SIS payload: {message}")]
    MalformedPayload { message: String },

    /// SIS base URL is invalid
    #[error("URL error: {message}")]
    UrlError { message: String },

    /// Request store failure
    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl PlanError {
    /// Returns true if this error is potentially transient and retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlanError::Network { .. } | PlanError::UnexpectedResponse { .. }
        )
    }
}

impl From<reqwest::Error> for PlanError {
    fn from(err: reqwest::Error) -> Self {
        PlanError::Network {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for PlanError {
    fn from(err: url::ParseError) -> Self {
        PlanError::UrlError {
            message: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for PlanError {
    fn from(err: rusqlite::Error) -> Self {
        PlanError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        PlanError::MalformedPayload {
            message: err.to_string(),
        }
    }
}
