//! Adjustment error type. Every failure the driver can hit surfaces as one
//! `AdjustError`, which the CLI reports to the servo.

use std::time::Duration;

use thiserror::Error;

use harness_servo_core::{ConfigError, UnitsError};

/// Result type alias for driver operations.
pub type AdjustResult<T> = Result<T, AdjustError>;

#[derive(Debug, Error)]
pub enum AdjustError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid resource value from optimizer: {0}")]
    Units(#[from] UnitsError),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{context}. Status code {status}. Data {body}")]
    UnexpectedStatus {
        context: &'static str,
        status: u16,
        body: String,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("invalid adjust input: {0}")]
    InvalidInput(String),

    #[error("triggered workflow finished with FAILED status: {0}")]
    WorkflowFailed(String),

    #[error("timed out after {}s waiting for completion of adjustment", .0.as_secs())]
    Timeout(Duration),
}

impl AdjustError {
    /// Failure reason reported to the servo alongside the message.
    pub fn reason(&self) -> &'static str {
        match self {
            AdjustError::Config(_) => "config",
            AdjustError::InvalidInput(_) => "invalid-input",
            AdjustError::WorkflowFailed(_) => "adjust-failed",
            AdjustError::Timeout(_) => "timeout",
            AdjustError::Units(_)
            | AdjustError::Http(_)
            | AdjustError::Json(_)
            | AdjustError::UnexpectedStatus { .. }
            | AdjustError::InvalidResponse(_) => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons() {
        assert_eq!(AdjustError::Timeout(Duration::from_secs(5)).reason(), "timeout");
        assert_eq!(AdjustError::WorkflowFailed("{}".into()).reason(), "adjust-failed");
        assert_eq!(AdjustError::InvalidInput("cpu".into()).reason(), "invalid-input");
        assert_eq!(
            AdjustError::Config(ConfigError::Invalid("x".into())).reason(),
            "config"
        );
        assert_eq!(AdjustError::Units(UnitsError::Empty).reason(), "unknown");
    }

    #[test]
    fn unexpected_status_message() {
        let err = AdjustError::UnexpectedStatus {
            context: "Unable to trigger canary workflow",
            status: 403,
            body: "denied".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unable to trigger canary workflow. Status code 403. Data denied"
        );
    }

    #[test]
    fn timeout_message() {
        let err = AdjustError::Timeout(Duration::from_secs(3600));
        assert!(err.to_string().contains("3600s"));
    }
}
