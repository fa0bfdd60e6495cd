//! Error types for the evaluation harness.

use std::path::PathBuf;
use thiserror::Error;

use crate::eval::task::TaskStatus;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Run-level and infrastructure errors.
///
/// Per-task grading problems are *not* represented here; they are recorded
/// on the task as a [`TaskFailure`](crate::eval::TaskFailure) and never
/// unwind past the orchestrator.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Malformed call to the orchestrator (empty selection, zero samples).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The test set provider returned zero items.
    #[error("Test set provider returned no questions")]
    EmptyTestSet,

    /// The test set provider failed or timed out.
    #[error("Test set generation failed: {0}")]
    Generation(#[source] CollaboratorError),

    /// A task was asked to make a transition its lifecycle forbids.
    #[error("Invalid task transition from {from:?} to {to:?}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    /// A grade fell outside the scoring range.
    #[error("Score {0} is outside the grading range")]
    ScoreOutOfRange(f64),

    /// The background run ended without delivering a report.
    #[error("Evaluation run aborted: {0}")]
    Aborted(String),

    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The report or test set file does not exist.
    #[error("File not found at '{0}'")]
    NotFound(PathBuf),

    /// HTTP request error outside of a grading call.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EvalError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for EvalError {
    fn from(err: reqwest::Error) -> Self {
        EvalError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for EvalError {
    fn from(err: serde_json::Error) -> Self {
        EvalError::Serialization(err.to_string())
    }
}

/// Failure reported by an external collaborator (QA service, test set source).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    /// Worth re-submitting later: network errors, 5xx, rate limiting.
    #[error("transient: {0}")]
    Transient(String),

    /// Will fail again as-is: bad request, malformed body, service-reported error.
    #[error("{0}")]
    Fatal(String),

    /// The call did not finish within the configured deadline.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl CollaboratorError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CollaboratorError::Fatal(format!("malformed response: {}", err))
        } else if err.is_timeout() || err.is_connect() || err.is_request() {
            CollaboratorError::Transient(err.to_string())
        } else {
            match err.status() {
                Some(status) if status.is_client_error() && status.as_u16() != 429 => {
                    CollaboratorError::Fatal(err.to_string())
                }
                _ => CollaboratorError::Transient(err.to_string()),
            }
        }
    }
}

impl From<serde_json::Error> for CollaboratorError {
    fn from(err: serde_json::Error) -> Self {
        CollaboratorError::Fatal(format!("malformed response: {}", err))
    }
}
