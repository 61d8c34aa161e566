use serde::{Deserialize, Serialize};
use std::fmt;

/// Single structured error shape used across every pipeline stage.
///
/// `code` names the stage that failed (`CORPUS_FETCH_FAILED`,
/// `EMBEDDINGS_FAILED`, `COMPLETION_FAILED`, ...), so a caller can tell
/// where an answer run broke without parsing message text. `retryable`
/// marks transport-level failures worth attempting again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Terminal rendering: `[CODE] message`, plus details when present.
    pub fn render(&self) -> String {
        match &self.details {
            Some(d) => format!("{self} ({d})"),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
