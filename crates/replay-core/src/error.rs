//! Error types for chat replay operations.

use std::io;
use thiserror::Error;

use crate::model::Role;

/// Result type for chat replay operations.
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Errors that can occur outside of playback itself (config, storage, encoding).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Session load error: {0}")]
    SessionLoad(#[from] SessionLoadError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for ReplayError {
    fn from(err: anyhow::Error) -> Self {
        ReplayError::Internal(err.to_string())
    }
}

/// Why a persisted session record could not become a playable script.
///
/// Any of these sends the caller back to the authoring flow; playback never
/// starts with a partially loaded script.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionLoadError {
    #[error("no session record stored under '{key}'")]
    NotFound { key: String },

    #[error("session store unavailable: {0}")]
    Store(String),

    #[error("malformed session JSON: {0}")]
    MalformedJson(String),

    #[error("session record has no participants")]
    MissingParticipants,

    #[error("session record is missing participant {0}")]
    MissingParticipant(Role),

    #[error("participant {0} has an empty name")]
    EmptyParticipantName(Role),

    #[error("session entries must be an array")]
    EntriesNotArray,

    #[error("entry #{index} has an unknown sender '{value}'")]
    UnknownSender { index: usize, value: String },

    #[error("entry #{index} is not an object")]
    EntryNotObject { index: usize },

    #[error("entry id '{0}' appears more than once")]
    DuplicateEntryId(String),
}

impl SessionLoadError {
    /// Whether the record was simply absent, as opposed to present but unusable.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionLoadError::NotFound { .. })
    }
}

/// A recoverable problem with one entry; the entry is still played with a fallback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EntryIssue {
    #[error("entry '{id}': money entry has no usable amount, showing 0")]
    MissingAmount { id: String },

    #[error("entry '{id}': money entry has no currency, using {fallback}")]
    MissingCurrency { id: String, fallback: String },

    #[error("entry '{id}': image entry has no image url")]
    MissingImageUrl { id: String },

    #[error("entry '{id}': empty caption replaced with '{caption}'")]
    EmptyCaption { id: String, caption: String },

    #[error("entry '{id}': unknown kind '{kind}', played as text")]
    UnknownKind { id: String, kind: String },

    #[error("entry #{index}: missing id, assigned '{assigned}'")]
    MissingId { index: usize, assigned: String },

    #[error("entry '{id}': field '{field}' has an unusable value, ignored")]
    MistypedField { id: String, field: &'static str },

    /// Legacy records carry no request flag, so the direction is a guess.
    #[error("entry '{id}': legacy money entry has no request flag, assumed sent")]
    AssumedDirection { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_flagged() {
        let err = SessionLoadError::NotFound {
            key: "chatData".into(),
        };
        assert!(err.is_not_found());
        assert!(!SessionLoadError::EntriesNotArray.is_not_found());
    }

    #[test]
    fn test_session_load_error_converts() {
        let err: ReplayError = SessionLoadError::MissingParticipant(Role::B).into();
        assert!(err.to_string().contains("participant B"));
    }

    #[test]
    fn test_entry_issue_message() {
        let issue = EntryIssue::MissingCurrency {
            id: "7".into(),
            fallback: "USD".into(),
        };
        assert_eq!(
            issue.to_string(),
            "entry '7': money entry has no currency, using USD"
        );
    }
}
