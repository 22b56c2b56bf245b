//! Structured error types for repository operations.

use serde::Serialize;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    InvalidTask,
    InvalidExpression,
    InvalidTransition,

    // Lookup errors
    TaskNotFound,
    AmbiguousId,

    // Conflict errors
    AlreadyExists,

    // External errors
    PluginSyncFailed,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Write-time invariant violations on a [`Task`](crate::types::Task).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing description for task")]
    EmptyDescription,

    #[error("task id cannot contain a slash (/): {0}")]
    SlashInId(String),

    #[error("hide_until cannot be later than due")]
    HideUntilAfterDue,

    #[error("task {0} lists itself as a parent")]
    SelfParent(String),

    #[error("task {0} lists itself as a child")]
    SelfChild(String),

    #[error("duplicate ids in parents: {0}")]
    DuplicateParents(String),

    #[error("the completed field of {0} cannot be edited, use complete instead")]
    CompletedChanged(String),

    #[error("comment text must not be empty")]
    EmptyComment,

    #[error("namespace cannot be empty")]
    EmptyNamespace,
}

/// Errors surfaced by the repository, calendar and plugin layers.
#[derive(Debug, Error)]
pub enum PoetError {
    #[error("invalid task: {0}")]
    Validation(#[from] ValidationError),

    #[error("task already exists: {key}")]
    AlreadyExists { key: String },

    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("more than one match for {partial_id}, use more of the id. Matches: {}", candidates.join(", "))]
    Ambiguous {
        partial_id: String,
        candidates: Vec<String>,
    },

    #[error("cannot move task {id} from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("invalid date expression: {expr}")]
    InvalidExpression { expr: String },

    #[error("plugin {name} failed to sync: {message}")]
    PluginSync { name: String, message: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("migration error: {0}")]
    Migration(#[from] refinery::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database connection lock poisoned")]
    LockPoisoned,
}

impl PoetError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn invalid_expression(expr: impl Into<String>) -> Self {
        Self::InvalidExpression { expr: expr.into() }
    }

    /// Machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PoetError::Validation(_) => ErrorCode::InvalidTask,
            PoetError::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            PoetError::NotFound { .. } => ErrorCode::TaskNotFound,
            PoetError::Ambiguous { .. } => ErrorCode::AmbiguousId,
            PoetError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            PoetError::InvalidExpression { .. } => ErrorCode::InvalidExpression,
            PoetError::PluginSync { .. } => ErrorCode::PluginSyncFailed,
            PoetError::Storage(_) | PoetError::Migration(_) => ErrorCode::DatabaseError,
            PoetError::Serialization(_) | PoetError::Io(_) | PoetError::LockPoisoned => {
                ErrorCode::InternalError
            }
        }
    }

    /// True when a batch importer may treat this error as "skip" rather than fatal.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, PoetError::AlreadyExists { .. })
    }
}

/// Serializable error body for JSON output.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
}

impl From<&PoetError> for ErrorBody {
    fn from(err: &PoetError) -> Self {
        let candidates = match err {
            PoetError::Ambiguous { candidates, .. } => candidates.clone(),
            _ => Vec::new(),
        };
        Self {
            code: err.code(),
            message: err.to_string(),
            candidates,
        }
    }
}

/// Result type for repository operations.
pub type PoetResult<T> = std::result::Result<T, PoetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_invalid_task() {
        let err: PoetError = ValidationError::EmptyDescription.into();
        assert_eq!(err.code(), ErrorCode::InvalidTask);
        assert!(!err.is_already_exists());
    }

    #[test]
    fn ambiguous_body_carries_candidates() {
        let err = PoetError::Ambiguous {
            partial_id: "ab".to_string(),
            candidates: vec!["/active/builtin/abc".into(), "/active/builtin/abd".into()],
        };
        let body = ErrorBody::from(&err);
        assert_eq!(body.code, ErrorCode::AmbiguousId);
        assert_eq!(body.candidates.len(), 2);
        assert!(body.message.contains("/active/builtin/abc"));

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "AMBIGUOUS_ID");
    }

    #[test]
    fn already_exists_is_skippable() {
        let err = PoetError::AlreadyExists {
            key: "/active/builtin/x".into(),
        };
        assert!(err.is_already_exists());
        assert_eq!(err.code(), ErrorCode::AlreadyExists);
    }
}
