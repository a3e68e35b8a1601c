//! Error types for the content engine

use crate::ids::{ElementId, LocaleId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for content operations
pub type Result<T> = std::result::Result<T, ContentError>;

/// Errors that can occur in content operations
#[derive(Debug, Error)]
pub enum ContentError {
    /// Content cannot be created or saved for an element that was never
    /// persisted. This is an integration error, not a user-facing condition.
    #[error("cannot save the content of an unsaved element")]
    UnsavedElement,

    /// A content row already exists for this (element, locale) pair
    #[error("content row already exists for element {element_id} in locale {locale}")]
    DuplicateRow {
        element_id: ElementId,
        locale: LocaleId,
    },

    /// Invalid submitted value for a field
    #[error("invalid value for {handle}: {message}")]
    InvalidValue { handle: String, message: String },

    /// Lock is held by another writer
    #[error("content lock busy - another save in progress")]
    LockBusy,

    /// Field registry error
    #[error(transparent)]
    Fields(#[from] loomcms_fields::FieldsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ContentError {
    /// Create an invalid value error
    pub fn invalid_value(handle: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            handle: handle.into(),
            message: message.into(),
        }
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockBusy)
    }
}

/// A single validation failure tied to one field handle. Collected on content
/// rows during validation and copied to the element when a save fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub handle: String,
    pub message: String,
}

impl FieldError {
    pub fn new(handle: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ContentError::UnsavedElement;
        assert_eq!(
            err.to_string(),
            "cannot save the content of an unsaved element"
        );
    }

    #[test]
    fn test_invalid_value() {
        let err = ContentError::invalid_value("rating", "must be a number");
        assert!(err.to_string().contains("rating"));
        assert!(err.to_string().contains("must be a number"));
    }

    #[test]
    fn test_retryable() {
        assert!(ContentError::LockBusy.is_retryable());
        assert!(!ContentError::UnsavedElement.is_retryable());
    }
}
