//! Error types for the field registry

use thiserror::Error;

/// Result type for field registry operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Errors that can occur in field registry operations
#[derive(Debug, Error)]
pub enum FieldsError {
    /// Field not found by ULID
    #[error("field not found by id: {id}")]
    FieldNotFoundById { id: String },

    /// Duplicate field handle
    #[error("duplicate field handle: {handle}")]
    DuplicateHandle { handle: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FieldsError::DuplicateHandle {
            handle: "title".into(),
        };
        assert_eq!(err.to_string(), "duplicate field handle: title");
    }

    #[test]
    fn test_not_found_by_id_display() {
        let err = FieldsError::FieldNotFoundById { id: "01ARZ".into() };
        assert!(err.to_string().contains("01ARZ"));
    }
}
