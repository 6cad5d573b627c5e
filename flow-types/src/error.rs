//! Error types for flowsync record types.

use thiserror::Error;

/// Errors raised while constructing or validating shared records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    /// Settings violate a range constraint.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The system random source failed.
    #[error("random source failed: {0}")]
    Random(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TypesError::InvalidSettings("focus_minutes must be > 0".into());
        assert_eq!(
            err.to_string(),
            "invalid settings: focus_minutes must be > 0"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypesError>();
    }
}
