//! Domain error types
//!
//! This module defines error types specific to domain operations:
//! construction-time validation of paths, aliases, and sequence tags.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid vault-relative path format or content
    #[error("Invalid vault path: {0}")]
    InvalidPath(String),

    /// Invalid alias format (characters outside the storage-safe set)
    #[error("Invalid alias: {0}")]
    InvalidAlias(String),

    /// Invalid sequence tag value
    #[error("Invalid sequence tag: {0}")]
    InvalidTag(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidPath("../escape".to_string());
        assert_eq!(err.to_string(), "Invalid vault path: ../escape");

        let err = DomainError::InvalidTag("-5".to_string());
        assert_eq!(err.to_string(), "Invalid sequence tag: -5");
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::InvalidAlias("x y".to_string());
        let err2 = DomainError::InvalidAlias("x y".to_string());
        let err3 = DomainError::InvalidAlias("other".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
