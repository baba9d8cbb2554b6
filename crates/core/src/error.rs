//! Domain error taxonomy shared across the workspace.

use crate::types::DbId;

/// Domain-level error type for the import version service.
///
/// Infrastructure failures (database, filesystem, conversion subprocess)
/// have their own error types and are wrapped at the service boundary;
/// `CoreError` covers the business-rule failures.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A referenced entity does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// Input failed a business-rule check (bad selector, bad enum value, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// An operation was attempted against a record in the wrong lifecycle
    /// state (publish on non-draft, delete on non-draft, rollback without
    /// a snapshot).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A uniqueness or concurrency conflict.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_includes_entity_and_id() {
        let err = CoreError::NotFound {
            entity: "import version",
            id: 42,
        };
        assert_eq!(err.to_string(), "import version with id 42 not found");
    }

    #[test]
    fn invalid_state_message() {
        let err = CoreError::InvalidState("only draft versions can be deleted".into());
        assert_eq!(
            err.to_string(),
            "Invalid state: only draft versions can be deleted"
        );
    }
}
