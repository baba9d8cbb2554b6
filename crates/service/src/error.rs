//! Service-level error type.

use roadgrid_convert::ConvertError;
use roadgrid_core::error::CoreError;

/// Error type for import service operations.
///
/// Domain failures arrive as [`CoreError`]; infrastructure failures
/// (converter subprocess, database, filesystem) are wrapped so the
/// caller — an HTTP layer or CLI — can map them to its own surface.
/// A failed validation is never an error: it is returned as data.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for service return values.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn core_errors_pass_through_transparently() {
        let err: ServiceError = CoreError::Validation("bad scope".into()).into();
        assert_matches!(err, ServiceError::Core(CoreError::Validation(_)));
        assert_eq!(err.to_string(), "Validation error: bad scope");
    }

    #[test]
    fn io_errors_are_wrapped() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ServiceError = io.into();
        assert_matches!(err, ServiceError::Io(_));
    }
}
