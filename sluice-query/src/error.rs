//! Error types for pipeline optimization and query execution.

use thiserror::Error;

/// Result type for sluice operations.
pub type SluiceResult<T> = Result<T, SluiceError>;

/// Error type shared by the planning and execution layers.
///
/// The taxonomy is deliberately small:
/// - [`SluiceError::Configuration`] errors are raised synchronously before any
///   I/O is performed (missing primary key, unknown column).
/// - [`SluiceError::Execution`] wraps an underlying driver failure and is
///   never retried by this layer.
/// - [`SluiceError::Mapping`] reports a row-to-entity conversion failure and
///   surfaces through the entity stream as an `Err` item.
///
/// Resource-release failures during `close()` are not represented here at
/// all: they are logged and swallowed so they can never mask the error that
/// triggered the close.
#[derive(Debug, Error)]
pub enum SluiceError {
    /// Invalid setup detected before touching the database.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A driver failure during connection, preparation or execution.
    #[error("Execution error: {message}")]
    Execution {
        /// What the engine was doing when the driver failed.
        message: String,
        /// The underlying driver error, when one exists.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A row could not be converted into an entity.
    #[error("Mapping error for column '{column}': {message}")]
    Mapping {
        /// The column that failed to convert.
        column: String,
        /// What went wrong.
        message: String,
    },
}

impl SluiceError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an execution error without an underlying cause.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution {
            message: msg.into(),
            source: None,
        }
    }

    /// Create an execution error wrapping a driver failure.
    pub fn execution_with(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Execution {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a row mapping error.
    pub fn mapping(column: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Mapping {
            column: column.into(),
            message: msg.into(),
        }
    }

    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this is an execution error.
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SluiceError::configuration("table has no primary key");
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("no primary key"));
    }

    #[test]
    fn test_execution_source_chain() {
        let io = std::io::Error::other("connection refused");
        let err = SluiceError::execution_with("failed to acquire connection", io);
        assert!(err.is_execution());

        let source = std::error::Error::source(&err).expect("source preserved");
        assert!(source.to_string().contains("connection refused"));
    }

    #[test]
    fn test_error_predicates() {
        assert!(SluiceError::configuration("x").is_configuration());
        assert!(!SluiceError::configuration("x").is_execution());
        assert!(SluiceError::execution("x").is_execution());
    }
}
