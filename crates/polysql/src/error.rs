//! Error types for polysql

use thiserror::Error;

/// Result type alias for polysql operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for statement building and execution
#[derive(Debug, Error)]
pub enum DbError {
    /// Cannot establish (or has lost) a database session.
    ///
    /// Fatal to the current connection, not to the process; callers may
    /// retry by invoking `open()` again.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The driver rejected a rendered statement.
    ///
    /// Carries the driver message verbatim plus the failing command text
    /// for diagnostics.
    #[error("Execution error: {message} (while running: {command})")]
    Execution { message: String, command: String },

    /// A builder was used out of sequence: unbalanced predicate groups,
    /// a negative limit/offset, rendering before required fields are set,
    /// or re-using a lock builder after release. Always a programming
    /// error, never retried.
    #[error("Builder state error: {0}")]
    BuilderState(String),

    /// The dialect has no rendering path for the requested statement shape
    /// and no baseline fallback exists.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl DbError {
    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create an execution error for a failing command
    pub fn execution(message: impl Into<String>, command: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            command: command.into(),
        }
    }

    /// Create a builder state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::BuilderState(message.into())
    }

    /// Create an unsupported-operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Check if this is a connection error
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Check if this is a builder state error
    pub fn is_builder_state(&self) -> bool {
        matches!(self, Self::BuilderState(_))
    }

    /// Check if this is an unsupported-operation error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}
