//! Error types for redwindow.

use thiserror::Error;

/// Main error type for redwindow operations.
#[derive(Error, Debug)]
pub enum WindowError {
    /// Configuration-related errors, including a store built without a
    /// procedure runner or client.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport or connection failure reported by the Redis client
    #[error("Store error: {0}")]
    Store(#[source] redis::RedisError),

    /// The server rejected or failed to execute a procedure
    #[error("Procedure error: {0}")]
    Procedure(#[source] redis::RedisError),

    /// A procedure reply did not match the expected shape
    #[error("Unexpected procedure reply: {0}")]
    UnexpectedReply(String),

    /// Caller supplied an argument outside the accepted range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<redis::RedisError> for WindowError {
    fn from(err: redis::RedisError) -> Self {
        // Server-side failures are procedure errors, a reply that does not
        // convert is a contract violation, and the rest never reached a script.
        match err.kind() {
            redis::ErrorKind::ResponseError | redis::ErrorKind::NoScriptError => {
                WindowError::Procedure(err)
            }
            redis::ErrorKind::TypeError => WindowError::UnexpectedReply(err.to_string()),
            _ => WindowError::Store(err),
        }
    }
}

/// Result type alias for redwindow operations.
pub type Result<T> = std::result::Result<T, WindowError>;
