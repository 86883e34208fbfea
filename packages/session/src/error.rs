//! Error types for engine sessions.

use std::time::Duration;

use octbridge_container::ContainerError;
use octbridge_value::MarshalError;
use thiserror::Error;

/// Everything a session operation can fail with.
#[derive(Debug, Error)]
pub enum Error {
    /// A value could not be converted to or from the engine's model.
    #[error("marshal error: {0}")]
    Marshal(#[from] MarshalError),

    /// An exchange file could not be read or written.
    #[error("container error: {0}")]
    Container(#[from] ContainerError),

    /// The engine reported a diagnostic, or a name did not resolve.
    #[error("engine error: {message}")]
    Engine { message: String },

    /// The session is closed; call `reopen` to start a new engine.
    #[error("session is closed")]
    SessionClosed,

    /// The engine did not answer in time and was killed.
    #[error("engine did not respond within {after:?}")]
    Timeout { after: Duration },

    /// Launching or talking to the engine process failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn engine(message: impl Into<String>) -> Self {
        Error::Engine {
            message: message.into(),
        }
    }
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
