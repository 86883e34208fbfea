//! Container errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A container file could not be read or written.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Filesystem failure.
    #[error("container io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The bytes do not form a valid container.
    #[error("malformed container at byte {offset}: {message}")]
    Malformed { offset: usize, message: String },

    /// Valid container, but uses a feature this codec does not handle.
    #[error("unsupported container content: {0}")]
    Unsupported(String),
}

impl ContainerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ContainerError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(offset: usize, message: impl Into<String>) -> Self {
        ContainerError::Malformed {
            offset,
            message: message.into(),
        }
    }
}
