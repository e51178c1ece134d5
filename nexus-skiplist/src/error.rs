//! Error types.
//!
//! Missing keys and duplicate inserts are ordinary outcomes, reported through
//! return values (`bool`, `Option`, [`InsertOutcome`](crate::InsertOutcome)).
//! Only configuration mistakes and failures of the backing file surface as
//! [`Error`].

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for skip list operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Primary error type.
#[derive(Error, Debug)]
pub enum Error {
    /// The backing file could not be opened, read, or written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// Builder settings were rejected.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
