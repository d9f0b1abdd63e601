//! Identity directory error types.

use std::path::PathBuf;

use thiserror::Error as ThisError;

use crate::Error;

/// Errors that can occur while persisting the identity directory.
///
/// Loading never fails: a missing or corrupt directory file is treated as an
/// empty directory so that a fresh host can bootstrap itself.
#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum IdentityError {
    /// The directory could not be encoded.
    #[error("Failed to encode identity directory: {source}")]
    Encode {
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// The directory file could not be written.
    #[error("Failed to write identity directory {}: {source}", path.display())]
    Persist {
        /// Target path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl IdentityError {
    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        matches!(self, IdentityError::Persist { .. })
    }
}

impl From<IdentityError> for Error {
    fn from(err: IdentityError) -> Self {
        Error::Identity(err)
    }
}
