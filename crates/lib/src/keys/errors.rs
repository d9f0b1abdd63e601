//! Error types for the authorized_keys reconciler.

use std::path::PathBuf;

use thiserror::Error as ThisError;

use crate::{Error, identity::IdentityError};

/// Errors that can occur while reading, rewriting or enrolling through the
/// authorized_keys store.
#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum KeysError {
    /// The store could not be read.
    #[error("Unable to read {}: {source}", path.display())]
    Read {
        /// Path of the file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The rewritten store could not be persisted.
    #[error("Unable to write {}: {source}", path.display())]
    Persist {
        /// Path of the file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The one-time backup could not be created.
    #[error("Unable to back up authorized_keys to {}: {source}", path.display())]
    Backup {
        /// Path of the backup
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The identity directory could not be saved.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Another process changed the store between our read and our write.
    #[error("{} was modified concurrently; gave up after {attempts} attempts", path.display())]
    ConcurrentModification {
        /// Path of the contended file
        path: PathBuf,
        /// Read-modify-write cycles tried
        attempts: usize,
    },

    /// No pending invitation matches the key the guest connected with.
    #[error("No pending invitation for key ending in '{suffix}'")]
    InvitationNotFound {
        /// Trailing characters of the invitation key
        suffix: String,
    },

    /// The invitation was issued to someone else.
    #[error("Email mismatch: invitation was issued to {expected}, not {actual}")]
    EmailMismatch {
        /// Email the invitation was issued to
        expected: String,
        /// Email the guest supplied
        actual: String,
    },

    /// A configured wrapper command could not be turned into a pattern.
    #[error("Invalid wrapper command '{command}': {source}")]
    InvalidWrapper {
        /// The configured command
        command: String,
        /// The underlying regex error
        #[source]
        source: regex::Error,
    },

    /// The enrollment payload sent by a guest is malformed.
    #[error("Malformed enrollment request: {reason}")]
    MalformedEnrollment {
        /// What is wrong with it
        reason: String,
    },
}

impl KeysError {
    /// Check if this error means a pending invitation does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, KeysError::InvitationNotFound { .. })
    }

    /// Check if this error is a malformed request.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, KeysError::MalformedEnrollment { .. })
    }

    /// Check if the optimistic write lost against a concurrent writer.
    pub fn is_concurrency_error(&self) -> bool {
        matches!(self, KeysError::ConcurrentModification { .. })
    }

    /// Check if the invitation belongs to a different email.
    pub fn is_email_mismatch(&self) -> bool {
        matches!(self, KeysError::EmailMismatch { .. })
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            KeysError::Read { .. } | KeysError::Persist { .. } | KeysError::Backup { .. } => true,
            KeysError::Identity(identity_err) => identity_err.is_io_error(),
            _ => false,
        }
    }
}

impl From<KeysError> for Error {
    fn from(err: KeysError) -> Self {
        // Keep the identity error at the top level so callers see one kind
        match err {
            KeysError::Identity(identity_err) => Error::Identity(identity_err),
            other => Error::Keys(other),
        }
    }
}
