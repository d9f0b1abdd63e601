//! Session error types.
//!
//! Every variant here ends the SSH session; the greeting front end prints
//! the message and exits nonzero.

use thiserror::Error as ThisError;

use crate::Error;

/// Errors resolving or vetting the acting principal of an SSH session.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum SessionError {
    /// sshd did not hand us the expected variable.
    #[error("{var} was not set")]
    MissingEnvironment {
        /// Name of the variable
        var: String,
    },

    /// The identity variable is not `email,fingerprint`.
    #[error("{var} is malformed: '{value}'")]
    MalformedEnvironment {
        /// Name of the variable
        var: String,
        /// Its value
        value: String,
    },

    /// The claimed identity is not registered.
    #[error("PROMUS_USER[{email},{fingerprint}] not found")]
    IdentityNotFound {
        /// Claimed email
        email: String,
        /// Claimed short fingerprint
        fingerprint: String,
    },

    /// The command tries to chain several commands.
    #[error("more than one command: {command}")]
    CommandInjectionSuspected {
        /// The command as received
        command: String,
    },

    /// The guest asked for an interactive shell.
    #[error("no interactive shell allowed")]
    InteractiveShellDenied,

    /// The guest asked for a program that is not served.
    #[error("command not allowed: {command}")]
    CommandNotAllowed {
        /// The program name
        command: String,
    },

    /// The guest is not a user of the repository they asked for.
    #[error("{email} may not access {repo}")]
    AccessDenied {
        /// The guest
        email: String,
        /// The requested repository
        repo: String,
    },
}

impl SessionError {
    /// Check if the claimed identity is unknown.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::IdentityNotFound { .. })
    }

    /// Check if the command was rejected as an injection attempt.
    pub fn is_injection(&self) -> bool {
        matches!(self, SessionError::CommandInjectionSuspected { .. })
    }

    /// Check if the guest was turned away by a repository ACL.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, SessionError::AccessDenied { .. })
    }

    /// Whether the session must end. Currently true for every variant.
    pub fn is_fatal(&self) -> bool {
        true
    }
}

impl From<SessionError> for Error {
    fn from(err: SessionError) -> Self {
        Error::Session(err)
    }
}
