//!
//! Promus: host bare git repositories over SSH and hand out fine-grained,
//! per-file write access to collaborators who authenticate by SSH public key.
//!
//! ## Core Concepts
//!
//! * **Identity directory (`identity::IdentityDirectory`)**: the registry
//!   mapping an email to its registered keys, and the resolver that turns a
//!   loose reference (email, username or name fragment) into that email.
//! * **ACL policies (`acl::Policy`)**: the parsed `.acl` file. Admins, users,
//!   teams and an ordered list of path rules where the last matching rule
//!   decides.
//! * **Profiles (`profile::Profile`)**: per-user `.{email}.profile` files
//!   controlling notifications.
//! * **Key store (`keys::KeyStore`)**: the reconciler that reads the SSH
//!   `authorized_keys` file into registered, pending and foreign partitions
//!   and rewrites it deterministically without losing anything it does not
//!   own.
//! * **Access decisions (`decision::AccessDecision`)**: the façade a commit
//!   hook calls with the acting principal and the modified files, collecting
//!   every violation into one `Report`.
//! * **Sessions (`session::Guest`)**: the acting principal of an SSH
//!   connection, resolved from the environment sshd hands us.

pub mod acl;
pub mod config;
pub mod constants;
pub mod decision;
pub mod exec;
pub mod git;
pub mod identity;
pub mod keys;
pub mod notify;
pub mod profile;
pub mod session;

mod atomic;

pub use config::{Config, MasterIdentity};

/// Result type used throughout the Promus library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Promus library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured ACL errors from the acl module
    #[error(transparent)]
    Acl(acl::AclError),

    /// Structured profile errors from the profile module
    #[error(transparent)]
    Profile(profile::ProfileError),

    /// Structured identity directory errors from the identity module
    #[error(transparent)]
    Identity(identity::IdentityError),

    /// Structured authorized_keys errors from the keys module
    #[error(transparent)]
    Keys(keys::KeysError),

    /// Structured session errors from the session module
    #[error(transparent)]
    Session(session::SessionError),

    /// Structured subprocess errors from the exec module
    #[error(transparent)]
    Exec(exec::ExecError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Acl(_) => "acl",
            Error::Profile(_) => "profile",
            Error::Identity(_) => "identity",
            Error::Keys(_) => "keys",
            Error::Session(_) => "session",
            Error::Exec(_) => "exec",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Acl(acl_err) => acl_err.is_missing(),
            Error::Profile(profile_err) => profile_err.is_missing(),
            Error::Keys(keys_err) => keys_err.is_not_found(),
            Error::Session(session_err) => session_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error is a parse failure of a user-edited file.
    pub fn is_parse_error(&self) -> bool {
        match self {
            Error::Acl(acl_err) => acl_err.is_parse_error(),
            Error::Profile(profile_err) => profile_err.is_parse_error(),
            Error::Keys(keys_err) => keys_err.is_parse_error(),
            _ => false,
        }
    }

    /// Check if this error must terminate an SSH session.
    pub fn is_fatal_session_error(&self) -> bool {
        match self {
            Error::Session(session_err) => session_err.is_fatal(),
            _ => false,
        }
    }

    /// Check if this error indicates a concurrent writer got in the way.
    pub fn is_concurrency_error(&self) -> bool {
        match self {
            Error::Keys(keys_err) => keys_err.is_concurrency_error(),
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Identity(identity_err) => identity_err.is_io_error(),
            Error::Keys(keys_err) => keys_err.is_io_error(),
            Error::Exec(exec_err) => exec_err.is_spawn_error(),
            _ => false,
        }
    }
}
