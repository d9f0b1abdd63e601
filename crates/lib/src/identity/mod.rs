//! Identity directory for Promus
//!
//! This module holds the registry of principals (keyed by email) and their
//! registered SSH keys, and resolves loose principal references found in ACL
//! files and on the command line to a canonical email.

pub mod directory;
pub mod errors;
pub mod types;

pub use directory::IdentityDirectory;
pub use errors::IdentityError;
pub use types::{Key, Principal, short_fingerprint};
