//! Reconciliation of the SSH authorized_keys store
//!
//! The store holds three partitions, always written in this order:
//!
//! 1. registered principals, one canonical wrapper per key, so that sshd
//!    tells `promus greet` who connected through `PROMUS_USER`
//! 2. pending invitations, wrapped in `promus add user <email>`
//! 3. foreign lines, never reordered, rewritten or dropped
//!
//! Reading classifies every line ([`Classifier`]), merges registered
//! entries into the identity directory and migrates the legacy wrapper
//! format. Writing is idempotent: `write(read())` reproduces the same file
//! apart from the timestamp in its header.

pub mod classify;
pub mod errors;
pub mod invitation;
pub mod store;

pub use classify::{Classifier, Line, PendingInvitation};
pub use errors::KeysError;
pub use invitation::{Enrollment, invitation_suffix};
pub use store::{KeyState, KeyStore, MAX_ATTEMPTS};
