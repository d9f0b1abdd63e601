//! Constants used throughout the Promus library.
//!
//! This module provides central definitions for reserved file names,
//! environment variables and the fixed strings written into the
//! authorized_keys store.

/// Repository-relative path of the access-control file.
pub const ACL_FILE: &str = ".acl";

/// Prefix of a per-user profile file (`.{email}.profile`).
pub const PROFILE_PREFIX: &str = ".";

/// Suffix of a per-user profile file (`.{email}.profile`).
pub const PROFILE_SUFFIX: &str = ".profile";

/// Suffix appended to the authorized_keys path for the one-time backup.
pub const BACKUP_SUFFIX: &str = ".promus-backup";

/// Environment variable carrying `email,fingerprint` of the connected guest.
pub const PROMUS_USER_VAR: &str = "PROMUS_USER";

/// Environment variable sshd sets to the command the client asked for.
pub const SSH_ORIGINAL_COMMAND_VAR: &str = "SSH_ORIGINAL_COMMAND";

/// Number of trailing key characters used as a short fingerprint.
pub const FINGERPRINT_LEN: usize = 10;

/// Number of trailing invitation-key characters a guest sends back when
/// confirming an invitation.
pub const INVITATION_SUFFIX_LEN: usize = 20;

/// Program embedded in registered-principal wrappers.
pub const DEFAULT_GREET_COMMAND: &str = "promus greet";

/// Program embedded in pending-invitation wrappers.
pub const DEFAULT_ADD_USER_COMMAND: &str = "promus add user";

/// Header line prefix of a generated authorized_keys file.
pub const KEYS_HEADER: &str = "# PROMUS: file generated on";

/// Comment introducing the pending-invitation partition.
pub const PENDING_HEADER: &str = "# pending requests:";

/// Comment introducing the foreign partition.
pub const FOREIGN_HEADER: &str = "# non-promus entries:";

/// Characters that chain shell commands; a guest command containing any of
/// them is rejected.
pub const CHAINING_CHARS: [char; 3] = [';', '&', '|'];

/// git server-side programs a guest may run through `greet`.
pub const ALLOWED_GIT_COMMANDS: [&str; 3] =
    ["git-upload-pack", "git-receive-pack", "git-upload-archive"];
