//! Process configuration.
//!
//! A [`Config`] is built once at process entry and passed by reference to
//! every component that needs to know who owns the host or where the state
//! files live.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    constants::{ACL_FILE, BACKUP_SUFFIX, DEFAULT_ADD_USER_COMMAND, DEFAULT_GREET_COMMAND},
    exec::CommandRunner,
    git,
};

/// The owner of the host account. Always an admin of every repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterIdentity {
    /// Login name of the hosting account
    pub user: String,
    /// Display name
    pub name: String,
    /// Canonical email
    pub email: String,
    /// Host name of this machine
    pub host: String,
    /// Short alias of this machine
    pub alias: String,
}

impl MasterIdentity {
    /// Discover the host owner from global git configuration
    /// (`user.name`, `user.email`, `host.alias`), the `USER` variable and
    /// the `hostname` program.
    ///
    /// Values that cannot be determined are left empty.
    pub fn discover(runner: &dyn CommandRunner, env: impl Fn(&str) -> Option<String>) -> Self {
        let host = match runner.run("hostname", &[]) {
            Ok(output) if output.success() => output.stdout.trim().to_string(),
            _ => String::new(),
        };
        let master = Self {
            user: env("USER").unwrap_or_default(),
            name: git::config_value(runner, "user.name").unwrap_or_default(),
            email: git::config_value(runner, "user.email").unwrap_or_default(),
            host,
            alias: git::config_value(runner, "host.alias").unwrap_or_default(),
        };
        if master.email.is_empty() {
            warn!("git user.email is not configured; the host owner has no admin identity");
        }
        master
    }
}

/// Locations and conventions shared by all Promus components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Owner of the host account
    pub master: MasterIdentity,
    /// State directory (`~/.promus`)
    pub home: PathBuf,
    /// The SSH authorized_keys store
    pub authorized_keys: PathBuf,
    /// The identity directory file
    pub users_file: PathBuf,
    /// Program embedded in registered-principal wrappers
    pub greet_command: String,
    /// Program embedded in pending-invitation wrappers
    pub add_user_command: String,
    /// Paths only admins may modify
    pub protected_patterns: Vec<String>,
}

impl Config {
    /// Configuration with the conventional layout under `user_home`:
    /// `~/.promus/users` and `~/.ssh/authorized_keys`.
    pub fn new(master: MasterIdentity, user_home: impl AsRef<Path>) -> Self {
        let user_home = user_home.as_ref();
        let home = user_home.join(".promus");
        Self {
            master,
            users_file: home.join("users"),
            home,
            authorized_keys: user_home.join(".ssh").join("authorized_keys"),
            greet_command: DEFAULT_GREET_COMMAND.to_string(),
            add_user_command: DEFAULT_ADD_USER_COMMAND.to_string(),
            protected_patterns: vec![ACL_FILE.to_string()],
        }
    }

    /// Move the state directory; the identity directory file moves with it.
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = home.into();
        self.users_file = self.home.join("users");
        self
    }

    /// Use a different authorized_keys file.
    pub fn with_authorized_keys(mut self, path: impl Into<PathBuf>) -> Self {
        self.authorized_keys = path.into();
        self
    }

    /// Use a different identity directory file.
    pub fn with_users_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.users_file = path.into();
        self
    }

    /// Use a different program in registered-principal wrappers.
    pub fn with_greet_command(mut self, command: impl Into<String>) -> Self {
        self.greet_command = command.into();
        self
    }

    /// Use a different program in pending-invitation wrappers.
    pub fn with_add_user_command(mut self, command: impl Into<String>) -> Self {
        self.add_user_command = command.into();
        self
    }

    /// Email of the host owner, if configured.
    pub fn master_email(&self) -> Option<&str> {
        Some(self.master.email.as_str()).filter(|email| !email.is_empty())
    }

    /// Protected patterns as string slices.
    pub fn protected(&self) -> Vec<&str> {
        self.protected_patterns.iter().map(String::as_str).collect()
    }

    /// Where the one-time authorized_keys backup is kept.
    pub fn backup_path(&self) -> PathBuf {
        let mut path = self.authorized_keys.clone().into_os_string();
        path.push(BACKUP_SUFFIX);
        PathBuf::from(path)
    }

    /// Where generated invitation key pairs are kept.
    pub fn invitations_dir(&self) -> PathBuf {
        self.home.join("invitations")
    }
}
