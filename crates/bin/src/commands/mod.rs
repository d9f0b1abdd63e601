//! Command implementations.

pub mod add;
pub mod check;
pub mod greet;
pub mod hook;
pub mod invite;
pub mod keys;

use std::path::PathBuf;

use promus::{Config, MasterIdentity, exec::SystemRunner, identity::IdentityDirectory};

use crate::cli::ConfigArgs;

/// Result type shared by the commands
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Process-wide state built once in `main`.
pub struct Context {
    pub config: Config,
    pub runner: SystemRunner,
}

impl Context {
    /// Discover the host owner and apply command-line overrides.
    pub fn from_args(args: &ConfigArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let user_home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or("HOME is not set")?;
        let runner = SystemRunner::new();

        let mut master = MasterIdentity::discover(&runner, |name| std::env::var(name).ok());
        if let Some(email) = &args.master_email {
            master.email = email.clone();
        }

        let mut config = Config::new(master, user_home);
        if let Some(home) = &args.home {
            config = config.with_home(home);
        }
        if let Some(path) = &args.authorized_keys {
            config = config.with_authorized_keys(path);
        }
        Ok(Self { config, runner })
    }

    /// The identity directory as currently saved.
    pub fn directory(&self) -> IdentityDirectory {
        IdentityDirectory::from_file(&self.config.users_file)
    }
}
