//! CLI argument definitions for the Promus binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

/// Promus access control for git over SSH
#[derive(Parser, Debug)]
#[command(name = "promus")]
#[command(about = "Promus: per-file access control for git repositories served over SSH")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Locations and identity overrides shared by every command
#[derive(clap::Args, Debug, Clone)]
pub struct ConfigArgs {
    /// State directory [default: ~/.promus]
    #[arg(long, global = true, env = "PROMUS_HOME")]
    pub home: Option<PathBuf>,

    /// SSH authorized_keys file [default: ~/.ssh/authorized_keys]
    #[arg(long, global = true, env = "PROMUS_AUTHORIZED_KEYS")]
    pub authorized_keys: Option<PathBuf>,

    /// Email of the host owner [default: git config user.email]
    #[arg(long, global = true, env = "PROMUS_MASTER_EMAIL")]
    pub master_email: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve a guest connection (run by sshd through authorized_keys)
    Greet,
    /// Register a guest from a pending invitation
    Add(AddArgs),
    /// Invite someone to connect with a one-time key
    Invite(InviteArgs),
    /// Inspect or reconcile the authorized_keys store
    Keys(KeysArgs),
    /// git hook entry points
    Hook(HookArgs),
    /// Validate ACL and profile files
    Check(CheckArgs),
}

/// Arguments for the add command
#[derive(clap::Args, Debug)]
pub struct AddArgs {
    #[command(subcommand)]
    pub command: AddCommands,
}

#[derive(Subcommand, Debug)]
pub enum AddCommands {
    /// Confirm the invitation issued to EMAIL with the payload in
    /// SSH_ORIGINAL_COMMAND
    User {
        /// Email the invitation was issued to
        email: String,
    },
}

/// Arguments for the invite command
#[derive(clap::Args, Debug)]
pub struct InviteArgs {
    /// Email of the person to invite
    pub email: String,
}

/// Arguments for the keys command
#[derive(clap::Args, Debug)]
pub struct KeysArgs {
    #[command(subcommand)]
    pub command: KeysCommands,
}

#[derive(Subcommand, Debug)]
pub enum KeysCommands {
    /// List registered keys, pending invitations and foreign entries
    List {
        /// Output format
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    /// Rewrite authorized_keys in canonical form
    Sync,
}

/// Arguments for the hook command
#[derive(clap::Args, Debug)]
pub struct HookArgs {
    #[command(subcommand)]
    pub command: HookCommands,
}

#[derive(Subcommand, Debug)]
pub enum HookCommands {
    /// Reject a commit touching files the committer may not modify
    PreCommit,
    /// Notify the users following the repository about the new commit
    PostCommit,
    /// Install the pre-commit and post-commit hooks into a repository
    Install {
        /// Path of the repository (working tree or bare)
        repo: PathBuf,
    },
}

/// Arguments for the check command
#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    #[command(subcommand)]
    pub command: CheckCommands,
}

#[derive(Subcommand, Debug)]
pub enum CheckCommands {
    /// Parse an ACL file and summarize it
    Acl {
        /// Path of the ACL file
        file: PathBuf,
    },
    /// Parse a profile file
    Profile {
        /// Path of the profile file
        file: PathBuf,
    },
}
