mod cli;
mod commands;
mod output;

use clap::Parser;
use promus::notify::LogMailer;
use tracing_subscriber::EnvFilter;

use crate::cli::{AddCommands, CheckCommands, Cli, Commands, HookCommands, KeysCommands};
use crate::commands::Context;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the git protocol stream during `greet`
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("promus=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = Context::from_args(&cli.config)?;
    let mailer = LogMailer;

    match cli.command {
        Commands::Greet => commands::greet::run(&ctx),
        Commands::Add(args) => match args.command {
            AddCommands::User { email } => commands::add::user(&ctx, &mailer, &email),
        },
        Commands::Invite(args) => commands::invite::run(&ctx, &mailer, &args),
        Commands::Keys(args) => match args.command {
            KeysCommands::List { format } => commands::keys::list(&ctx, format),
            KeysCommands::Sync => commands::keys::sync(&ctx),
        },
        Commands::Hook(args) => match args.command {
            HookCommands::PreCommit => commands::hook::pre_commit(&ctx),
            HookCommands::PostCommit => commands::hook::post_commit(&ctx, &mailer),
            HookCommands::Install { repo } => commands::hook::install(&repo),
        },
        Commands::Check(args) => match args.command {
            CheckCommands::Acl { file } => commands::check::acl(&ctx, &file),
            CheckCommands::Profile { file } => commands::check::profile(&file),
        },
    }
}
