//! Serve one guest connection.
//!
//! sshd runs this through the registered wrapper of the key the guest
//! connected with. Only the git transports are served, and only on
//! repositories whose ACL lists the guest as a user.

use std::{path::Path, process::Command};

use promus::{exec::SystemRunner, git, session::Guest};
use tracing::{info, warn};

use super::{CommandResult, Context};

/// Run the greet command
pub fn run(ctx: &Context) -> CommandResult {
    let directory = ctx.directory();
    let guest = Guest::from_env(&directory, |name| std::env::var(name).ok())?;
    let (program, args) = guest.git_command()?;
    let repo = args.first().ok_or("no repository given")?;

    let runner = SystemRunner::in_dir(Path::new(repo));
    let policy = git::load_policy(&runner, &directory, ctx.config.master_email())?;
    if let Err(e) = guest.authorize(&directory, &policy, repo) {
        warn!("{e}");
        return Err(e.into());
    }

    info!("{} runs {program} {repo}", guest.email);
    let status = Command::new(&program).args(&args).status()?;
    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}
