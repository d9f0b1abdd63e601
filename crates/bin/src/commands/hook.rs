//! git hooks.

use std::path::Path;

use promus::{
    decision,
    exec::SystemRunner,
    git,
    notify::{self, Mailer},
    session,
};
use tracing::info;

use super::{CommandResult, Context};

const HOOKS: [&str; 2] = ["pre-commit", "post-commit"];

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Run the `hook pre-commit` command
///
/// Every violation is printed before the commit is rejected.
pub fn pre_commit(ctx: &Context) -> CommandResult {
    let runner = SystemRunner::new();
    let directory = ctx.directory();
    let actor = session::committer(env, ctx.config.master_email())?;

    let report = decision::review_staged(&runner, &directory, &ctx.config, &actor)?;
    if !report.is_clean() {
        for line in report.render().lines() {
            eprintln!("PRE-COMMIT>> {line}");
        }
        std::process::exit(1);
    }
    Ok(())
}

/// Run the `hook post-commit` command
pub fn post_commit(ctx: &Context, mailer: &dyn Mailer) -> CommandResult {
    let runner = SystemRunner::new();
    let directory = ctx.directory();
    let master = ctx.config.master_email();
    let committer = session::committer(env, master)?;
    let policy = git::load_policy(&runner, &directory, master)?;

    let repo = std::env::current_dir()?;
    let repo = repo
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if let Some(message) = notify::notify_commit(&runner, &policy, mailer, &repo, &committer)? {
        info!("Notified {} users of {repo}", message.to.len());
    }
    Ok(())
}

/// Run the `hook install` command
pub fn install(repo: &Path) -> CommandResult {
    let git_dir = repo.join(".git");
    let hooks_dir = if git_dir.is_dir() {
        git_dir.join("hooks")
    } else {
        repo.join("hooks")
    };
    let program = std::env::current_exe()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|_| "promus".to_string());

    for hook in HOOKS {
        let path = git::install_hook(&hooks_dir, hook, &program)?;
        println!("Installed {}", path.display());
    }
    Ok(())
}
