//! git plumbing used by the hooks and the configuration discovery.
//!
//! Everything goes through a [`CommandRunner`], so tests can substitute
//! canned git output.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{
    acl::{AclError, Policy},
    atomic::write_atomic,
    constants::ACL_FILE,
    decision::ModifiedFile,
    exec::{CommandRunner, ExecError, render_command},
    identity::IdentityDirectory,
    profile::{Profile, ProfileError, profile_path_for},
};

/// A global git configuration value, or `None` when unset or empty.
pub fn config_value(runner: &dyn CommandRunner, key: &str) -> Option<String> {
    let output = runner
        .run("git", &["config", "--global", "--get", key])
        .ok()?;
    let value = output.stdout.trim();
    (output.success() && !value.is_empty()).then(|| value.to_string())
}

const STAGED_ARGS: [&str; 5] = ["diff", "--cached", "--name-status", "--no-renames", "-z"];

/// Files staged for the next commit with their staged content.
///
/// Paths are read NUL-separated, so git never quotes or escapes them. A
/// `D` status is a deletion and has no content. Failing to read the staged
/// content of any other path is an error, never a deletion.
pub fn staged_changes(runner: &dyn CommandRunner) -> Result<Vec<ModifiedFile>, ExecError> {
    let output = runner.run_checked("git", &STAGED_ARGS)?;
    let unexpected = |field: &str| ExecError::UnexpectedOutput {
        command: render_command("git", &STAGED_ARGS),
        output: field.to_string(),
    };

    let mut fields = output.stdout.split('\0').filter(|field| !field.is_empty());
    let mut files = Vec::new();
    while let Some(status) = fields.next() {
        if !status.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(unexpected(status));
        }
        let path = fields.next().ok_or_else(|| unexpected(status))?;
        let content = if status == "D" {
            None
        } else {
            let object = format!(":{path}");
            Some(runner.run_checked("git", &["show", &object])?.stdout)
        };
        files.push(ModifiedFile::new(path, content));
    }
    debug!("{} staged changes", files.len());
    Ok(files)
}

/// Paths touched by the commit `rev`, deletions included.
pub fn committed_paths(runner: &dyn CommandRunner, rev: &str) -> Result<Vec<String>, ExecError> {
    let output = runner.run_checked(
        "git",
        &["diff-tree", "--no-commit-id", "--name-only", "-r", "-z", "--root", rev],
    )?;
    Ok(output
        .stdout
        .split('\0')
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .collect())
}

/// Content of `path` at `rev`, or `None` when it does not exist there.
pub fn committed_file(runner: &dyn CommandRunner, rev: &str, path: &str) -> Option<String> {
    show(runner, &format!("{rev}:{path}"))
}

fn show(runner: &dyn CommandRunner, object: &str) -> Option<String> {
    match runner.run("git", &["show", object]) {
        Ok(output) if output.success() => Some(output.stdout),
        Ok(output) => {
            debug!("git show {object}: {}", output.stderr.trim());
            None
        }
        Err(e) => {
            debug!("git show {object}: {e}");
            None
        }
    }
}

/// Parse the ACL committed at `HEAD`.
///
/// A repository without one yields [`AclError::Missing`]; callers fall back
/// to [`Policy::admin_only`].
pub fn read_committed_acl(
    runner: &dyn CommandRunner,
    directory: &IdentityDirectory,
    master: Option<&str>,
) -> Result<Policy, AclError> {
    let text = committed_file(runner, "HEAD", ACL_FILE).ok_or_else(|| AclError::Missing {
        reason: format!("no {ACL_FILE} committed at HEAD"),
    })?;
    Policy::parse(&text, directory, master)
}

/// The policy in force at `HEAD`.
///
/// A repository without a committed ACL belongs to the host owner alone:
/// the result is [`Policy::admin_only`] for `master`.
pub fn load_policy(
    runner: &dyn CommandRunner,
    directory: &IdentityDirectory,
    master: Option<&str>,
) -> Result<Policy, AclError> {
    match read_committed_acl(runner, directory, master) {
        Err(AclError::Missing { reason }) => {
            info!("{reason}; only the host owner has access");
            Ok(Policy::admin_only(master.unwrap_or_default()))
        }
        result => result,
    }
}

/// Parse the profile of `email` committed at `HEAD`.
pub fn read_committed_profile(
    runner: &dyn CommandRunner,
    email: &str,
) -> Result<Profile, ProfileError> {
    let path = profile_path_for(email);
    let text = committed_file(runner, "HEAD", &path).ok_or_else(|| ProfileError::Missing {
        reason: format!("no {path} committed at HEAD"),
    })?;
    Profile::parse(&text)
}

/// Install `hook` into `hooks_dir` as a script that hands over to
/// `program hook <hook>`.
///
/// An existing hook is moved aside with a timestamp suffix first.
pub fn install_hook(hooks_dir: &Path, hook: &str, program: &str) -> std::io::Result<PathBuf> {
    let path = hooks_dir.join(hook);
    if path.exists() {
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
        let aside = hooks_dir.join(format!("{hook}.{stamp}"));
        fs::rename(&path, &aside)?;
        info!("Moved existing {hook} hook to {}", aside.display());
    }
    let script = format!(
        "#!/bin/sh\n# {hook} hook generated on {}\nexec {program} hook {hook} \"$@\"\n",
        chrono::Local::now().format("%a %b %d, %Y %r")
    );
    write_atomic(&path, script.as_bytes(), 0o755)?;
    info!("Installed {hook} hook at {}", path.display());
    Ok(path)
}
