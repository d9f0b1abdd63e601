//! Commit-time access decisions
//!
//! [`AccessDecision`] is what the pre-commit hook calls: given the acting
//! principal and every file the commit touches, it checks each path
//! against the [`Policy`] and validates the special files (the ACL and the
//! per-user profiles). Every problem is collected into one [`Report`].

use std::fmt::Write as _;

use thiserror::Error as ThisError;
use tracing::debug;

use crate::{
    Config,
    acl::{AclError, Policy, PrincipalRef},
    constants::ACL_FILE,
    exec::CommandRunner,
    git,
    identity::IdentityDirectory,
    profile::{Profile, ProfileError, profile_owner},
};

/// A file touched by the commit under review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifiedFile {
    /// Repository-relative path
    pub path: String,
    /// Proposed content; `None` for deletions
    pub content: Option<String>,
}

impl ModifiedFile {
    pub fn new(path: impl Into<String>, content: Option<String>) -> Self {
        Self {
            path: path.into(),
            content,
        }
    }
}

/// Why the proposed content of a special file was rejected.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ValidationError {
    #[error(transparent)]
    Acl(#[from] AclError),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Outcome of evaluating one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// Paths the actor may not modify
    pub denied: Vec<String>,
    /// Special files whose proposed content does not parse
    pub validation_errors: Vec<(String, ValidationError)>,
}

impl Report {
    /// Whether the commit may proceed.
    pub fn is_clean(&self) -> bool {
        self.denied.is_empty() && self.validation_errors.is_empty()
    }

    /// One line per problem, for the rejection message.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for path in &self.denied {
            let _ = writeln!(out, "You do not have access to modify \"{path}\"");
        }
        for (path, error) in &self.validation_errors {
            let _ = writeln!(out, "{path}: {error}");
        }
        out
    }
}

/// Evaluates commits against one repository's policy.
#[derive(Debug, Clone, Copy)]
pub struct AccessDecision<'a> {
    policy: &'a Policy,
    directory: &'a IdentityDirectory,
    config: &'a Config,
}

impl<'a> AccessDecision<'a> {
    pub fn new(policy: &'a Policy, directory: &'a IdentityDirectory, config: &'a Config) -> Self {
        Self {
            policy,
            directory,
            config,
        }
    }

    /// Check every modified file.
    ///
    /// - A profile file may be changed by its owner (as long as they are a
    ///   user) or by an admin; its content must parse. Nobody else may
    ///   change it.
    /// - Every other path goes through [`Policy::evaluate`] with the
    ///   configured protected patterns.
    /// - A changed ACL must parse even when the change itself is allowed.
    pub fn evaluate<'p>(
        &self,
        actor: impl Into<PrincipalRef<'p>>,
        files: &[ModifiedFile],
    ) -> Report {
        let actor = actor.into();
        let email = self.policy.resolve_actor(self.directory, actor);
        let is_admin = email.is_some_and(|email| self.policy.is_admin(email));
        let protected = self.config.protected();
        let mut report = Report::default();

        for file in files {
            if let Some(owner) = profile_owner(&file.path) {
                let owns =
                    email.is_some_and(|email| email == owner && self.policy.is_user(email));
                if !(owns || is_admin) {
                    report.denied.push(file.path.clone());
                    continue;
                }
                if let Some(Err(e)) = file.content.as_deref().map(Profile::parse) {
                    report
                        .validation_errors
                        .push((file.path.clone(), e.into()));
                }
                continue;
            }

            if !self
                .policy
                .evaluate(self.directory, actor, Some(&file.path), &protected)
            {
                report.denied.push(file.path.clone());
            }

            if file.path != ACL_FILE {
                continue;
            }
            let master = self.config.master_email();
            if let Some(Err(e)) = file
                .content
                .as_deref()
                .map(|text| Policy::parse(text, self.directory, master))
            {
                report
                    .validation_errors
                    .push((file.path.clone(), e.into()));
            }
        }

        debug!(
            "Evaluated {} files for {actor:?}: {} denied, {} invalid",
            files.len(),
            report.denied.len(),
            report.validation_errors.len()
        );
        report
    }
}

/// Review the changes staged in the repository `runner` works in, the
/// way the pre-commit hook does: every staged change against the policy
/// committed at `HEAD`.
pub fn review_staged(
    runner: &dyn CommandRunner,
    directory: &IdentityDirectory,
    config: &Config,
    actor: &str,
) -> crate::Result<Report> {
    let policy = git::load_policy(runner, directory, config.master_email())?;
    let files = git::staged_changes(runner)?;
    Ok(AccessDecision::new(&policy, directory, config).evaluate(PrincipalRef::Email(actor), &files))
}
