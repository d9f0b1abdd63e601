//! Outgoing notifications.
//!
//! Delivering mail is an external concern; Promus only composes messages and
//! hands them to a [`Mailer`]. [`LogMailer`] records them through `tracing`
//! for hosts without a mail relay.
//!
//! After a commit, [`notify_commit`] tells every other user of the
//! repository whose profile asks for it.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::{
    acl::Policy,
    config::MasterIdentity,
    exec::CommandRunner,
    git,
    profile::Profile,
};

/// An email ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
    pub attachments: Vec<PathBuf>,
}

impl Message {
    /// Welcome message sent to a guest (and the host owner) once an
    /// invitation has been confirmed.
    pub fn registration(guest_email: &str, guest_name: &str, master: &MasterIdentity) -> Self {
        let body = format!(
            "Your public key has been added and you may now connect to {host} as \
             {user} using your public key. You may only run git and other allowed \
             commands however.",
            host = master.host,
            user = master.user,
        );
        Self {
            to: vec![guest_email.to_string(), master.email.clone()],
            subject: "Connection successful".to_string(),
            text: format!("Hello {guest_name},\n\n{body}\n\n- Promus\n"),
            html: Some(format!(
                "<p>Hello {guest_name},</p>\n<p>{body}</p>\n<p><strong>- Promus</strong></p>\n"
            )),
            attachments: Vec::new(),
        }
    }

    /// Invitation message carrying the private key a guest uses to confirm.
    pub fn invitation(guest_email: &str, master: &MasterIdentity, private_key: PathBuf) -> Self {
        let body = format!(
            "{name} has invited you to collaborate on git repositories hosted on \
             {host}. Connect once to {user}@{host} with the attached key to \
             register your own public key.",
            name = master.name,
            host = master.host,
            user = master.user,
        );
        Self {
            to: vec![guest_email.to_string()],
            subject: format!("Invitation from {}", master.name),
            text: format!("Hello,\n\n{body}\n\n- Promus\n"),
            html: None,
            attachments: vec![private_key],
        }
    }

    /// Summary of a commit sent to the users who follow the repository.
    pub fn change(recipients: Vec<String>, repo: &str, committer: &str, paths: &[String]) -> Self {
        let listing: String = paths.iter().map(|path| format!("  {path}\n")).collect();
        Self {
            to: recipients,
            subject: format!("[{repo}] changes by {committer}"),
            text: format!("{committer} committed to {repo}:\n\n{listing}\n- Promus\n"),
            html: None,
            attachments: Vec::new(),
        }
    }
}

/// Users of `policy` other than `committer` whose profile at `HEAD` wants
/// to hear about `paths`.
///
/// A user without a committed profile gets [`Profile::default_for`]; one
/// whose profile no longer parses is skipped.
pub fn interested_users(
    runner: &dyn CommandRunner,
    policy: &Policy,
    committer: &str,
    paths: &[String],
) -> Vec<String> {
    policy
        .users()
        .iter()
        .filter(|email| email.as_str() != committer)
        .filter(|email| {
            let profile = match git::read_committed_profile(runner, email) {
                Ok(profile) => profile,
                Err(e) if e.is_missing() => Profile::default_for(email),
                Err(e) => {
                    warn!("Not notifying {email}: {e}");
                    return false;
                }
            };
            profile.wants_notification(paths)
        })
        .cloned()
        .collect()
}

/// Tell interested users about the commit at `HEAD`.
///
/// Returns the message handed to `mailer`, or `None` when nobody wants it.
pub fn notify_commit(
    runner: &dyn CommandRunner,
    policy: &Policy,
    mailer: &dyn Mailer,
    repo: &str,
    committer: &str,
) -> crate::Result<Option<Message>> {
    let paths = git::committed_paths(runner, "HEAD")?;
    let recipients = interested_users(runner, policy, committer, &paths);
    if recipients.is_empty() {
        debug!("Nobody follows {repo} for this commit");
        return Ok(None);
    }
    let message = Message::change(recipients, repo, committer, &paths);
    mailer.send(&message)?;
    Ok(Some(message))
}

/// Something that can deliver a [`Message`].
pub trait Mailer {
    fn send(&self, message: &Message) -> crate::Result<()>;
}

/// Mailer that only logs what it would send.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: &Message) -> crate::Result<()> {
        if message.to.is_empty() {
            return Ok(());
        }
        info!(
            to = %message.to.join(","),
            subject = %message.subject,
            attachments = message.attachments.len(),
            "Notification queued"
        );
        Ok(())
    }
}
