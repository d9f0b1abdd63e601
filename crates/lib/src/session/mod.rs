//! The acting principal of an SSH session
//!
//! sshd runs the registered wrapper of the key a guest connected with. The
//! wrapper exports `PROMUS_USER=email,fingerprint`, and sshd puts whatever
//! the guest asked to run in `SSH_ORIGINAL_COMMAND`. [`Guest::from_env`]
//! turns the two into a vetted [`Guest`] or a fatal [`SessionError`].

pub mod errors;

pub use errors::SessionError;

use tracing::{debug, info};

use crate::{
    acl::{Policy, PrincipalRef},
    constants::{ALLOWED_GIT_COMMANDS, CHAINING_CHARS, PROMUS_USER_VAR, SSH_ORIGINAL_COMMAND_VAR},
    identity::{IdentityDirectory, Key},
};

/// A connected, identified guest and the command they asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guest {
    pub email: String,
    pub fingerprint: String,
    /// The registered key record they connected with
    pub key: Key,
    /// `SSH_ORIGINAL_COMMAND` as received
    pub command: String,
}

impl Guest {
    /// Resolve and vet the guest from the environment.
    ///
    /// `env` looks up a variable; pass `|name| std::env::var(name).ok()` in
    /// production.
    pub fn from_env(
        directory: &IdentityDirectory,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SessionError> {
        let promus_user = env(PROMUS_USER_VAR).ok_or_else(|| SessionError::MissingEnvironment {
            var: PROMUS_USER_VAR.to_string(),
        })?;
        let command = env(SSH_ORIGINAL_COMMAND_VAR).unwrap_or_default();
        let guest = Self::resolve(directory, &promus_user, &command)?;
        guest.check_command()?;
        Ok(guest)
    }

    /// Look up an `email,fingerprint` pair in the directory.
    pub fn resolve(
        directory: &IdentityDirectory,
        promus_user: &str,
        command: &str,
    ) -> Result<Self, SessionError> {
        let (email, fingerprint) = promus_user
            .trim()
            .split_once(',')
            .filter(|(email, fingerprint)| !email.is_empty() && !fingerprint.is_empty())
            .ok_or_else(|| SessionError::MalformedEnvironment {
                var: PROMUS_USER_VAR.to_string(),
                value: promus_user.to_string(),
            })?;

        let key = directory
            .key(email, fingerprint)
            .ok_or_else(|| SessionError::IdentityNotFound {
                email: email.to_string(),
                fingerprint: fingerprint.to_string(),
            })?;
        info!("Connected as {email}");

        Ok(Self {
            email: email.to_string(),
            fingerprint: fingerprint.to_string(),
            key: key.clone(),
            command: command.to_string(),
        })
    }

    /// Reject chained commands and interactive shells.
    pub fn check_command(&self) -> Result<(), SessionError> {
        if self.command.contains(CHAINING_CHARS) {
            return Err(SessionError::CommandInjectionSuspected {
                command: self.command.clone(),
            });
        }
        if self.command_name().is_none() {
            return Err(SessionError::InteractiveShellDenied);
        }
        debug!("Command: {:?}", self.command);
        Ok(())
    }

    /// Split the command into words.
    ///
    /// Words are separated by whitespace outside of quotes; single and
    /// double quotes group and are removed.
    pub fn command_tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut in_word = false;
        let mut quote: Option<char> = None;
        for c in self.command.chars() {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), c) => current.push(c),
                (None, '\'' | '"') => {
                    quote = Some(c);
                    in_word = true;
                }
                (None, c) if c.is_whitespace() => {
                    if in_word {
                        tokens.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                (None, c) => {
                    current.push(c);
                    in_word = true;
                }
            }
        }
        if in_word {
            tokens.push(current);
        }
        tokens
    }

    /// The program the guest asked for, if any.
    pub fn command_name(&self) -> Option<String> {
        self.command_tokens().into_iter().next()
    }

    /// The git server program and its repository argument, if the command
    /// is one of the git transports served to guests.
    pub fn git_command(&self) -> Result<(String, Vec<String>), SessionError> {
        let mut tokens = self.command_tokens().into_iter();
        let name = tokens.next().ok_or(SessionError::InteractiveShellDenied)?;
        if !ALLOWED_GIT_COMMANDS.contains(&name.as_str()) {
            return Err(SessionError::CommandNotAllowed { command: name });
        }
        Ok((name, tokens.collect()))
    }

    /// Let the guest into `repo` only if its policy lists them as a user.
    pub fn authorize(
        &self,
        directory: &IdentityDirectory,
        policy: &Policy,
        repo: &str,
    ) -> Result<(), SessionError> {
        if policy.has_access(directory, self, None) {
            debug!("{} may access {repo}", self.email);
            Ok(())
        } else {
            Err(SessionError::AccessDenied {
                email: self.email.clone(),
                repo: repo.to_string(),
            })
        }
    }
}

/// The email a commit is attributed to.
///
/// Inside a guest session the wrapper exported `PROMUS_USER`, and its
/// email is the committer. Outside of one the host owner commits.
pub fn committer(
    env: impl Fn(&str) -> Option<String>,
    master: Option<&str>,
) -> Result<String, SessionError> {
    match env(PROMUS_USER_VAR) {
        Some(value) => value
            .trim()
            .split_once(',')
            .map(|(email, _)| email)
            .filter(|email| !email.is_empty())
            .map(str::to_string)
            .ok_or(SessionError::MalformedEnvironment {
                var: PROMUS_USER_VAR.to_string(),
                value,
            }),
        None => master
            .map(str::to_string)
            .ok_or_else(|| SessionError::MissingEnvironment {
                var: PROMUS_USER_VAR.to_string(),
            }),
    }
}

impl<'a> From<&'a Guest> for PrincipalRef<'a> {
    fn from(guest: &'a Guest) -> Self {
        PrincipalRef::Email(&guest.email)
    }
}
