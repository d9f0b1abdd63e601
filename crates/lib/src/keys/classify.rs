//! Line classification for the authorized_keys store.
//!
//! Every line is matched against an ordered table of `(pattern, handler)`
//! rules; the first rule that matches decides. Lines no rule claims are
//! foreign unless they are blank or comments.

use regex::{Captures, Regex};
use tracing::trace;

use super::errors::KeysError;
use crate::{Config, identity::Key};

/// A pending invitation recorded in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingInvitation {
    /// Email the invitation was issued to
    pub email: String,
    pub key_type: String,
    /// Public half of the invitation key pair
    pub key: String,
    pub key_desc: String,
}

/// What a single authorized_keys line is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Canonical registered wrapper, `PROMUS_USER='email,fingerprint'`
    Registered {
        email: String,
        fingerprint: String,
        key: Key,
    },
    /// Old-style registered wrapper carrying the identity inline. Rewritten
    /// in canonical form on the next write.
    Legacy { email: String, key: Key },
    /// Invitation wrapper
    Pending(PendingInvitation),
    /// Blank line or comment
    Ignored,
    /// Anything else, kept verbatim
    Foreign(String),
}

/// Program prefix written into wrappers by early releases; still
/// recognised so those entries migrate instead of turning foreign.
pub const LEGACY_PROGRAM: &str = "python -m promus";

#[derive(Debug, Clone)]
struct Rule {
    name: &'static str,
    pattern: Regex,
    handler: fn(&Captures<'_>) -> Line,
}

impl Rule {
    fn new(
        name: &'static str,
        prefix: &str,
        handler: fn(&Captures<'_>) -> Line,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            pattern: Regex::new(&format!("^{prefix} {KEY_TAIL}"))?,
            handler,
        })
    }
}

const KEY_TAIL: &str = r#"(?P<type>\S+) (?P<key>\S+)(?: (?P<desc>.*))?$"#;

fn group(caps: &Captures<'_>, name: &str) -> String {
    caps.name(name)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn key_from(caps: &Captures<'_>) -> Key {
    Key::new(group(caps, "type"), group(caps, "key"), group(caps, "desc"))
}

fn registered(caps: &Captures<'_>) -> Line {
    Line::Registered {
        email: group(caps, "email"),
        fingerprint: group(caps, "fp"),
        key: key_from(caps),
    }
}

fn legacy(caps: &Captures<'_>) -> Line {
    Line::Legacy {
        email: group(caps, "email"),
        key: Key {
            user: group(caps, "user"),
            name: group(caps, "name"),
            alias: group(caps, "alias"),
            ..key_from(caps)
        },
    }
}

fn pending(caps: &Captures<'_>) -> Line {
    Line::Pending(PendingInvitation {
        email: group(caps, "email"),
        key_type: group(caps, "type"),
        key: group(caps, "key"),
        key_desc: group(caps, "desc"),
    })
}

/// `(?:<configured>|<legacy program> <words>)`, both matched literally.
fn program(configured: &str, words: &str) -> String {
    format!(
        "(?:{}|{} {})",
        regex::escape(configured),
        regex::escape(LEGACY_PROGRAM),
        regex::escape(words)
    )
}

/// The ordered wrapper rules for one host.
///
/// A wrapper is only claimed when its `command="..."` starts with exactly
/// the configured program (or the legacy one); any other forced command is
/// foreign, however similar it looks.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    pub fn new(greet_command: &str, add_user_command: &str) -> Result<Self, regex::Error> {
        let greet = program(greet_command, "greet");
        let add_user = program(add_user_command, "add user");
        let rules = vec![
            Rule::new(
                "registered",
                &format!(
                    r#"command="export PROMUS_USER='(?P<email>[^,']*),(?P<fp>[^']*)'; {greet}""#
                ),
                registered,
            )?,
            Rule::new(
                "legacy",
                &format!(
                    r#"command="{greet} '(?P<email>[^,']*),(?P<user>[^,']*),(?P<name>[^,']*),(?P<alias>[^']*)'""#
                ),
                legacy,
            )?,
            Rule::new(
                "pending",
                &format!(r#"command="{add_user} (?P<email>[^"\s]+)""#),
                pending,
            )?,
        ];
        Ok(Self { rules })
    }

    /// Classifier for the wrapper programs of `config`.
    pub fn for_config(config: &Config) -> Result<Self, KeysError> {
        Self::new(&config.greet_command, &config.add_user_command).map_err(|source| {
            KeysError::InvalidWrapper {
                command: format!("{} / {}", config.greet_command, config.add_user_command),
                source,
            }
        })
    }

    /// Classify one line (without its `\n` terminator).
    ///
    /// Foreign lines keep every byte, including a trailing `\r`.
    pub fn classify(&self, line: &str) -> Line {
        let trimmed = line.trim();
        for rule in &self.rules {
            if let Some(caps) = rule.pattern.captures(trimmed) {
                trace!("Line classified as {}", rule.name);
                return (rule.handler)(&caps);
            }
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            Line::Ignored
        } else {
            Line::Foreign(line.to_string())
        }
    }
}

/// Join the three parts of an OpenSSH key, omitting an empty comment.
pub(crate) fn key_line(key_type: &str, key: &str, key_desc: &str) -> String {
    if key_desc.is_empty() {
        format!("{key_type} {key}")
    } else {
        format!("{key_type} {key} {key_desc}")
    }
}

/// Render a canonical registered wrapper.
pub fn registered_line(greet_command: &str, email: &str, fingerprint: &str, key: &Key) -> String {
    format!(
        "command=\"export PROMUS_USER='{email},{fingerprint}'; {greet_command}\" {}",
        key_line(&key.key_type, &key.key, &key.key_desc)
    )
}

/// Render an invitation wrapper.
pub fn pending_line(add_user_command: &str, invitation: &PendingInvitation) -> String {
    format!(
        "command=\"{add_user_command} {}\" {}",
        invitation.email,
        key_line(&invitation.key_type, &invitation.key, &invitation.key_desc)
    )
}
