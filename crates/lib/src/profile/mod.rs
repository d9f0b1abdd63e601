//! Per-user profiles
//!
//! Each user may keep a `.{email}.profile` file at the repository root:
//!
//! ```text
//! email: user@domain.com
//! notify: track
//! track-files: *.tex, docs/*
//! track-files: Makefile
//! ```
//!
//! `track-files` may repeat and only matters when `notify` is `track`.

pub mod errors;

pub use errors::ProfileError;

use crate::{
    acl::policy::glob_matches,
    constants::{PROFILE_PREFIX, PROFILE_SUFFIX},
};

/// When a user wants to hear about pushes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Notify {
    /// Every change
    All,
    /// Never
    #[default]
    False,
    /// Changes touching a tracked file
    Track,
}

impl std::str::FromStr for Notify {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "all" => Ok(Notify::All),
            "false" => Ok(Notify::False),
            "track" => Ok(Notify::Track),
            _ => Err("notify options allowed: all/false/track".to_string()),
        }
    }
}

/// A parsed profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub email: String,
    pub notify: Notify,
    pub track_files: Vec<String>,
}

impl Profile {
    /// Profile applied to a user without a profile file.
    pub fn default_for(email: &str) -> Self {
        Self {
            email: email.to_string(),
            ..Default::default()
        }
    }

    /// Parse profile text. Blank lines and `#` comments are ignored.
    pub fn parse(text: &str) -> Result<Self, ProfileError> {
        let mut profile = Profile::default();
        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let entry = raw.trim();
            if entry.is_empty() || entry.starts_with('#') {
                continue;
            }
            let (keyword, value) = entry
                .split_once(':')
                .ok_or_else(|| ProfileError::parse(line, "missing ':' after keyword"))?;

            match keyword.trim().to_lowercase().as_str() {
                "email" => profile.email = value.trim().to_string(),
                "notify" => {
                    profile.notify = value
                        .parse()
                        .map_err(|reason: String| ProfileError::parse(line, reason))?;
                }
                "track-files" => {
                    for pattern in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                        glob::Pattern::new(pattern).map_err(|e| {
                            ProfileError::parse(line, format!("invalid pattern '{pattern}': {e}"))
                        })?;
                        profile.track_files.push(pattern.to_string());
                    }
                }
                other => {
                    return Err(ProfileError::parse(
                        line,
                        format!("unknown keyword '{other}'"),
                    ));
                }
            }
        }
        Ok(profile)
    }

    /// Whether a change touching `modified` should be reported to this user.
    pub fn wants_notification<S: AsRef<str>>(&self, modified: &[S]) -> bool {
        match self.notify {
            Notify::All => true,
            Notify::False => false,
            Notify::Track => modified.iter().any(|path| {
                self.track_files
                    .iter()
                    .any(|pattern| glob_matches(pattern, path.as_ref()))
            }),
        }
    }
}

/// Repository path of the profile belonging to `email`.
pub fn profile_path_for(email: &str) -> String {
    format!("{PROFILE_PREFIX}{email}{PROFILE_SUFFIX}")
}

/// If `path` is a profile file, the email it belongs to.
///
/// Profiles live at the repository root, so paths with a directory part are
/// never profiles.
pub fn profile_owner(path: &str) -> Option<&str> {
    if path.contains('/') {
        return None;
    }
    path.strip_prefix(PROFILE_PREFIX)?
        .strip_suffix(PROFILE_SUFFIX)
        .filter(|owner| !owner.is_empty())
}
