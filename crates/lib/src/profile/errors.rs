//! Profile error types.

use thiserror::Error as ThisError;

use crate::Error;

/// Errors that can occur while reading a user profile.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ProfileError {
    /// A profile line could not be parsed.
    #[error("profile error in line {line}: {reason}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What is wrong with it
        reason: String,
    },

    /// The user has no profile. Defaults apply.
    #[error("profile not found: {reason}")]
    Missing {
        /// Where we looked
        reason: String,
    },
}

impl ProfileError {
    pub(crate) fn parse(line: usize, reason: impl Into<String>) -> Self {
        ProfileError::Parse {
            line,
            reason: reason.into(),
        }
    }

    /// Check if this error is a malformed profile.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, ProfileError::Parse { .. })
    }

    /// Check if the profile does not exist.
    pub fn is_missing(&self) -> bool {
        matches!(self, ProfileError::Missing { .. })
    }
}

impl From<ProfileError> for Error {
    fn from(err: ProfileError) -> Self {
        Error::Profile(err)
    }
}
