//! ACL error types.

use thiserror::Error as ThisError;

use crate::Error;

/// Errors that can occur while reading an ACL.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum AclError {
    /// A directive could not be parsed.
    #[error("ACL error in line {line}: {reason}")]
    Parse {
        /// 1-based line number of the offending directive
        line: usize,
        /// What is wrong with it
        reason: String,
    },

    /// The repository has no ACL file.
    ///
    /// Callers fall back to an admin-only policy so a fresh repository can
    /// still be set up by its owner.
    #[error("ACL not found: {reason}")]
    Missing {
        /// Where we looked and what went wrong
        reason: String,
    },
}

impl AclError {
    pub(crate) fn parse(line: usize, reason: impl Into<String>) -> Self {
        AclError::Parse {
            line,
            reason: reason.into(),
        }
    }

    /// Check if this error is a malformed directive.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, AclError::Parse { .. })
    }

    /// Check if the ACL file does not exist.
    pub fn is_missing(&self) -> bool {
        matches!(self, AclError::Missing { .. })
    }

    /// Line number of a parse error.
    pub fn line(&self) -> Option<usize> {
        match self {
            AclError::Parse { line, .. } => Some(*line),
            _ => None,
        }
    }
}

impl From<AclError> for Error {
    fn from(err: AclError) -> Self {
        Error::Acl(err)
    }
}
