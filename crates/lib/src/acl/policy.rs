//! Parsed ACL policies and access evaluation.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::{
    constants::ACL_FILE,
    identity::{IdentityDirectory, Principal},
};

/// Whether a grant opens or closes access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Allow,
    Deny,
}

impl Action {
    /// `true` for [`Action::Allow`].
    pub fn grants(self) -> bool {
        matches!(self, Action::Allow)
    }
}

/// Who a grant applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// `!all`
    Everyone,
    /// A resolved principal, by canonical email
    Principal(String),
}

impl Subject {
    /// Check if this subject covers `email`.
    pub fn covers(&self, email: &str) -> bool {
        match self {
            Subject::Everyone => true,
            Subject::Principal(principal) => principal == email,
        }
    }
}

/// How a rule pattern is matched against a repository path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// `name:` rules: shell glob over the whole path, `*` crosses `/`
    Name,
    /// `path:` rules: directory prefix
    Path,
}

/// One pattern of a path rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    kind: PatternKind,
    source: String,
    glob: Option<glob::Pattern>,
}

impl PathPattern {
    /// Compile a glob pattern.
    pub fn glob(source: &str) -> Result<Self, glob::PatternError> {
        Ok(Self {
            kind: PatternKind::Name,
            source: source.to_string(),
            glob: Some(glob::Pattern::new(source)?),
        })
    }

    /// A directory prefix pattern.
    pub fn prefix(source: &str) -> Self {
        Self {
            kind: PatternKind::Path,
            source: source.to_string(),
            glob: None,
        }
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// Check if `path` matches.
    ///
    /// A prefix matches the path itself and everything below it: `docs`
    /// matches `docs` and `docs/a.md` but not `docs2/a.md`.
    pub fn matches(&self, path: &str) -> bool {
        match (&self.kind, &self.glob) {
            (PatternKind::Name, Some(glob)) => glob.matches(path),
            (PatternKind::Name, None) => self.source == path,
            (PatternKind::Path, _) => {
                let prefix = self.source.trim_end_matches('/');
                if prefix.is_empty() {
                    return true;
                }
                path == prefix
                    || path
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

/// Check a free-standing glob (e.g. a protected pattern) against a path.
/// An invalid glob only matches itself literally.
pub(crate) fn glob_matches(pattern: &str, path: &str) -> bool {
    match glob::Pattern::new(pattern) {
        Ok(glob) => glob.matches(path),
        Err(_) => pattern == path,
    }
}

/// One expanded `(pattern, subject, action)` tuple of a path rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub pattern: PathPattern,
    pub subject: Subject,
    pub action: Action,
}

/// A `name:` or `path:` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRule {
    /// 1-based line of the directive
    pub line: usize,
    /// Patterns as declared
    pub patterns: Vec<PathPattern>,
    /// Action in effect when the first subject was listed
    pub default_action: Action,
    /// Expanded grants in declaration order
    pub grants: Vec<Grant>,
}

impl PathRule {
    /// Decision of this rule for `email` on `path`, if any grant matches.
    /// Within a rule the last matching grant wins, as across rules.
    pub fn decision_for(&self, email: &str, path: &str) -> Option<bool> {
        self.grants
            .iter()
            .rev()
            .find(|grant| grant.subject.covers(email) && grant.pattern.matches(path))
            .map(|grant| grant.action.grants())
    }
}

/// Reference to the principal being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalRef<'a> {
    /// Loose reference resolved through the identity directory
    Token(&'a str),
    /// Already-canonical email
    Email(&'a str),
}

impl<'a> From<&'a str> for PrincipalRef<'a> {
    fn from(token: &'a str) -> Self {
        PrincipalRef::Token(token)
    }
}

impl<'a> From<&'a String> for PrincipalRef<'a> {
    fn from(token: &'a String) -> Self {
        PrincipalRef::Token(token)
    }
}

impl<'a> From<Principal<'a>> for PrincipalRef<'a> {
    fn from(principal: Principal<'a>) -> Self {
        PrincipalRef::Email(principal.email())
    }
}

/// A parsed ACL.
///
/// `admins ⊆ users` holds for every policy built through [`Policy::parse`]
/// or [`Policy::admin_only`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    pub(super) admins: BTreeSet<String>,
    pub(super) users: BTreeSet<String>,
    pub(super) teams: BTreeMap<String, Vec<String>>,
    pub(super) rules: Vec<PathRule>,
}

impl Policy {
    /// Policy used when a repository has no ACL: the host owner is the
    /// only admin and the only user.
    pub fn admin_only(master: &str) -> Self {
        let mut policy = Self::default();
        if !master.is_empty() {
            policy.admins.insert(master.to_string());
            policy.users.insert(master.to_string());
        }
        policy
    }

    /// Admin emails.
    pub fn admins(&self) -> &BTreeSet<String> {
        &self.admins
    }

    /// User emails (always including every admin).
    pub fn users(&self) -> &BTreeSet<String> {
        &self.users
    }

    /// Declared teams and their member emails.
    pub fn teams(&self) -> &BTreeMap<String, Vec<String>> {
        &self.teams
    }

    /// Members of one team.
    pub fn team(&self, name: &str) -> Option<&[String]> {
        self.teams.get(name).map(Vec::as_slice)
    }

    /// Path rules in declaration order.
    pub fn rules(&self) -> &[PathRule] {
        &self.rules
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.admins.contains(email)
    }

    pub fn is_user(&self, email: &str) -> bool {
        self.users.contains(email)
    }

    /// Resolve `actor` to a canonical email.
    ///
    /// Loose references go through the identity directory first and then
    /// fall back to an exact (case-insensitive) match against the policy's
    /// own user set, which covers the host owner who need not be registered.
    pub fn resolve_actor<'a>(
        &'a self,
        directory: &'a IdentityDirectory,
        actor: PrincipalRef<'a>,
    ) -> Option<&'a str> {
        match actor {
            PrincipalRef::Email(email) => Some(email),
            PrincipalRef::Token(token) => directory.resolve_principal(token).or_else(|| {
                let token = token.trim();
                self.users
                    .iter()
                    .find(|user| user.eq_ignore_ascii_case(token))
                    .map(String::as_str)
            }),
        }
    }

    /// Decide whether `actor` may access the repository (`path == None`) or
    /// modify `path`.
    ///
    /// 1. An unresolvable actor is denied.
    /// 2. Admins are always allowed.
    /// 3. Without a path, access is membership of the user set.
    /// 4. Non-users are denied any path.
    /// 5. Paths matching a protected pattern are denied.
    /// 6. Otherwise the last matching path rule decides; no match allows.
    pub fn evaluate<'a>(
        &self,
        directory: &IdentityDirectory,
        actor: impl Into<PrincipalRef<'a>>,
        path: Option<&str>,
        protected: &[&str],
    ) -> bool {
        let actor = actor.into();
        let Some(email) = self.resolve_actor(directory, actor) else {
            debug!("Denying unresolvable principal {actor:?}");
            return false;
        };
        if self.is_admin(email) {
            return true;
        }
        let base = self.is_user(email);
        let Some(path) = path else {
            return base;
        };
        if !base {
            return false;
        }
        if protected.iter().any(|pattern| glob_matches(pattern, path)) {
            debug!("{email} denied protected path {path}");
            return false;
        }

        let mut access = true;
        for rule in &self.rules {
            if let Some(decision) = rule.decision_for(email, path) {
                access = decision;
            }
        }
        access
    }

    /// [`Policy::evaluate`] with the ACL file as the only protected path.
    pub fn has_access<'a>(
        &self,
        directory: &IdentityDirectory,
        actor: impl Into<PrincipalRef<'a>>,
        path: Option<&str>,
    ) -> bool {
        self.evaluate(directory, actor, path, &[ACL_FILE])
    }
}
