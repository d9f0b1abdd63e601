//! ACL text parser.
//!
//! One directive per line, `keyword: value`. Blank lines and lines starting
//! with `#` are ignored.
//!
//! | keyword | value                                  |
//! |---------|----------------------------------------|
//! | `admin` | `p1, p2`                               |
//! | `user`  | `p1, p2`                               |
//! | `team`  | `name \| p1, p2`                       |
//! | `name`  | `glob1, glob2 \| [!allow\|!deny] tokens` |
//! | `path`  | `dir1, dir2 \| [!allow\|!deny] tokens`   |
//!
//! Rule tokens are principal references, `!all`, `!team:<name>`, and the
//! `!allow`/`!deny` markers switching the action for the tokens after them.
//! Every rule line starts in `!allow` mode.

use tracing::{debug, warn};

use super::{
    errors::AclError,
    policy::{Action, Grant, PathPattern, PathRule, PatternKind, Policy, Subject},
};
use crate::identity::IdentityDirectory;

const TEAM_PREFIX: &str = "!team:";

impl Policy {
    /// Parse ACL text.
    ///
    /// Principal references are resolved through `directory`; `master` (the
    /// host owner) is always added as an admin. Unresolvable names in
    /// `admin:`, `user:` and `team:` directives and in rule tokens are
    /// skipped. Every admin is also a user.
    pub fn parse(
        text: &str,
        directory: &IdentityDirectory,
        master: Option<&str>,
    ) -> Result<Self, AclError> {
        let mut policy = Parser::new(directory, master).parse(text)?;
        if let Some(master) = master.filter(|m| !m.is_empty()) {
            policy.admins.insert(master.to_string());
        }
        let admins = policy.admins.clone();
        policy.users.extend(admins);
        Ok(policy)
    }
}

struct Parser<'a> {
    directory: &'a IdentityDirectory,
    master: Option<&'a str>,
    policy: Policy,
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

impl<'a> Parser<'a> {
    fn new(directory: &'a IdentityDirectory, master: Option<&'a str>) -> Self {
        Self {
            directory,
            master,
            policy: Policy::default(),
        }
    }

    fn parse(mut self, text: &str) -> Result<Policy, AclError> {
        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let directive = raw.trim();
            if directive.is_empty() || directive.starts_with('#') {
                continue;
            }
            let (keyword, value) = directive
                .split_once(':')
                .ok_or_else(|| AclError::parse(line, "missing ':' after keyword"))?;

            match keyword.trim().to_lowercase().as_str() {
                "admin" => self.members(value, true),
                "user" => self.members(value, false),
                "team" => self.team(line, value)?,
                "name" => self.rule(line, value, PatternKind::Name)?,
                "path" => self.rule(line, value, PatternKind::Path)?,
                other => {
                    return Err(AclError::parse(line, format!("unknown keyword '{other}'")));
                }
            }
        }
        Ok(self.policy)
    }

    fn resolve(&self, token: &str) -> Option<String> {
        if let Some(email) = self.directory.resolve_principal(token) {
            return Some(email.to_string());
        }
        let token = token.trim();
        self.master
            .filter(|master| !master.is_empty() && master.eq_ignore_ascii_case(token))
            .map(str::to_string)
    }

    fn members(&mut self, value: &str, admin: bool) {
        for token in split_list(value) {
            let Some(email) = self.resolve(token) else {
                warn!("Skipping unknown principal '{token}' in ACL");
                continue;
            };
            if admin {
                self.policy.admins.insert(email.clone());
            }
            self.policy.users.insert(email);
        }
    }

    fn team(&mut self, line: usize, value: &str) -> Result<(), AclError> {
        let (name, members) = value
            .split_once('|')
            .ok_or_else(|| AclError::parse(line, "'|' not found in team declaration"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AclError::parse(line, "missing team name"));
        }

        let resolved: Vec<String> = split_list(members)
            .filter_map(|token| {
                let email = self.resolve(token);
                if email.is_none() {
                    warn!("Skipping unknown principal '{token}' in team '{name}'");
                }
                email
            })
            .collect();

        let team = self.policy.teams.entry(name.to_string()).or_default();
        for email in resolved {
            if !team.contains(&email) {
                team.push(email);
            }
        }
        Ok(())
    }

    fn rule(&mut self, line: usize, value: &str, kind: PatternKind) -> Result<(), AclError> {
        let (patterns, tokens) = value
            .split_once('|')
            .ok_or_else(|| AclError::parse(line, "'|' not found in rule"))?;

        let patterns = split_list(patterns)
            .map(|source| match kind {
                PatternKind::Name => PathPattern::glob(source).map_err(|e| {
                    AclError::parse(line, format!("invalid pattern '{source}': {e}"))
                }),
                PatternKind::Path => Ok(PathPattern::prefix(source)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if patterns.is_empty() {
            return Err(AclError::parse(line, "rule has no patterns"));
        }

        let mut action = Action::Allow;
        let mut default_action = None;
        let mut grants = Vec::new();
        for token in split_list(tokens) {
            let lowered = token.to_lowercase();
            let subjects = match lowered.as_str() {
                "!allow" => {
                    action = Action::Allow;
                    continue;
                }
                "!deny" => {
                    action = Action::Deny;
                    continue;
                }
                "!all" => vec![Subject::Everyone],
                _ if lowered.starts_with(TEAM_PREFIX) => {
                    let team = token.get(TEAM_PREFIX.len()..).unwrap_or_default().trim();
                    let members = self.policy.teams.get(team).ok_or_else(|| {
                        AclError::parse(line, format!("team '{team}' is not declared"))
                    })?;
                    members.iter().cloned().map(Subject::Principal).collect()
                }
                _ if lowered.starts_with('!') => {
                    return Err(AclError::parse(line, format!("unknown keyword '{token}'")));
                }
                _ => match self.resolve(token) {
                    Some(email) => vec![Subject::Principal(email)],
                    None => {
                        warn!("Skipping unknown principal '{token}' in rule on line {line}");
                        continue;
                    }
                },
            };

            default_action.get_or_insert(action);
            for subject in subjects {
                for pattern in &patterns {
                    grants.push(Grant {
                        pattern: pattern.clone(),
                        subject: subject.clone(),
                        action,
                    });
                }
            }
        }

        debug!("Line {line}: rule with {} grants", grants.len());
        self.policy.rules.push(PathRule {
            line,
            patterns,
            default_action: default_action.unwrap_or(Action::Allow),
            grants,
        });
        Ok(())
    }
}
