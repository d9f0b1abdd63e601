//! Access-control lists for Promus repositories
//!
//! An ACL is a plain-text `.acl` file tracked in the repository. It declares
//! admins, users, teams and path rules:
//!
//! ```text
//! admin: daisy
//! user: daisy, user2, user3
//! team: red | user2, user3
//! name: * | !deny, !all
//! name: *.tex | !allow, !team:red
//! path: docs/ | !allow, user3
//! ```
//!
//! Admins may modify anything. Users may modify any path unless a rule says
//! otherwise, and the last rule matching a path decides. Protected paths
//! (the ACL itself by default) are reserved to admins.

pub mod errors;
pub mod parser;
pub mod policy;

pub use errors::AclError;
pub use policy::{Action, Grant, PathPattern, PathRule, PatternKind, Policy, PrincipalRef, Subject};
