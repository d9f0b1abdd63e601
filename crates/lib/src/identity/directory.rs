//! The in-memory identity directory and its JSON persistence.
//!
//! The on-disk format is a mapping `email -> fingerprint -> Key`, written
//! 4-space indented with keys sorted. Both levels are `BTreeMap`s, so
//! iteration (and therefore resolution order and file output) is sorted by
//! email and then by fingerprint.

use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    errors::IdentityError,
    types::{Key, Principal},
};
use crate::atomic::write_atomic;

/// Registry of principals and their keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityDirectory {
    principals: BTreeMap<String, BTreeMap<String, Key>>,
}

impl IdentityDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from the file at `path`.
    ///
    /// A missing, unreadable or corrupt file yields an empty directory.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json).unwrap_or_else(|e| {
                warn!(
                    "Identity directory {} is corrupt ({e}); starting empty",
                    path.display()
                );
                Self::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No identity directory at {}", path.display());
                Self::new()
            }
            Err(e) => {
                warn!(
                    "Unable to read identity directory {}: {e}; starting empty",
                    path.display()
                );
                Self::new()
            }
        }
    }

    /// Replace the contents of this directory with the file at `path`.
    ///
    /// Loading the same file twice leaves the directory unchanged.
    pub fn load(&mut self, path: impl AsRef<Path>) {
        *self = Self::from_file(path);
    }

    /// Parse a directory from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Encode the directory as 4-space indented JSON with sorted keys.
    pub fn to_json(&self) -> Result<String, IdentityError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)
            .map_err(|source| IdentityError::Encode { source })?;
        buf.push(b'\n');
        // serde_json only ever emits UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Atomically write the directory to `path`, readable by the owner only.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), IdentityError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        write_atomic(path, json.as_bytes(), 0o600).map_err(|source| IdentityError::Persist {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Register `key` under `email`, indexed by its short fingerprint.
    ///
    /// Returns the record previously stored under the same fingerprint. A
    /// fingerprint collision with different key material is resolved
    /// last-write-wins.
    pub fn insert(&mut self, email: impl Into<String>, key: Key) -> Option<Key> {
        let email = email.into();
        let fingerprint = key.fingerprint().to_string();
        self.insert_with_fingerprint(email, fingerprint, key)
    }

    /// Register `key` under an explicit fingerprint.
    ///
    /// Used when the fingerprint comes from an existing authorized_keys
    /// wrapper rather than from the key itself.
    pub fn insert_with_fingerprint(
        &mut self,
        email: impl Into<String>,
        fingerprint: impl Into<String>,
        key: Key,
    ) -> Option<Key> {
        let email = email.into();
        let fingerprint = fingerprint.into();
        let previous = self
            .principals
            .entry(email.clone())
            .or_default()
            .insert(fingerprint.clone(), key);
        if let Some(prev) = &previous {
            let current = &self.principals[&email][&fingerprint];
            if prev.key != current.key {
                warn!(
                    "Fingerprint {fingerprint} of {email} now refers to a different key; keeping the latest"
                );
            }
        }
        previous
    }

    /// Look up a principal by canonical email.
    pub fn principal(&self, email: &str) -> Option<Principal<'_>> {
        self.principals
            .get_key_value(email)
            .map(|(email, keys)| Principal::new(email, keys))
    }

    /// Look up one key of a principal.
    pub fn key(&self, email: &str, fingerprint: &str) -> Option<&Key> {
        self.principals.get(email)?.get(fingerprint)
    }

    /// Every key registered for `email`, in fingerprint order.
    pub fn all_keys(&self, email: &str) -> Vec<&Key> {
        self.principals
            .get(email)
            .map(|keys| keys.values().collect())
            .unwrap_or_default()
    }

    /// Check whether a principal with this exact email exists.
    pub fn contains(&self, email: &str) -> bool {
        self.principals.contains_key(email)
    }

    /// Iterate over all principals in email order.
    pub fn principals(&self) -> impl Iterator<Item = Principal<'_>> {
        self.principals
            .iter()
            .map(|(email, keys)| Principal::new(email, keys))
    }

    /// Iterate over `(email, fingerprint, key)` in email then fingerprint order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &Key)> {
        self.principals.iter().flat_map(|(email, keys)| {
            keys.iter()
                .map(move |(fingerprint, key)| (email.as_str(), fingerprint.as_str(), key))
        })
    }

    /// Number of principals.
    pub fn len(&self) -> usize {
        self.principals.len()
    }

    /// Check if the directory holds no principals.
    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    /// Resolve a loose reference to a canonical email.
    ///
    /// Matching is case-insensitive and tried in priority order:
    /// 1. exact email
    /// 2. username of any registered key
    /// 3. substring of the display name of any registered key
    ///
    /// The first tier with a match decides. If that tier matches more than
    /// one principal the reference is ambiguous and resolves to nothing.
    pub fn resolve_principal(&self, token: &str) -> Option<&str> {
        let needle = token.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        if let Some(email) = self
            .principals
            .keys()
            .find(|email| email.to_lowercase() == needle)
        {
            return Some(email);
        }

        let by_username = self.matching(|key| key.user.to_lowercase() == needle);
        if !by_username.is_empty() {
            return self.single(token, "username", by_username);
        }

        let by_name =
            self.matching(|key| !key.name.is_empty() && key.name.to_lowercase().contains(&needle));
        if !by_name.is_empty() {
            return self.single(token, "name", by_name);
        }

        debug!("Principal reference '{token}' did not resolve");
        None
    }

    fn matching(&self, predicate: impl Fn(&Key) -> bool) -> Vec<&str> {
        self.principals
            .iter()
            .filter(|(_, keys)| keys.values().any(&predicate))
            .map(|(email, _)| email.as_str())
            .collect()
    }

    fn single<'a>(&self, token: &str, tier: &str, matches: Vec<&'a str>) -> Option<&'a str> {
        match matches.as_slice() {
            [email] => Some(*email),
            _ => {
                warn!(
                    "Principal reference '{token}' is ambiguous by {tier}: {}",
                    matches.join(", ")
                );
                None
            }
        }
    }
}
