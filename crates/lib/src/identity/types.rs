//! Principal and key types
//!
//! A principal is identified by email. Each principal owns one or more keys,
//! indexed by their short fingerprint. The descriptive attributes (username,
//! display name, alias, host) are recorded per key because each key is
//! registered from a particular machine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::FINGERPRINT_LEN;

/// Return the short fingerprint of a public key blob: its last
/// `FINGERPRINT_LEN` characters.
///
/// This is a lookup key, not a cryptographic digest. It is only unique
/// within the key set of a single email.
///
/// ```
/// use promus::identity::short_fingerprint;
///
/// assert_eq!(short_fingerprint("AAAAB3NzaC1yc2EAAAADAQABAAABAQC0123456789"), "0123456789");
/// assert_eq!(short_fingerprint("short"), "short");
/// ```
pub fn short_fingerprint(key: &str) -> &str {
    let count = key.chars().count();
    if count <= FINGERPRINT_LEN {
        return key;
    }
    let start = key
        .char_indices()
        .nth(count - FINGERPRINT_LEN)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &key[start..]
}

/// A registered public key and the identity attributes it was registered
/// with.
///
/// Field names match the on-disk identity directory format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    /// Login name on the guest's machine
    #[serde(default)]
    pub user: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Alias of the guest's machine
    #[serde(default)]
    pub alias: String,
    /// Host name of the guest's machine
    #[serde(default)]
    pub host: String,
    /// Key algorithm, e.g. `ssh-rsa`
    #[serde(default)]
    pub key_type: String,
    /// Trailing comment of the key line
    #[serde(default)]
    pub key_desc: String,
    /// Base64 key blob
    #[serde(default)]
    pub key: String,
}

impl Key {
    /// Create a key record from the three parts of an OpenSSH public key line.
    pub fn new(
        key_type: impl Into<String>,
        key: impl Into<String>,
        key_desc: impl Into<String>,
    ) -> Self {
        Self {
            key_type: key_type.into(),
            key: key.into(),
            key_desc: key_desc.into(),
            ..Default::default()
        }
    }

    /// Short fingerprint of this key.
    pub fn fingerprint(&self) -> &str {
        short_fingerprint(&self.key)
    }
}

/// Read-only view of one principal in the directory.
#[derive(Debug, Clone, Copy)]
pub struct Principal<'a> {
    email: &'a str,
    keys: &'a BTreeMap<String, Key>,
}

impl<'a> Principal<'a> {
    pub(crate) fn new(email: &'a str, keys: &'a BTreeMap<String, Key>) -> Self {
        Self { email, keys }
    }

    /// Canonical email.
    pub fn email(&self) -> &'a str {
        self.email
    }

    /// Keys indexed by short fingerprint, in fingerprint order.
    pub fn keys(&self) -> &'a BTreeMap<String, Key> {
        self.keys
    }

    /// Username, taken from the first key that records one.
    pub fn username(&self) -> Option<&'a str> {
        self.first_attribute(|key| &key.user)
    }

    /// Display name, taken from the first key that records one.
    pub fn display_name(&self) -> Option<&'a str> {
        self.first_attribute(|key| &key.name)
    }

    /// Machine alias, taken from the first key that records one.
    pub fn alias(&self) -> Option<&'a str> {
        self.first_attribute(|key| &key.alias)
    }

    fn first_attribute(&self, field: impl Fn(&'a Key) -> &'a String) -> Option<&'a str> {
        self.keys
            .values()
            .map(field)
            .find(|value| !value.is_empty())
            .map(String::as_str)
    }
}
