//! Reading and rewriting the authorized_keys store.

use std::{collections::BTreeMap, fs, io::ErrorKind, path::Path};

use tracing::{debug, info, warn};

use super::{
    classify::{Classifier, Line, PendingInvitation, pending_line, registered_line},
    errors::KeysError,
};
use crate::{
    Config,
    atomic::write_atomic,
    constants::{FOREIGN_HEADER, KEYS_HEADER, PENDING_HEADER},
    identity::{IdentityDirectory, Key, short_fingerprint},
};

/// Read-modify-write cycles [`KeyStore::update`] attempts before giving up.
pub const MAX_ATTEMPTS: usize = 3;

const DATE_FORMAT: &str = "%a %b %d, %Y %r";

/// In-memory view of the store, split into its three partitions.
#[derive(Debug, Clone, Default)]
pub struct KeyState {
    /// Registered principals, merged from the identity directory file and
    /// the registered wrappers in the store
    pub registered: IdentityDirectory,
    /// Pending invitations by short fingerprint of the invitation key
    pub pending: BTreeMap<String, PendingInvitation>,
    /// Unmanaged lines in their original order
    pub foreign: Vec<String>,
    dirty: bool,
    snapshot: Option<Vec<u8>>,
}

impl KeyState {
    /// Build a state from the store text and an identity directory.
    ///
    /// Lines are split on `\n` only, so foreign lines keep a trailing `\r`.
    pub fn from_text(text: &str, registered: IdentityDirectory, classifier: &Classifier) -> Self {
        let mut state = Self {
            registered,
            ..Default::default()
        };
        for raw in text.split('\n') {
            state.absorb(classifier.classify(raw));
        }
        state
    }

    fn absorb(&mut self, line: Line) {
        match line {
            Line::Registered {
                email,
                fingerprint,
                key,
            } => {
                if self.registered.key(&email, &fingerprint).is_none() {
                    debug!("Recovering {email} ({fingerprint}) from authorized_keys");
                    self.registered
                        .insert_with_fingerprint(email, fingerprint, key);
                    self.dirty = true;
                }
            }
            Line::Legacy { email, key } => {
                debug!("Migrating legacy wrapper of {email}");
                let host = self
                    .registered
                    .key(&email, key.fingerprint())
                    .map(|existing| existing.host.clone())
                    .unwrap_or_default();
                self.registered.insert(email, Key { host, ..key });
                self.dirty = true;
            }
            Line::Pending(invitation) => {
                let fingerprint = short_fingerprint(&invitation.key).to_string();
                self.pending.insert(fingerprint, invitation);
            }
            Line::Ignored => {}
            Line::Foreign(line) => self.foreign.push(line),
        }
    }

    /// Whether reading changed the state relative to what is on disk, e.g.
    /// a legacy wrapper that still needs its canonical rewrite.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Pending invitations sorted by invited email.
    pub fn pending_by_email(&self) -> Vec<(&str, &PendingInvitation)> {
        let mut entries: Vec<_> = self
            .pending
            .iter()
            .map(|(fingerprint, invitation)| (fingerprint.as_str(), invitation))
            .collect();
        entries.sort_by(|a, b| a.1.email.cmp(&b.1.email).then(a.0.cmp(b.0)));
        entries
    }
}

/// The authorized_keys reconciler.
///
/// Owns nothing but the paths from [`Config`]; every call reads the files
/// fresh, so a `KeyStore` can be kept for the life of the process.
#[derive(Debug, Clone, Copy)]
pub struct KeyStore<'a> {
    config: &'a Config,
}

impl<'a> KeyStore<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    fn path(&self) -> &Path {
        &self.config.authorized_keys
    }

    /// Read the store and the identity directory into a [`KeyState`].
    ///
    /// A missing store is an empty one.
    pub fn read(&self) -> Result<KeyState, KeysError> {
        let classifier = Classifier::for_config(self.config)?;
        let registered = IdentityDirectory::from_file(&self.config.users_file);
        let snapshot = self.current_bytes()?;
        let mut state = {
            let text = snapshot
                .as_deref()
                .map(String::from_utf8_lossy)
                .unwrap_or_default();
            KeyState::from_text(&text, registered, &classifier)
        };
        state.snapshot = snapshot;
        debug!(
            "Read {} principals, {} pending, {} foreign from {}",
            state.registered.len(),
            state.pending.len(),
            state.foreign.len(),
            self.path().display()
        );
        Ok(state)
    }

    fn current_bytes(&self) -> Result<Option<Vec<u8>>, KeysError> {
        match fs::read(self.path()) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(KeysError::Read {
                path: self.path().to_path_buf(),
                source,
            }),
        }
    }

    /// Render the store text. Registered entries come sorted by email and
    /// fingerprint, pending ones by invited email, foreign lines last in
    /// their original order.
    pub fn render(&self, state: &KeyState, generated: &str) -> String {
        let mut out = format!("{KEYS_HEADER} {generated}\n");
        for (email, fingerprint, key) in state.registered.entries() {
            out.push_str(&registered_line(
                &self.config.greet_command,
                email,
                fingerprint,
                key,
            ));
            out.push('\n');
        }
        if !state.pending.is_empty() {
            out.push_str(PENDING_HEADER);
            out.push('\n');
            for (_, invitation) in state.pending_by_email() {
                out.push_str(&pending_line(&self.config.add_user_command, invitation));
                out.push('\n');
            }
        }
        if !state.foreign.is_empty() {
            out.push_str(FOREIGN_HEADER);
            out.push('\n');
            for line in &state.foreign {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }

    /// Write `state` back to disk.
    ///
    /// The first write ever backs up the existing store. The store is
    /// replaced atomically with owner-only permissions, but only if it
    /// still holds the bytes `state` was read from; otherwise
    /// [`KeysError::ConcurrentModification`] is returned and nothing is
    /// written. The identity directory file is saved afterwards.
    pub fn write(&self, state: &mut KeyState) -> Result<(), KeysError> {
        self.backup_once()?;

        let generated = chrono::Local::now().format(DATE_FORMAT).to_string();
        let text = self.render(state, &generated);

        if self.current_bytes()? != state.snapshot {
            return Err(KeysError::ConcurrentModification {
                path: self.path().to_path_buf(),
                attempts: 1,
            });
        }
        write_atomic(self.path(), text.as_bytes(), 0o600).map_err(|source| {
            KeysError::Persist {
                path: self.path().to_path_buf(),
                source,
            }
        })?;
        state.registered.save(&self.config.users_file)?;

        state.snapshot = Some(text.into_bytes());
        state.dirty = false;
        info!(
            "Rewrote {} with {} principals, {} pending, {} foreign entries",
            self.path().display(),
            state.registered.len(),
            state.pending.len(),
            state.foreign.len()
        );
        Ok(())
    }

    fn backup_once(&self) -> Result<(), KeysError> {
        let backup = self.config.backup_path();
        if backup.exists() || !self.path().exists() {
            return Ok(());
        }
        fs::copy(self.path(), &backup).map_err(|source| KeysError::Backup {
            path: backup.clone(),
            source,
        })?;
        info!("Backed up authorized_keys to {}", backup.display());
        Ok(())
    }

    /// Read, apply `change`, and write, retrying the whole cycle when a
    /// concurrent writer replaced the store in between.
    ///
    /// `change` may run more than once and must only touch the state it is
    /// given. An error from `change` aborts without writing.
    pub fn update<T>(
        &self,
        mut change: impl FnMut(&mut KeyState) -> Result<T, KeysError>,
    ) -> Result<T, KeysError> {
        for attempt in 1..=MAX_ATTEMPTS {
            let mut state = self.read()?;
            let value = change(&mut state)?;
            match self.write(&mut state) {
                Ok(()) => return Ok(value),
                Err(e) if e.is_concurrency_error() => {
                    warn!(
                        "{} changed while we were updating it (attempt {attempt}/{MAX_ATTEMPTS})",
                        self.path().display()
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Err(KeysError::ConcurrentModification {
            path: self.path().to_path_buf(),
            attempts: MAX_ATTEMPTS,
        })
    }

    /// Rewrite the store in canonical form without any logical change.
    ///
    /// Returns whether reading found something to migrate.
    pub fn sync(&self) -> Result<bool, KeysError> {
        self.update(|state| Ok(state.is_dirty()))
    }
}
