//! The invitation lifecycle: `Unregistered -> Pending -> Registered`.
//!
//! The host owner invites someone by adding the public half of a fresh key
//! pair as a pending entry and mailing them the private half. The guest
//! connects once with it and sends an [`Enrollment`]: the last characters
//! of the invitation key, their own public key and who they are. If the
//! email matches the invitation, the pending entry is replaced by a
//! registered key. Otherwise it stays pending.

use tracing::{info, warn};

use super::{classify::PendingInvitation, errors::KeysError, store::KeyState};
use crate::{
    constants::INVITATION_SUFFIX_LEN,
    identity::{Key, short_fingerprint},
};

/// A registration request sent by an invited guest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrollment {
    /// Trailing characters of the invitation's public key
    pub invitation_suffix: String,
    /// Type of the guest's own key
    pub key_type: String,
    /// The guest's own public key blob
    pub key: String,
    pub email: String,
    pub user: String,
    pub name: String,
    pub host: String,
    pub alias: String,
}

impl Enrollment {
    /// Parse `suffix,key_type key,email,user,name,host,alias`.
    ///
    /// The second field is an OpenSSH public key line; a trailing comment
    /// in it is ignored.
    pub fn parse(payload: &str) -> Result<Self, KeysError> {
        let fields: Vec<&str> = payload.trim().split(',').map(str::trim).collect();
        let [suffix, public_key, email, user, name, host, alias] = fields.as_slice() else {
            return Err(KeysError::MalformedEnrollment {
                reason: format!("expected 7 comma separated fields, got {}", fields.len()),
            });
        };

        let mut parts = public_key.split_whitespace();
        let (Some(key_type), Some(key)) = (parts.next(), parts.next()) else {
            return Err(KeysError::MalformedEnrollment {
                reason: "public key must be '<type> <key>'".to_string(),
            });
        };
        if suffix.is_empty() || email.is_empty() {
            return Err(KeysError::MalformedEnrollment {
                reason: "invitation key and email are required".to_string(),
            });
        }

        Ok(Self {
            invitation_suffix: suffix.to_string(),
            key_type: key_type.to_string(),
            key: key.to_string(),
            email: email.to_string(),
            user: user.to_string(),
            name: name.to_string(),
            host: host.to_string(),
            alias: alias.to_string(),
        })
    }

    /// Render as the payload a guest sends over ssh.
    pub fn payload(&self) -> String {
        format!(
            "{},{} {},{},{},{},{},{}",
            self.invitation_suffix,
            self.key_type,
            self.key,
            self.email,
            self.user,
            self.name,
            self.host,
            self.alias
        )
    }

    /// The registered key record this enrollment produces.
    pub fn to_key(&self) -> Key {
        Key {
            user: self.user.clone(),
            name: self.name.clone(),
            alias: self.alias.clone(),
            host: self.host.clone(),
            key_type: self.key_type.clone(),
            key_desc: format!("{}@{} - git", self.user, self.alias),
            key: self.key.clone(),
        }
    }
}

/// The last [`INVITATION_SUFFIX_LEN`] characters of a key, as sent back in
/// an [`Enrollment`].
pub fn invitation_suffix(key: &str) -> &str {
    let count = key.chars().count();
    match key.char_indices().nth(count.saturating_sub(INVITATION_SUFFIX_LEN)) {
        Some((start, _)) if count > INVITATION_SUFFIX_LEN => &key[start..],
        _ => key,
    }
}

impl KeyState {
    /// Record a pending invitation for `email`. Returns its fingerprint.
    pub fn invite(
        &mut self,
        email: &str,
        key_type: &str,
        key: &str,
        key_desc: &str,
    ) -> String {
        let fingerprint = short_fingerprint(key).to_string();
        let invitation = PendingInvitation {
            email: email.to_string(),
            key_type: key_type.to_string(),
            key: key.to_string(),
            key_desc: key_desc.to_string(),
        };
        if let Some(previous) = self.pending.insert(fingerprint.clone(), invitation) {
            warn!(
                "Invitation key {fingerprint} for {email} replaces one issued to {}",
                previous.email
            );
        }
        self.mark_dirty();
        info!("Invited {email} ({fingerprint})");
        fingerprint
    }

    /// Find the pending invitation whose key ends with `suffix`.
    pub fn find_invitation(&self, suffix: &str) -> Option<(&str, &PendingInvitation)> {
        if suffix.is_empty() {
            return None;
        }
        self.pending
            .iter()
            .find(|(_, invitation)| invitation.key.ends_with(suffix))
            .map(|(fingerprint, invitation)| (fingerprint.as_str(), invitation))
    }

    /// Turn the pending invitation issued to `invited` into a registered
    /// key.
    ///
    /// `invited` is the email named by the invitation wrapper the guest
    /// connected through. The enrollment must carry the same email and
    /// point at an invitation issued to it; otherwise nothing changes and
    /// every invitation stays pending.
    pub fn confirm(&mut self, invited: &str, enrollment: &Enrollment) -> Result<Key, KeysError> {
        if enrollment.email != invited {
            return Err(KeysError::EmailMismatch {
                expected: invited.to_string(),
                actual: enrollment.email.clone(),
            });
        }
        let (fingerprint, invitation) = self
            .find_invitation(&enrollment.invitation_suffix)
            .ok_or_else(|| KeysError::InvitationNotFound {
                suffix: enrollment.invitation_suffix.clone(),
            })?;
        if invitation.email != invited {
            return Err(KeysError::EmailMismatch {
                expected: invitation.email.clone(),
                actual: invited.to_string(),
            });
        }
        let fingerprint = fingerprint.to_string();
        self.pending.remove(&fingerprint);

        let key = enrollment.to_key();
        self.registered.insert(enrollment.email.clone(), key.clone());
        self.mark_dirty();
        info!(
            "Registered {} ({}) from invitation {fingerprint}",
            enrollment.email,
            key.fingerprint()
        );
        Ok(key)
    }
}
