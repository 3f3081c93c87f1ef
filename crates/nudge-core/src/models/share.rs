//! List sharing roles

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::{ListId, UserId};
use crate::error::{Error, Result};

/// Permission tier granted on a shared list.
///
/// Variants are ordered by privilege so `role >= ShareRole::Editor` reads as
/// "may write". The canonical serialization is lowercase; parsing accepts any
/// ASCII case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShareRole {
    /// Read-only access
    Viewer,
    /// May create, edit, complete, and delete reminders
    Editor,
    /// Full control, including the list itself
    Admin,
}

impl ShareRole {
    /// Canonical wire representation
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }

    /// Whether the role allows writing reminders.
    pub const fn can_write(self) -> bool {
        matches!(self, Self::Editor | Self::Admin)
    }

    /// Whether this role meets the `required` tier.
    pub fn satisfies(self, required: Self) -> bool {
        self >= required
    }
}

impl fmt::Display for ShareRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShareRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "viewer" => Ok(Self::Viewer),
            "editor" => Ok(Self::Editor),
            "admin" => Ok(Self::Admin),
            other => Err(Error::InvalidInput(format!("unknown share role '{other}'"))),
        }
    }
}

impl Serialize for ShareRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ShareRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A list shared with another user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListShare {
    pub list_id: ListId,
    #[serde(alias = "sharedWithId")]
    pub user_id: UserId,
    pub role: ShareRole,
}

/// Shares of a single list, at most one per user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareSet {
    list_id: Option<ListId>,
    owner_id: Option<UserId>,
    shares: Vec<ListShare>,
}

impl ShareSet {
    /// Create an empty share set for a list owned by `owner_id`.
    pub fn new(list_id: ListId, owner_id: UserId) -> Self {
        Self {
            list_id: Some(list_id),
            owner_id: Some(owner_id),
            shares: Vec::new(),
        }
    }

    /// Grant or change a user's role. Re-sharing replaces the existing row.
    pub fn upsert(&mut self, user_id: UserId, role: ShareRole) -> Result<()> {
        if self.owner_id.as_ref() == Some(&user_id) {
            return Err(Error::InvalidInput(
                "the list owner cannot be added as a collaborator".to_string(),
            ));
        }
        let list_id = self
            .list_id
            .clone()
            .ok_or_else(|| Error::InvalidInput("share set has no list".to_string()))?;

        if let Some(existing) = self.shares.iter_mut().find(|s| s.user_id == user_id) {
            existing.role = role;
        } else {
            self.shares.push(ListShare {
                list_id,
                user_id,
                role,
            });
        }
        Ok(())
    }

    /// Remove a user's share, returning whether one existed.
    pub fn revoke(&mut self, user_id: &UserId) -> bool {
        let before = self.shares.len();
        self.shares.retain(|s| &s.user_id != user_id);
        before != self.shares.len()
    }

    /// Effective role of `user_id` on this list.
    pub fn role_for(&self, user_id: &UserId) -> Option<ShareRole> {
        resolve_access(self.owner_id.as_ref(), &self.shares, user_id)
    }

    pub fn shares(&self) -> &[ListShare] {
        &self.shares
    }
}

/// Effective role for a user: owners are implicitly admins, everyone else
/// needs a share row.
pub fn resolve_access(
    owner_id: Option<&UserId>,
    shares: &[ListShare],
    user_id: &UserId,
) -> Option<ShareRole> {
    if owner_id == Some(user_id) {
        return Some(ShareRole::Admin);
    }
    shares
        .iter()
        .find(|share| &share.user_id == user_id)
        .map(|share| share.role)
}
