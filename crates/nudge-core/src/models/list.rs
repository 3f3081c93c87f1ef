//! List model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ListId, ShareRole, UserId};
use crate::error::{Error, Result};

const MAX_LIST_NAME_LEN: usize = 100;

/// A reminders list as returned by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    /// Unique identifier
    pub id: ListId,
    /// Display name
    pub name: String,
    /// Accent color name or hex value
    #[serde(default)]
    pub color: Option<String>,
    /// Icon name
    #[serde(default)]
    pub icon: Option<String>,
    /// Display order among the user's lists
    #[serde(default)]
    pub order: i64,
    /// Owner of the list
    #[serde(alias = "userId")]
    pub owner_id: UserId,
    /// Number of incomplete, non-deleted reminders
    #[serde(default)]
    pub incomplete_count: u32,
    /// Role of the requesting user; absent means owner
    #[serde(default)]
    pub role: Option<ShareRole>,
    /// Last server-side update
    pub updated_at: DateTime<Utc>,
}

impl List {
    /// Role the current user holds on this list.
    pub fn effective_role(&self) -> ShareRole {
        self.role.unwrap_or(ShareRole::Admin)
    }

    /// Apply a partial edit, validating the new name if present.
    pub fn apply_patch(&mut self, patch: &ListPatch, now: DateTime<Utc>) -> Result<()> {
        if let Some(name) = &patch.name {
            self.name = validate_list_name(name)?;
        }
        if let Some(color) = &patch.color {
            self.color = Some(color.clone());
        }
        if let Some(icon) = &patch.icon {
            self.icon = Some(icon.clone());
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Offline projection of a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedList {
    pub id: ListId,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub incomplete_count: u32,
    pub updated_at: DateTime<Utc>,
}

impl From<&List> for CachedList {
    fn from(list: &List) -> Self {
        Self {
            id: list.id.clone(),
            name: list.name.clone(),
            color: list.color.clone(),
            icon: list.icon.clone(),
            incomplete_count: list.incomplete_count,
            updated_at: list.updated_at,
        }
    }
}

/// Payload for creating a list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewList {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl NewList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Validate and trim the payload.
    pub fn validated(mut self) -> Result<Self> {
        self.name = validate_list_name(&self.name)?;
        Ok(self)
    }
}

/// Partial list edit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

/// Next display position after the given existing positions.
///
/// Used for list `order` and reminder `sortOrder` alike; an empty group
/// starts at 1.
pub fn next_position(existing: impl IntoIterator<Item = i64>) -> i64 {
    existing.into_iter().max().unwrap_or(0) + 1
}

fn validate_list_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("list name is required".to_string()));
    }
    if trimmed.chars().count() > MAX_LIST_NAME_LEN {
        return Err(Error::InvalidInput(format!(
            "list name must be at most {MAX_LIST_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}
