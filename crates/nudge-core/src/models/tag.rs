//! Tag model

use serde::{Deserialize, Serialize};

use super::{TagId, UserId};
use crate::error::{Error, Result};

const MAX_TAG_NAME_LEN: usize = 50;

/// Color given to tags created without one
pub const DEFAULT_TAG_COLOR: &str = "blue";

/// A label attached to reminders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Unique identifier
    pub id: TagId,
    /// Display name, unique per owner ignoring case
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(alias = "userId")]
    pub owner_id: UserId,
}

impl Tag {
    /// Whether this tag's name matches `name`, ignoring case and padding.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }
}

/// Payload for creating a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTag {
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
}

impl NewTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: default_color(),
        }
    }

    /// Validate and trim the payload.
    pub fn validated(mut self) -> Result<Self> {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("tag name is required".to_string()));
        }
        if trimmed.chars().count() > MAX_TAG_NAME_LEN {
            return Err(Error::InvalidInput(format!(
                "tag name must be at most {MAX_TAG_NAME_LEN} characters"
            )));
        }
        self.name = trimmed.to_string();
        if self.color.trim().is_empty() {
            self.color = default_color();
        }
        Ok(self)
    }
}

/// Return the owner's tag named `input.name`, creating it if none exists.
///
/// The boolean is `true` when a new tag was created.
pub fn get_or_create<'a>(
    tags: &'a mut Vec<Tag>,
    owner_id: &UserId,
    input: NewTag,
    make_id: impl FnOnce() -> TagId,
) -> Result<(&'a Tag, bool)> {
    let input = input.validated()?;
    if let Some(index) = tags
        .iter()
        .position(|tag| &tag.owner_id == owner_id && tag.matches_name(&input.name))
    {
        return Ok((&tags[index], false));
    }

    tags.push(Tag {
        id: make_id(),
        name: input.name,
        color: input.color,
        owner_id: owner_id.clone(),
    });
    let created = tags.len() - 1;
    Ok((&tags[created], true))
}

fn default_color() -> String {
    DEFAULT_TAG_COLOR.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_tag_defaults_color() {
        let tag = NewTag::new(" Errands ").validated().unwrap();
        assert_eq!(tag.name, "Errands");
        assert_eq!(tag.color, "blue");
    }

    #[test]
    fn test_new_tag_rejects_long_names() {
        assert!(NewTag::new("x".repeat(51)).validated().is_err());
        assert!(NewTag::new("").validated().is_err());
    }

    #[test]
    fn test_get_or_create_is_case_insensitive_per_owner() {
        let owner = UserId::from("u1");
        let other = UserId::from("u2");
        let mut tags = Vec::new();

        let (first, created) =
            get_or_create(&mut tags, &owner, NewTag::new("Home"), || TagId::from("t1")).unwrap();
        assert!(created);
        assert_eq!(first.id, TagId::from("t1"));

        let (again, created) =
            get_or_create(&mut tags, &owner, NewTag::new("HOME"), || TagId::from("t2")).unwrap();
        assert!(!created);
        assert_eq!(again.id, TagId::from("t1"));

        let (theirs, created) =
            get_or_create(&mut tags, &other, NewTag::new("home"), || TagId::from("t3")).unwrap();
        assert!(created);
        assert_eq!(theirs.owner_id, other);
        assert_eq!(tags.len(), 2);
    }
}
