//! Opaque record identifiers
//!
//! Identifiers are issued by the server and treated as opaque strings. The
//! only structure the client relies on is the placeholder prefix used for
//! optimistic creates, which never parses as a server id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix reserved for client-generated placeholder ids.
pub const PLACEHOLDER_PREFIX: &str = "temp-";

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether this id was generated locally for an optimistic create.
            pub fn is_placeholder(&self) -> bool {
                self.0.starts_with(PLACEHOLDER_PREFIX)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

opaque_id!(
    /// Identifier of a list
    ListId
);

opaque_id!(
    /// Identifier of a reminder
    ReminderId
);

opaque_id!(
    /// Identifier of a tag
    TagId
);

opaque_id!(
    /// Identifier of a user account
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_detection_uses_prefix() {
        assert!(ReminderId::from("temp-abc-1").is_placeholder());
        assert!(!ReminderId::from("0190c7a2-5f1e-7000-8000-000000000000").is_placeholder());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = ListId::from("list-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"list-1\"");
        let parsed: ListId = serde_json::from_str("\"list-1\"").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn new_reminder_defaults_to_blank_payload() {
        let input = crate::models::NewReminder::default();
        assert_eq!(input.list_id, ListId::default());
        assert_eq!(input.list_id.as_str(), "");
        assert!(!input.list_id.is_placeholder());
    }
}
