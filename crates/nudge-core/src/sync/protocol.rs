//! Wire types for the incremental pull endpoint

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{CachedList, CachedReminder};
use crate::util::format_timestamp;

/// Parameters of one pull; absent checkpoints request everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncRequest {
    pub since_lists: Option<DateTime<Utc>>,
    pub since_reminders: Option<DateTime<Utc>>,
}

impl SyncRequest {
    /// Query string pairs for `GET /api/sync`.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(2);
        if let Some(since) = &self.since_lists {
            pairs.push(("sinceLists", format_timestamp(since)));
        }
        if let Some(since) = &self.since_reminders {
            pairs.push(("sinceReminders", format_timestamp(since)));
        }
        pairs
    }

    pub const fn is_full(&self) -> bool {
        self.since_lists.is_none() && self.since_reminders.is_none()
    }
}

/// Records changed since the requested checkpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    #[serde(default)]
    pub lists: Vec<CachedList>,
    #[serde(default)]
    pub reminders: Vec<CachedReminder>,
    /// Server clock when the response was produced
    pub timestamp: DateTime<Utc>,
}

/// Source of incremental pulls.
///
/// Implementations map HTTP 401 to [`crate::Error::Unauthorized`] so the
/// engine can stay silent about expired sessions.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn pull(&self, request: &SyncRequest) -> Result<SyncResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use crate::util::parse_timestamp;
    use pretty_assertions::assert_eq;

    #[test]
    fn query_pairs_skip_missing_checkpoints() {
        assert!(SyncRequest::default().query_pairs().is_empty());
        assert!(SyncRequest::default().is_full());

        let request = SyncRequest {
            since_lists: None,
            since_reminders: parse_timestamp("2024-05-01T10:00:00.250Z"),
        };
        assert_eq!(
            request.query_pairs(),
            vec![("sinceReminders", "2024-05-01T10:00:00.250Z".to_string())]
        );
    }

    #[test]
    fn response_decodes_server_payload() {
        let response: SyncResponse = serde_json::from_str(
            r#"{
                "lists": [{
                    "id": "l1", "name": "Home", "color": null, "icon": "house",
                    "incompleteCount": 4, "updatedAt": "2024-05-01T09:00:00.000Z"
                }],
                "reminders": [{
                    "id": "r1", "listId": "l1", "title": "Water plants", "notes": null,
                    "completed": false, "priority": "LOW",
                    "timezone": "Europe/Lisbon", "isFloating": false, "isDateOnly": true,
                    "updatedAt": "2024-05-01T09:30:00.000Z", "deletedAt": null
                }],
                "timestamp": "2024-05-01T10:00:00.000Z"
            }"#,
        )
        .unwrap();

        assert_eq!(response.lists[0].incomplete_count, 4);
        assert_eq!(response.reminders[0].priority, Priority::Low);
        assert_eq!(response.reminders[0].utc_datetime, None);
        assert_eq!(
            response.timestamp,
            parse_timestamp("2024-05-01T10:00:00Z").unwrap()
        );
    }
}
