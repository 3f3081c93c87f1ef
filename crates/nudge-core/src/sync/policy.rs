//! Reconciliation rules applied to every pull
//!
//! Lists are server-authoritative and always overwrite the cache. Reminders
//! follow whole-record last-write-wins on `updatedAt`: an incoming copy
//! replaces the local one only when strictly newer, so equal timestamps keep
//! what is already there.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::SyncResponse;
use crate::models::{CachedList, CachedReminder, ReminderId};

/// Outcome of comparing an incoming reminder with the cached copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    Apply,
    Discard,
}

/// Decide whether an incoming reminder replaces the local one.
pub fn decide(local: Option<&CachedReminder>, incoming: &CachedReminder) -> MergeDecision {
    match local {
        Some(local) if incoming.updated_at <= local.updated_at => MergeDecision::Discard,
        _ => MergeDecision::Apply,
    }
}

/// Records a pull will write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    pub lists: Vec<CachedList>,
    pub reminders: Vec<CachedReminder>,
    pub discarded: usize,
}

impl MergePlan {
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty() && self.reminders.is_empty()
    }
}

/// Work out which records of `response` to write given the cached
/// reminders it touches.
///
/// A reminder repeated within one response is judged against the copy
/// accepted earlier in the same response.
pub fn plan_merge(
    existing: &HashMap<ReminderId, CachedReminder>,
    response: &SyncResponse,
) -> MergePlan {
    let mut plan = MergePlan {
        lists: response.lists.clone(),
        ..MergePlan::default()
    };
    let mut accepted: HashMap<&ReminderId, usize> = HashMap::new();

    for incoming in &response.reminders {
        let prior = accepted.get(&incoming.id).copied();
        let current = prior
            .map(|index| &plan.reminders[index])
            .or_else(|| existing.get(&incoming.id));

        match (decide(current, incoming), prior) {
            (MergeDecision::Discard, _) => plan.discarded += 1,
            (MergeDecision::Apply, Some(index)) => {
                plan.reminders[index] = incoming.clone();
                plan.discarded += 1;
            }
            (MergeDecision::Apply, None) => {
                accepted.insert(&incoming.id, plan.reminders.len());
                plan.reminders.push(incoming.clone());
            }
        }
    }

    plan
}

/// Next checkpoint value: never earlier than the current one.
pub fn advance_checkpoint(
    current: Option<DateTime<Utc>>,
    server_timestamp: DateTime<Utc>,
) -> DateTime<Utc> {
    current.map_or(server_timestamp, |current| current.max(server_timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListId, Priority};
    use crate::util::parse_timestamp;
    use pretty_assertions::assert_eq;

    fn ts(raw: &str) -> DateTime<Utc> {
        parse_timestamp(raw).unwrap()
    }

    fn reminder(id: &str, title: &str, updated_at: &str) -> CachedReminder {
        CachedReminder {
            id: ReminderId::from(id),
            list_id: ListId::from("l1"),
            title: title.to_string(),
            notes: None,
            completed: false,
            priority: Priority::None,
            utc_datetime: None,
            timezone: None,
            is_floating: false,
            is_date_only: false,
            updated_at: ts(updated_at),
        }
    }

    fn response(reminders: Vec<CachedReminder>) -> SyncResponse {
        SyncResponse {
            lists: Vec::new(),
            reminders,
            timestamp: ts("2024-06-01T00:00:00Z"),
        }
    }

    fn cache(reminders: &[CachedReminder]) -> HashMap<ReminderId, CachedReminder> {
        reminders.iter().map(|r| (r.id.clone(), r.clone())).collect()
    }

    #[test]
    fn absent_locally_is_applied() {
        let incoming = reminder("r1", "new", "2024-01-01T00:00:00Z");
        assert_eq!(decide(None, &incoming), MergeDecision::Apply);
    }

    #[test]
    fn newer_applies_and_older_discards() {
        let local = reminder("r1", "local", "2024-01-02T00:00:00Z");
        let newer = reminder("r1", "remote", "2024-01-03T00:00:00Z");
        let older = reminder("r1", "remote", "2024-01-01T00:00:00Z");

        assert_eq!(decide(Some(&local), &newer), MergeDecision::Apply);
        assert_eq!(decide(Some(&local), &older), MergeDecision::Discard);
    }

    #[test]
    fn tie_keeps_local_copy() {
        let local = reminder("r1", "local", "2024-01-02T00:00:00Z");
        let tie = reminder("r1", "remote", "2024-01-02T00:00:00Z");
        assert_eq!(decide(Some(&local), &tie), MergeDecision::Discard);
    }

    #[test]
    fn stale_pull_is_discarded() {
        let local = reminder("r1", "edited offline", "2024-02-01T00:00:00Z");
        let plan = plan_merge(
            &cache(&[local]),
            &response(vec![reminder("r1", "server", "2024-01-01T00:00:00Z")]),
        );
        assert!(plan.reminders.is_empty());
        assert_eq!(plan.discarded, 1);
    }

    #[test]
    fn lists_always_overwrite() {
        let mut payload = response(Vec::new());
        payload.lists.push(CachedList {
            id: ListId::from("l1"),
            name: "Renamed".to_string(),
            color: None,
            icon: None,
            incomplete_count: 0,
            updated_at: ts("2020-01-01T00:00:00Z"),
        });
        let plan = plan_merge(&HashMap::new(), &payload);
        assert_eq!(plan.lists, payload.lists);
    }

    #[test]
    fn duplicates_within_one_response_keep_newest() {
        let plan = plan_merge(
            &HashMap::new(),
            &response(vec![
                reminder("r1", "first", "2024-01-01T00:00:00Z"),
                reminder("r1", "second", "2024-01-03T00:00:00Z"),
                reminder("r1", "stale", "2024-01-02T00:00:00Z"),
            ]),
        );
        assert_eq!(plan.reminders.len(), 1);
        assert_eq!(plan.reminders[0].title, "second");
        assert_eq!(plan.discarded, 2);
    }

    #[test]
    fn merging_twice_changes_nothing_the_second_time() {
        let payload = response(vec![
            reminder("r1", "a", "2024-01-01T00:00:00Z"),
            reminder("r2", "b", "2024-01-02T00:00:00Z"),
        ]);
        let first = plan_merge(&HashMap::new(), &payload);
        assert_eq!(first.reminders.len(), 2);

        let second = plan_merge(&cache(&first.reminders), &payload);
        assert!(second.reminders.is_empty());
        assert_eq!(second.discarded, 2);
    }

    #[test]
    fn merged_timestamps_never_decrease() {
        let local = vec![
            reminder("r1", "a", "2024-01-05T00:00:00Z"),
            reminder("r2", "b", "2024-01-01T00:00:00Z"),
        ];
        let existing = cache(&local);
        let plan = plan_merge(
            &existing,
            &response(vec![
                reminder("r1", "older", "2024-01-04T00:00:00Z"),
                reminder("r2", "newer", "2024-01-02T00:00:00Z"),
            ]),
        );

        let mut merged = existing.clone();
        for r in plan.reminders {
            merged.insert(r.id.clone(), r);
        }
        for before in &local {
            assert!(merged[&before.id].updated_at >= before.updated_at);
        }
        assert_eq!(merged[&ReminderId::from("r2")].title, "newer");
    }

    #[test]
    fn checkpoint_is_monotonic() {
        let later = ts("2024-06-01T00:00:00Z");
        let earlier = ts("2024-05-01T00:00:00Z");
        assert_eq!(advance_checkpoint(None, earlier), earlier);
        assert_eq!(advance_checkpoint(Some(earlier), later), later);
        assert_eq!(advance_checkpoint(Some(later), earlier), later);
    }
}
