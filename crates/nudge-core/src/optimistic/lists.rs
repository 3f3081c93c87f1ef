//! Optimistic list view

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use super::{MutationError, MutationKind, PlaceholderIds};
use crate::api::ListApi;
use crate::error::{Error, Result};
use crate::models::{next_position, List, ListId, ListPatch, NewList, UserId};

/// The user's lists, mutated optimistically
pub struct OptimisticLists<A> {
    api: A,
    owner_id: UserId,
    lists: Mutex<Vec<List>>,
    ids: PlaceholderIds,
}

impl<A: ListApi> OptimisticLists<A> {
    pub fn new(api: A, owner_id: UserId) -> Self {
        Self {
            api,
            owner_id,
            lists: Mutex::new(Vec::new()),
            ids: PlaceholderIds::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<List>> {
        self.lists.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn replace_all(&self, lists: Vec<List>) {
        *self.lock() = lists;
    }

    pub fn snapshot(&self) -> Vec<List> {
        self.lock().clone()
    }

    fn restore(&self, action: MutationKind, snapshot: Vec<List>, source: Error) -> MutationError {
        tracing::warn!("Rolling back {action}: {source}");
        *self.lock() = snapshot;
        MutationError::new(action, source)
    }

    fn replace(&self, local_id: &ListId, server: &List) {
        let mut lists = self.lock();
        match lists.iter().position(|list| &list.id == local_id) {
            Some(index) => lists[index] = server.clone(),
            None => lists.push(server.clone()),
        }
    }

    /// Create a list at the end of the user's lists.
    pub async fn create(&self, input: NewList) -> std::result::Result<List, MutationError> {
        let action = MutationKind::CreateList;
        let mut input = input
            .validated()
            .map_err(|source| MutationError::new(action, source))?;
        let placeholder_id = ListId::from(self.ids.next_raw());

        let snapshot = {
            let mut lists = self.lock();
            let snapshot = lists.clone();
            let order = input
                .order
                .unwrap_or_else(|| next_position(lists.iter().map(|list| list.order)));
            input.order = Some(order);
            lists.push(List {
                id: placeholder_id.clone(),
                name: input.name.clone(),
                color: input.color.clone(),
                icon: input.icon.clone(),
                order,
                owner_id: self.owner_id.clone(),
                incomplete_count: 0,
                role: None,
                updated_at: Utc::now(),
            });
            snapshot
        };

        match self.api.create_list(&input).await {
            Ok(server) => {
                self.replace(&placeholder_id, &server);
                Ok(server)
            }
            Err(source) => Err(self.restore(action, snapshot, source)),
        }
    }

    /// Rename or restyle a list.
    pub async fn edit(&self, id: &ListId, patch: &ListPatch) -> std::result::Result<List, MutationError> {
        let action = MutationKind::EditList;
        let snapshot = {
            let mut lists = self.lock();
            let snapshot = lists.clone();
            let staged: Result<()> = lists
                .iter_mut()
                .find(|list| &list.id == id)
                .ok_or_else(|| Error::NotFound(format!("list {id}")))
                .and_then(|list| list.apply_patch(patch, Utc::now()));
            if let Err(source) = staged {
                *lists = snapshot;
                return Err(MutationError::new(action, source));
            }
            snapshot
        };

        match self.api.update_list(id, patch).await {
            Ok(server) => {
                self.replace(id, &server);
                Ok(server)
            }
            Err(source) => Err(self.restore(action, snapshot, source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Default)]
    struct FakeListApi {
        fail: AtomicBool,
    }

    impl FakeListApi {
        fn check(&self) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                Err(Error::Timeout)
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl ListApi for FakeListApi {
        async fn create_list(&self, input: &NewList) -> Result<List> {
            self.check()?;
            Ok(List {
                id: ListId::from("srv-list"),
                name: input.name.clone(),
                color: input.color.clone(),
                icon: input.icon.clone(),
                order: input.order.unwrap_or_default(),
                owner_id: UserId::from("u1"),
                incomplete_count: 0,
                role: None,
                updated_at: Utc::now(),
            })
        }

        async fn update_list(&self, id: &ListId, patch: &ListPatch) -> Result<List> {
            self.check()?;
            let mut list = existing(id.as_str(), 1);
            list.apply_patch(patch, Utc::now())?;
            Ok(list)
        }
    }

    fn existing(id: &str, order: i64) -> List {
        List {
            id: ListId::from(id),
            name: format!("List {id}"),
            color: None,
            icon: None,
            order,
            owner_id: UserId::from("u1"),
            incomplete_count: 2,
            role: None,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_appends_with_next_order() {
        let lists = OptimisticLists::new(FakeListApi::default(), UserId::from("u1"));
        lists.replace_all(vec![existing("a", 3)]);

        let server = lists.create(NewList::new(" Groceries ")).await.unwrap();
        assert_eq!(server.name, "Groceries");
        assert_eq!(server.order, 4);
        let ids: Vec<_> = lists.snapshot().into_iter().map(|list| list.id).collect();
        assert_eq!(ids, vec![ListId::from("a"), ListId::from("srv-list")]);
    }

    #[tokio::test]
    async fn failed_create_restores_lists() {
        let lists = OptimisticLists::new(FakeListApi::default(), UserId::from("u1"));
        lists.replace_all(vec![existing("a", 1)]);
        let before = lists.snapshot();
        lists.api.fail.store(true, Ordering::SeqCst);

        let err = lists.create(NewList::new("Work")).await.unwrap_err();
        assert_eq!(err.action, MutationKind::CreateList);
        assert_eq!(lists.snapshot(), before);
    }

    #[tokio::test]
    async fn failed_edit_restores_lists() {
        let lists = OptimisticLists::new(FakeListApi::default(), UserId::from("u1"));
        lists.replace_all(vec![existing("a", 1)]);
        let before = lists.snapshot();
        lists.api.fail.store(true, Ordering::SeqCst);

        let patch = ListPatch {
            name: Some("Renamed".to_string()),
            ..ListPatch::default()
        };
        assert!(lists.edit(&ListId::from("a"), &patch).await.is_err());
        assert_eq!(lists.snapshot(), before);
    }

    #[tokio::test]
    async fn invalid_edit_is_rejected_locally() {
        let lists = OptimisticLists::new(FakeListApi::default(), UserId::from("u1"));
        lists.replace_all(vec![existing("a", 1)]);
        let before = lists.snapshot();

        let patch = ListPatch {
            name: Some("   ".to_string()),
            ..ListPatch::default()
        };
        let err = lists.edit(&ListId::from("a"), &patch).await.unwrap_err();
        assert!(matches!(err.source, Error::InvalidInput(_)));
        assert_eq!(lists.snapshot(), before);
    }
}
