//! In-process remote collection used by tests and offline runs.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use cartlist_core::{Item, ItemId, ItemPatch, NewItem};
use tracing::debug;

use crate::error::{FailureKind, SyncError};
use crate::remote::{Operation, RemoteItems};
use crate::session::Session;

/// Owner used when the session carries no identity.
pub const DEFAULT_OWNER: &str = "default_user";

/// Collection held in memory and partitioned by owner.
///
/// Newly created items go to the front, so `list` returns newest first.
/// Failures can be scripted per operation with [`MemoryRemote::fail_next`].
#[derive(Debug, Default)]
pub struct MemoryRemote {
    session: Session,
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    collections: HashMap<String, Vec<Item>>,
    scripted: VecDeque<(Operation, FailureKind)>,
    require_token: bool,
    calls: Vec<Operation>,
}

impl MemoryRemote {
    /// Empty collection scoped by `session`.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session,
            state: Mutex::default(),
        }
    }

    /// Reject every operation with an auth failure while the session has no token.
    #[must_use]
    pub fn require_token(self, required: bool) -> Self {
        self.lock().require_token = required;
        self
    }

    /// Replace the collection of `owner`.
    pub fn seed(&self, owner: &str, items: Vec<Item>) {
        self.lock().collections.insert(owner.to_owned(), items);
    }

    /// Make the next `operation` fail with `kind`.
    pub fn fail_next(&self, operation: Operation, kind: FailureKind) {
        self.lock().scripted.push_back((operation, kind));
    }

    /// Collection of `owner` as currently stored.
    #[must_use]
    pub fn snapshot(&self, owner: &str) -> Vec<Item> {
        self.lock().collections.get(owner).cloned().unwrap_or_default()
    }

    /// Operations received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<Operation> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call, yield once, then check scripted failures and credentials.
    async fn enter(&self, operation: Operation) -> Result<String, SyncError> {
        self.lock().calls.push(operation);
        tokio::task::yield_now().await;

        let mut state = self.lock();
        if let Some(pos) = state.scripted.iter().position(|(op, _)| *op == operation)
            && let Some((_, kind)) = state.scripted.remove(pos)
        {
            debug!(%operation, ?kind, "scripted failure");
            return Err(SyncError::from_kind(kind, operation, "scripted failure"));
        }
        if state.require_token && self.session.bearer().is_none() {
            return Err(SyncError::from_kind(FailureKind::Auth, operation, "missing token"));
        }
        Ok(self.session.owner().unwrap_or_else(|| DEFAULT_OWNER.to_owned()))
    }
}

impl RemoteItems for MemoryRemote {
    async fn list(&self) -> Result<Vec<Item>, SyncError> {
        let owner = self.enter(Operation::List).await?;
        Ok(self.snapshot(&owner))
    }

    async fn create(&self, item: &NewItem) -> Result<Item, SyncError> {
        let owner = self.enter(Operation::Create).await?;
        let created = item.clone().into_item(ItemId::generate(), owner.clone());
        self.lock()
            .collections
            .entry(owner)
            .or_default()
            .insert(0, created.clone());
        Ok(created)
    }

    async fn update(&self, id: &ItemId, patch: &ItemPatch) -> Result<Item, SyncError> {
        let owner = self.enter(Operation::Update).await?;
        if patch.is_empty() {
            return Err(SyncError::transport(Operation::Update, "no fields to update"));
        }
        patch
            .validate()
            .map_err(|err| SyncError::transport(Operation::Update, err.to_string()))?;
        let mut state = self.lock();
        let item = state
            .collections
            .get_mut(&owner)
            .and_then(|items| items.iter_mut().find(|item| item.id == *id))
            .ok_or_else(|| SyncError::transport(Operation::Update, format!("item {id} not found")))?;
        patch.apply(item);
        Ok(item.clone())
    }

    async fn delete(&self, id: &ItemId) -> Result<(), SyncError> {
        let owner = self.enter(Operation::Delete).await?;
        if let Some(items) = self.lock().collections.get_mut(&owner) {
            items.retain(|item| item.id != *id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use crate::session::Identity;
    use cartlist_core::StoreLabel;

    fn new_item(name: &str, store: &str) -> NewItem {
        NewItem::new(name, StoreLabel::new(store)).unwrap_or_else(|err| panic!("must build item: {err}"))
    }

    #[tokio::test]
    async fn create_assigns_id_and_lists_newest_first() {
        let remote = MemoryRemote::new(Session::signed_in(Identity::new("alice", "t1")));
        let milk = remote.create(&new_item("Milk", "Costco")).await.expect("create");
        let eggs = remote.create(&new_item("Eggs", "")).await.expect("create");

        assert_ne!(milk.id, eggs.id);
        assert_eq!(milk.owner, "alice");
        let names: Vec<String> = remote.list().await.expect("list").into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["Eggs", "Milk"]);
    }

    #[tokio::test]
    async fn anonymous_session_uses_default_owner() {
        let remote = MemoryRemote::new(Session::anonymous());
        remote.create(&new_item("Bread", "HEB")).await.expect("create");
        assert_eq!(remote.snapshot(DEFAULT_OWNER).len(), 1);
    }

    #[tokio::test]
    async fn collections_are_partitioned_by_owner() {
        let bob = Session::signed_in(Identity::new("bob", "t2"));
        let remote = MemoryRemote::new(bob);
        remote.seed(
            "alice",
            vec![Item::new(ItemId::new("a1").expect("id"), "alice", "Tea", StoreLabel::none())],
        );
        assert!(remote.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn update_returns_full_record_and_rejects_unknown_ids() {
        let remote = MemoryRemote::new(Session::dev());
        let created = remote.create(&new_item("Milk", "Costco")).await.expect("create");

        let updated = remote
            .update(&created.id, &ItemPatch::completed(true))
            .await
            .expect("update");
        assert!(updated.completed);
        assert_eq!(updated.name, "Milk");

        let missing = ItemId::new("nope").expect("id");
        let err = remote.update(&missing, &ItemPatch::completed(true)).await.expect_err("must fail");
        assert_eq!(err.kind(), Some(FailureKind::Transport));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let remote = MemoryRemote::new(Session::dev());
        let created = remote.create(&new_item("Milk", "")).await.expect("create");
        remote.delete(&created.id).await.expect("delete");
        remote.delete(&created.id).await.expect("delete again");
        assert!(remote.snapshot("dev_user").is_empty());
    }

    #[tokio::test]
    async fn scripted_failures_fire_once_for_their_operation() {
        let remote = MemoryRemote::new(Session::dev());
        remote.fail_next(Operation::List, FailureKind::Auth);

        remote.create(&new_item("Milk", "")).await.expect("create unaffected");
        let err = remote.list().await.expect_err("scripted");
        assert!(err.is_auth());
        assert_eq!(remote.list().await.expect("second list").len(), 1);
        assert_eq!(
            remote.calls(),
            vec![Operation::Create, Operation::List, Operation::List]
        );
    }

    #[tokio::test]
    async fn required_token_rejects_anonymous_sessions() {
        let remote = MemoryRemote::new(Session::anonymous()).require_token(true);
        let err = remote.list().await.expect_err("must fail");
        assert!(err.is_auth());
    }
}
