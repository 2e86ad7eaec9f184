//! Async access to the remote item collection.

use std::fmt;
use std::sync::Arc;

use cartlist_core::{Item, ItemId, ItemPatch, NewItem};

use crate::error::SyncError;

/// The four operations of the collection endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Read the owner's whole collection.
    List,
    /// Create an item.
    Create,
    /// Change fields of an item.
    Update,
    /// Delete an item.
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// Remote collection of the current user's items.
///
/// Implementations classify failures into [`SyncError::Unauthorized`] and
/// [`SyncError::Transport`] and never retry; recovery is the caller's job.
#[allow(async_fn_in_trait)]
pub trait RemoteItems {
    /// Fetch every item owned by the authenticated user, in no particular order.
    ///
    /// # Errors
    /// Returns a classified failure when the collection cannot be read.
    async fn list(&self) -> Result<Vec<Item>, SyncError>;

    /// Create an item and return the stored record with its assigned id.
    ///
    /// # Errors
    /// Returns a classified failure when the item was not created.
    async fn create(&self, item: &NewItem) -> Result<Item, SyncError>;

    /// Apply `patch` and return the item's full updated record.
    ///
    /// # Errors
    /// Returns a classified failure when the update was not applied.
    async fn update(&self, id: &ItemId, patch: &ItemPatch) -> Result<Item, SyncError>;

    /// Delete an item.
    ///
    /// # Errors
    /// Returns a classified failure when the deletion was not acknowledged.
    async fn delete(&self, id: &ItemId) -> Result<(), SyncError>;
}

impl<R: RemoteItems> RemoteItems for Arc<R> {
    async fn list(&self) -> Result<Vec<Item>, SyncError> {
        self.as_ref().list().await
    }

    async fn create(&self, item: &NewItem) -> Result<Item, SyncError> {
        self.as_ref().create(item).await
    }

    async fn update(&self, id: &ItemId, patch: &ItemPatch) -> Result<Item, SyncError> {
        self.as_ref().update(id, patch).await
    }

    async fn delete(&self, id: &ItemId) -> Result<(), SyncError> {
        self.as_ref().delete(id).await
    }
}
