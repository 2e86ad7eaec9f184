//! Session-scoped item cache with optimistic writes.
//!
//! [`ItemStore`] is the only writer of the cache. `toggle`, `update` and
//! `remove` edit the cache before their request is sent; when the request
//! fails for a transport reason the whole cache is reloaded instead of
//! rolling back a single field. Auth failures never trigger a reload.
//!
//! Completions that arrive after [`ItemStore::close`], or after the session
//! signed in or out, are dropped.

use std::sync::{Mutex, MutexGuard, PoisonError};

use cartlist_core::{Item, ItemId, ItemPatch, NewItem, StoreLabel};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::{FailureKind, SyncError, Unauthenticated};
use crate::item_cache::ItemCache;
use crate::notice::Notice;
use crate::remote::{Operation, RemoteItems};
use crate::session::Session;

const NOTICE_CAPACITY: usize = 64;

/// Local change mirrored to the remote after it is applied to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Mutation {
    Update { id: ItemId, patch: ItemPatch },
    Remove { id: ItemId },
}

impl Mutation {
    const fn operation(&self) -> Operation {
        match self {
            Self::Update { .. } => Operation::Update,
            Self::Remove { .. } => Operation::Delete,
        }
    }

    const fn id(&self) -> &ItemId {
        match self {
            Self::Update { id, .. } | Self::Remove { id } => id,
        }
    }

    fn apply_local(&self, cache: &mut ItemCache) -> bool {
        match self {
            Self::Update { id, patch } => cache.update(id, |item| patch.apply(item)),
            Self::Remove { id } => cache.remove(id).is_some(),
        }
    }
}

#[derive(Debug)]
struct StoreState {
    cache: ItemCache,
    active: bool,
    issued_loads: u64,
    applied_load: u64,
}

/// Authoritative in-memory collection for the signed-in user.
pub struct ItemStore<R> {
    remote: R,
    session: Session,
    state: Mutex<StoreState>,
    notices: broadcast::Sender<Notice>,
}

impl<R: RemoteItems> ItemStore<R> {
    /// Empty, active store backed by `remote`.
    #[must_use]
    pub fn new(remote: R, session: Session) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            remote,
            session,
            state: Mutex::new(StoreState {
                cache: ItemCache::default(),
                active: true,
                issued_loads: 0,
                applied_load: 0,
            }),
            notices,
        }
    }

    /// Remote the store talks to.
    #[must_use]
    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Session the store is scoped to.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Receive notices emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Copy of the cached items in display order.
    #[must_use]
    pub fn items(&self) -> Vec<Item> {
        self.lock().cache.items().to_vec()
    }

    /// Run `f` over the cached items without copying them.
    ///
    /// The store lock is held while `f` runs; calling back into this store
    /// from `f` deadlocks. Use [`items`](Self::items) for a detached copy.
    pub fn with_items<T>(&self, f: impl FnOnce(&[Item]) -> T) -> T {
        f(self.lock().cache.items())
    }

    /// Copy of one cached item.
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<Item> {
        self.lock().cache.get(id).cloned()
    }

    /// Number of cached items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().cache.len()
    }

    /// Returns true when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().cache.is_empty()
    }

    /// Returns false once [`close`](Self::close) ran.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Tear the store down; later completions leave the cache alone.
    pub fn close(&self) {
        let mut state = self.lock();
        if state.active {
            state.active = false;
            drop(state);
            info!("item store closed");
        }
    }

    /// Replace the cache with the remote collection.
    ///
    /// A transport failure empties the cache and is reported as a
    /// [`Notice::TransportFailure`]; the call still succeeds with zero items.
    ///
    /// # Errors
    /// Returns [`Unauthenticated`] when the remote rejects the session. The
    /// cache is left as it was. Failures arriving after teardown are neither
    /// reported nor returned.
    pub async fn load(&self) -> Result<usize, Unauthenticated> {
        let epoch = self.session.epoch();
        let ticket = {
            let mut state = self.lock();
            state.issued_loads += 1;
            state.issued_loads
        };
        debug!(ticket, "loading items");

        match self.remote.list().await {
            Ok(items) => Ok(self.apply_load(ticket, epoch, ItemCache::from_items(items))),
            Err(err) if !self.still_current(epoch) => {
                warn!(ticket, error = %err, "ignoring load failure completed after teardown");
                Ok(self.len())
            }
            Err(err) if err.is_auth() => {
                warn!(error = %err, "load rejected, sign-in required");
                self.report(&err);
                Err(Unauthenticated { reason: err.detail() })
            }
            Err(err) => {
                warn!(error = %err, "load failed, showing empty collection");
                let len = self.apply_load(ticket, epoch, ItemCache::default());
                self.report(&err);
                Ok(len)
            }
        }
    }

    fn apply_load(&self, ticket: u64, epoch: u64, cache: ItemCache) -> usize {
        let mut state = self.lock();
        if !self.is_current(&state, epoch) {
            warn!(ticket, "ignoring load completed after teardown");
            return state.cache.len();
        }
        if ticket < state.applied_load {
            debug!(ticket, applied = state.applied_load, "ignoring stale load");
            return state.cache.len();
        }
        state.applied_load = ticket;
        state.cache = cache;
        let len = state.cache.len();
        drop(state);
        info!(items = len, "item cache replaced");
        self.notify(Notice::Resynced { items: len });
        len
    }

    /// Create an item and cache the confirmed record at the front.
    ///
    /// Nothing is cached until the remote confirms.
    ///
    /// # Errors
    /// Returns [`SyncError::Item`] for an empty name, otherwise the classified
    /// remote failure. Failures do not trigger a reload and are only reported
    /// as notices while the store is current.
    pub async fn add(&self, name: impl AsRef<str>, store: StoreLabel) -> Result<Item, SyncError> {
        let candidate = NewItem::new(name, store)?;
        let epoch = self.session.epoch();

        match self.remote.create(&candidate).await {
            Ok(item) => {
                let mut state = self.lock();
                if self.is_current(&state, epoch) {
                    state.cache.insert_front(item.clone());
                    drop(state);
                    debug!(id = %item.id, "item added");
                } else {
                    drop(state);
                    warn!(id = %item.id, "ignoring create completed after teardown");
                }
                Ok(item)
            }
            Err(err) => {
                if self.still_current(epoch) {
                    warn!(error = %err, "create failed");
                    self.report(&err);
                } else {
                    warn!(error = %err, "ignoring create failure completed after teardown");
                }
                Err(err)
            }
        }
    }

    /// Flip the completion flag of `id`; unknown ids are ignored.
    ///
    /// # Errors
    /// Returns the classified remote failure after the cache has been
    /// reloaded (transport) or left as is (auth).
    pub async fn toggle(&self, id: &ItemId) -> Result<(), SyncError> {
        let Some((mutation, epoch)) = self.begin(id, |item| Mutation::Update {
            id: id.clone(),
            patch: ItemPatch::completed(!item.completed),
        }) else {
            return Ok(());
        };
        self.dispatch(mutation, epoch).await
    }

    /// Change the name or store of `id`; unknown ids and empty patches are ignored.
    ///
    /// # Errors
    /// Returns [`SyncError::Patch`] for an invalid patch, otherwise the
    /// classified remote failure.
    pub async fn update(&self, id: &ItemId, patch: ItemPatch) -> Result<(), SyncError> {
        patch.validate()?;
        if patch.is_empty() {
            debug!(%id, "empty update ignored");
            return Ok(());
        }
        let Some((mutation, epoch)) = self.begin(id, |_| Mutation::Update {
            id: id.clone(),
            patch,
        }) else {
            return Ok(());
        };
        self.dispatch(mutation, epoch).await
    }

    /// Delete `id`; unknown ids are ignored.
    ///
    /// # Errors
    /// Returns the classified remote failure after the cache has been
    /// reloaded (transport) or left as is (auth).
    pub async fn remove(&self, id: &ItemId) -> Result<(), SyncError> {
        let Some((mutation, epoch)) = self.begin(id, |_| Mutation::Remove { id: id.clone() }) else {
            return Ok(());
        };
        self.dispatch(mutation, epoch).await
    }

    /// Build and apply a mutation under one lock, before any suspension.
    fn begin(&self, id: &ItemId, build: impl FnOnce(&Item) -> Mutation) -> Option<(Mutation, u64)> {
        let mut state = self.lock();
        if !state.active {
            debug!(%id, "store closed, mutation ignored");
            return None;
        }
        let Some(item) = state.cache.get(id) else {
            debug!(%id, "unknown item, mutation ignored");
            return None;
        };
        let mutation = build(item);
        mutation.apply_local(&mut state.cache);
        Some((mutation, self.session.epoch()))
    }

    async fn dispatch(&self, mutation: Mutation, epoch: u64) -> Result<(), SyncError> {
        let operation = mutation.operation();
        let result = match &mutation {
            Mutation::Update { id, patch } => self.remote.update(id, patch).await.map(Some),
            Mutation::Remove { id } => self.remote.delete(id).await.map(|()| None),
        };

        let err = match result {
            Ok(confirmed) => {
                if let Some(item) = confirmed {
                    self.confirm(item, epoch);
                }
                return Ok(());
            }
            Err(err) => err,
        };

        if !self.still_current(epoch) {
            warn!(id = %mutation.id(), %operation, "ignoring failure completed after teardown");
            return Err(err);
        }

        warn!(id = %mutation.id(), error = %err, "mutation failed");
        self.report(&err);
        if err.kind() == Some(FailureKind::Transport) {
            info!(%operation, "resyncing after failed mutation");
            if let Err(auth) = self.load().await {
                debug!(error = %auth, "resync rejected");
            }
        }
        Err(err)
    }

    /// Store the server's record if the item is still cached.
    fn confirm(&self, item: Item, epoch: u64) {
        let mut state = self.lock();
        if !self.is_current(&state, epoch) {
            drop(state);
            warn!(id = %item.id, "ignoring confirmation after teardown");
            return;
        }
        let id = item.id.clone();
        if !state.cache.replace(item) {
            drop(state);
            debug!(%id, "confirmed item no longer cached");
        }
    }

    fn is_current(&self, state: &StoreState, epoch: u64) -> bool {
        state.active && self.session.epoch() == epoch
    }

    fn still_current(&self, epoch: u64) -> bool {
        let state = self.lock();
        self.is_current(&state, epoch)
    }

    fn report(&self, err: &SyncError) {
        let Some(operation) = err.operation() else {
            return;
        };
        let message = err.detail();
        let notice = if err.is_auth() {
            Notice::Unauthenticated { operation, message }
        } else {
            Notice::TransportFailure { operation, message }
        };
        self.notify(notice);
    }

    fn notify(&self, notice: Notice) {
        if self.notices.send(notice).is_err() {
            debug!("no notice subscribers");
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
