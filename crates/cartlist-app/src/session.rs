//! Authentication session shared by the item store and the remote adapter.
//!
//! The session is an explicit service object: construct it on startup, hand
//! clones to the collaborators that need it, and call [`Session::sign_out`]
//! on teardown. Credential verification is left to the identity provider;
//! the session only carries what it issued.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

/// Owner used when the identity provider is bypassed in development.
pub const DEV_OWNER: &str = "dev_user";
/// Token accepted by development servers when authentication is skipped.
pub const DEV_TOKEN: &str = "dev_token";

/// Credential issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// User the collection is partitioned by.
    pub owner: String,
    /// Bearer token forwarded with every request.
    pub token: String,
}

impl Identity {
    /// Build an identity from its parts.
    pub fn new(owner: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            token: token.into(),
        }
    }
}

/// Shared handle to the current authentication state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug, Default)]
struct SessionInner {
    identity: RwLock<Option<Identity>>,
    epoch: AtomicU64,
}

impl Session {
    /// Session without a credential; requests go out unauthenticated.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Session holding `identity`.
    #[must_use]
    pub fn signed_in(identity: Identity) -> Self {
        let session = Self::default();
        *session.write() = Some(identity);
        session
    }

    /// Development session matching the server's auth bypass.
    #[must_use]
    pub fn dev() -> Self {
        Self::signed_in(Identity::new(DEV_OWNER, DEV_TOKEN))
    }

    /// Replace the credential, e.g. after re-authentication.
    pub fn sign_in(&self, identity: Identity) {
        info!(owner = %identity.owner, "signed in");
        *self.write() = Some(identity);
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Drop the credential; results of requests issued before this call are stale.
    pub fn sign_out(&self) {
        if self.write().take().is_some() {
            info!("signed out");
        }
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Current credential, if any.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner
            .identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Bearer token to attach to requests.
    #[must_use]
    pub fn bearer(&self) -> Option<String> {
        self.identity().map(|identity| identity.token)
    }

    /// Owner of the collection, if known.
    #[must_use]
    pub fn owner(&self) -> Option<String> {
        self.identity().map(|identity| identity.owner)
    }

    /// Returns true while a credential is held.
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.identity().is_some()
    }

    /// Counter bumped on every sign-in and sign-out.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Identity>> {
        self.inner.identity.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_session_has_no_bearer() {
        let session = Session::anonymous();
        assert!(!session.is_signed_in());
        assert_eq!(session.bearer(), None);
    }

    #[test]
    fn dev_session_uses_bypass_credentials() {
        let session = Session::dev();
        assert_eq!(session.owner().as_deref(), Some(DEV_OWNER));
        assert_eq!(session.bearer().as_deref(), Some(DEV_TOKEN));
    }

    #[test]
    fn clones_observe_sign_out_and_epoch_changes() {
        let session = Session::signed_in(Identity::new("alice", "t1"));
        let shared = session.clone();
        let before = shared.epoch();

        session.sign_out();
        assert!(!shared.is_signed_in());
        assert!(shared.epoch() > before);

        let after_sign_out = shared.epoch();
        session.sign_in(Identity::new("bob", "t2"));
        assert_eq!(shared.owner().as_deref(), Some("bob"));
        assert!(shared.epoch() > after_sign_out);
    }
}
