//! Error types for remote item operations.

use cartlist_core::{ItemError, PatchError};
use thiserror::Error;

use crate::remote::Operation;

/// Failure classes surfaced to callers of the item store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Network error or unexpected status; recovered by a full resync.
    Transport,
    /// Credential missing, expired or rejected; the caller must re-authenticate.
    Auth,
}

/// Errors returned by remote item operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote answered 401.
    #[error("{operation} rejected: authentication required ({message})")]
    Unauthorized {
        /// Operation that was rejected.
        operation: Operation,
        /// Detail from the transport layer.
        message: String,
    },

    /// Network failure, non-2xx status or undecodable body.
    #[error("{operation} failed: {message}")]
    Transport {
        /// Operation that failed.
        operation: Operation,
        /// Detail from the transport layer.
        message: String,
    },

    /// Candidate item rejected before reaching the remote.
    #[error("invalid item: {0}")]
    Item(#[from] ItemError),

    /// Update payload rejected before reaching the remote.
    #[error("invalid update: {0}")]
    Patch(#[from] PatchError),
}

impl SyncError {
    /// Build an error of the given class.
    pub fn from_kind(kind: FailureKind, operation: Operation, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            FailureKind::Transport => Self::Transport { operation, message },
            FailureKind::Auth => Self::Unauthorized { operation, message },
        }
    }

    /// Shorthand for a transport failure.
    pub fn transport(operation: Operation, message: impl Into<String>) -> Self {
        Self::from_kind(FailureKind::Transport, operation, message)
    }

    /// Failure class, `None` for local validation errors.
    #[must_use]
    pub const fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::Transport { .. } => Some(FailureKind::Transport),
            Self::Unauthorized { .. } => Some(FailureKind::Auth),
            Self::Item(_) | Self::Patch(_) => None,
        }
    }

    /// Returns true for authentication failures.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self.kind(), Some(FailureKind::Auth))
    }

    /// Operation that reached the remote, `None` for local validation errors.
    #[must_use]
    pub const fn operation(&self) -> Option<Operation> {
        match self {
            Self::Transport { operation, .. } | Self::Unauthorized { operation, .. } => Some(*operation),
            Self::Item(_) | Self::Patch(_) => None,
        }
    }

    /// Failure detail without the operation prefix.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Transport { message, .. } | Self::Unauthorized { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Signals that loading requires a fresh sign-in; the cache is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("session is not authenticated: {reason}")]
pub struct Unauthenticated {
    /// Detail reported by the remote.
    pub reason: String,
}

impl From<Unauthenticated> for SyncError {
    fn from(err: Unauthenticated) -> Self {
        Self::Unauthorized {
            operation: Operation::List,
            message: err.reason,
        }
    }
}
