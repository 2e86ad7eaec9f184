//! Side-channel notifications emitted by the item store.

use std::fmt;

use crate::remote::Operation;

/// Something a caller may want to show without it being an error return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A remote call failed for a transport reason; a resync follows for mutations.
    TransportFailure {
        /// Operation that failed.
        operation: Operation,
        /// Human-readable detail.
        message: String,
    },
    /// The remote rejected the credential; the user must sign in again.
    Unauthenticated {
        /// Operation that was rejected.
        operation: Operation,
        /// Human-readable detail.
        message: String,
    },
    /// The cache was replaced by a fresh listing.
    Resynced {
        /// Number of items now cached.
        items: usize,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportFailure { operation, message } => {
                write!(f, "could not {operation} items: {message}")
            }
            Self::Unauthenticated { operation, message } => {
                write!(f, "sign in again to {operation} items ({message})")
            }
            Self::Resynced { items } => write!(f, "reloaded {items} item(s)"),
        }
    }
}
