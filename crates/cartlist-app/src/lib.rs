//! Client-side sync layer for cartlist.
//!
//! This crate owns the session, the remote collection adapters, the
//! optimistic item store, persisted view preferences and client
//! configuration. Rendering is left to the caller.

pub mod config;
pub mod error;
pub mod http;
pub mod item_cache;
pub mod item_store;
pub mod memory;
pub mod notice;
pub mod preferences;
pub mod remote;
pub mod session;

// Re-exports for convenience
pub use config::{AuthConfig, ClientConfig, PreferencesConfig, RemoteConfig};
pub use error::{FailureKind, SyncError, Unauthenticated};
pub use http::{HttpRemote, classify_status};
pub use item_cache::ItemCache;
pub use item_store::ItemStore;
pub use memory::MemoryRemote;
pub use notice::Notice;
pub use preferences::{FileBackend, MemoryBackend, PreferenceBackend, PreferenceError, PreferenceStore};
pub use remote::{Operation, RemoteItems};
pub use session::{Identity, Session};
