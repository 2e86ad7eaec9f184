//! Domain types and view derivation for cartlist.

/// Store glyphs and suggested store labels.
pub mod emoji;
/// Items, identifiers and store labels.
pub mod item;
/// Typed update payloads.
pub mod patch;
/// Persisted view settings.
pub mod preferences;
pub mod view;

pub use emoji::{DEFAULT_STORES, store_emoji};
pub use item::{Item, ItemError, ItemId, NewItem, StoreLabel};
pub use patch::{ItemPatch, PatchError, UpdateRequest};
pub use preferences::ViewPreferences;
pub use view::{DerivedView, StoreGroup, derive_view, store_counts, store_labels};
