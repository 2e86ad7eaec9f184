//! Persisted view preferences.
//!
//! Each field lives under its own namespaced key, so one unreadable value
//! only resets that field.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use cartlist_core::{StoreLabel, ViewPreferences};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

/// Prefix shared by every preference key.
pub const NAMESPACE: &str = "cartlist.prefs.";

const SELECTED_STORES: &str = "selectedStores";
const GROUP_BY_STORE: &str = "groupByStore";
const HIDE_COMPLETED: &str = "hideCompleted";
const EXPANDED_GROUPS: &str = "expandedGroups";

/// Errors raised while saving a preference.
#[derive(Error, Debug)]
pub enum PreferenceError {
    /// The backing file could not be written.
    #[error("failed to write preferences to {}: {source}", path.display())]
    Io {
        /// File being written.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },

    /// The value could not be serialized.
    #[error("failed to encode preference {key}: {source}")]
    Encode {
        /// Key being written.
        key: String,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },

    /// The preference file contents could not be serialized.
    #[error("failed to encode preference file {}: {source}", path.display())]
    EncodeFile {
        /// File being written.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
}

/// String key-value storage for preferences.
pub trait PreferenceBackend {
    /// Stored value for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`.
    ///
    /// # Errors
    /// Returns an error when the value cannot be persisted.
    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

/// Backend that keeps values for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    values: HashMap<String, String>,
}

impl MemoryBackend {
    /// Empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Backend stored as one JSON object in a file.
///
/// A missing or corrupt file reads as empty. Entries that are not strings are
/// kept in their JSON form, so only that field falls back to its default.
/// Every write replaces the file atomically.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileBackend {
    /// Read the file at `path`, tolerating absence and corruption.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, Value>>(&raw) {
                Ok(entries) => entries.into_iter().map(|(key, value)| (key, raw_entry(value))).collect(),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "ignoring corrupt preference file");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot read preference file");
                BTreeMap::new()
            }
        };
        Self { path, values }
    }

    /// File backing this store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), PreferenceError> {
        let io_err = |source: io::Error| PreferenceError::Io {
            path: self.path.clone(),
            source,
        };
        let encoded = serde_json::to_string_pretty(&self.values).map_err(|source| PreferenceError::EncodeFile {
            path: self.path.clone(),
            source,
        })?;

        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(io_err)?;
        let mut file = NamedTempFile::new_in(dir).map_err(io_err)?;
        file.write_all(encoded.as_bytes()).map_err(io_err)?;
        file.write_all(b"\n").map_err(io_err)?;
        file.persist(&self.path).map_err(|err| io_err(err.error))?;
        Ok(())
    }
}

fn raw_entry(value: Value) -> String {
    match value {
        Value::String(raw) => raw,
        other => other.to_string(),
    }
}

impl PreferenceBackend for FileBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values.insert(key.to_owned(), value.to_owned());
        self.flush()
    }
}

/// View preferences loaded from and saved to a backend.
#[derive(Debug)]
pub struct PreferenceStore<B> {
    backend: B,
    prefs: ViewPreferences,
}

impl<B: PreferenceBackend> PreferenceStore<B> {
    /// Load every field, falling back to its default on absence or parse failure.
    #[must_use]
    pub fn load(backend: B) -> Self {
        let defaults = ViewPreferences::default();
        let prefs = ViewPreferences {
            selected_stores: read(&backend, SELECTED_STORES).unwrap_or(defaults.selected_stores),
            group_by_store: read(&backend, GROUP_BY_STORE).unwrap_or(defaults.group_by_store),
            hide_completed: read(&backend, HIDE_COMPLETED).unwrap_or(defaults.hide_completed),
            expanded_groups: read(&backend, EXPANDED_GROUPS).unwrap_or(defaults.expanded_groups),
        };
        Self { backend, prefs }
    }

    /// Current preferences.
    #[must_use]
    pub const fn preferences(&self) -> &ViewPreferences {
        &self.prefs
    }

    /// Backend the preferences are saved to.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Replace the store filter.
    ///
    /// # Errors
    /// Returns an error when saving fails; the in-memory value still changes.
    pub fn set_selected_stores(&mut self, stores: impl IntoIterator<Item = StoreLabel>) -> Result<(), PreferenceError> {
        self.prefs.selected_stores = stores.into_iter().collect();
        write(&mut self.backend, SELECTED_STORES, &self.prefs.selected_stores)
    }

    /// Flip one store in the filter; returns true when it is now selected.
    ///
    /// # Errors
    /// Returns an error when saving fails; the in-memory value still changes.
    pub fn toggle_store(&mut self, store: StoreLabel) -> Result<bool, PreferenceError> {
        let selected = self.prefs.toggle_store(store);
        write(&mut self.backend, SELECTED_STORES, &self.prefs.selected_stores)?;
        Ok(selected)
    }

    /// Show every store again.
    ///
    /// # Errors
    /// Returns an error when saving fails; the in-memory value still changes.
    pub fn clear_store_filter(&mut self) -> Result<(), PreferenceError> {
        self.set_selected_stores(BTreeSet::new())
    }

    /// Switch between flat and grouped views.
    ///
    /// # Errors
    /// Returns an error when saving fails; the in-memory value still changes.
    pub fn set_group_by_store(&mut self, enabled: bool) -> Result<(), PreferenceError> {
        self.prefs.group_by_store = enabled;
        write(&mut self.backend, GROUP_BY_STORE, &enabled)
    }

    /// Show or hide completed items.
    ///
    /// # Errors
    /// Returns an error when saving fails; the in-memory value still changes.
    pub fn set_hide_completed(&mut self, hidden: bool) -> Result<(), PreferenceError> {
        self.prefs.hide_completed = hidden;
        write(&mut self.backend, HIDE_COMPLETED, &hidden)
    }

    /// Flip the expanded state of a group; returns true when now expanded.
    ///
    /// # Errors
    /// Returns an error when saving fails; the in-memory value still changes.
    pub fn toggle_expanded(&mut self, store: StoreLabel) -> Result<bool, PreferenceError> {
        let expanded = self.prefs.toggle_expanded(store);
        write(&mut self.backend, EXPANDED_GROUPS, &self.prefs.expanded_groups)?;
        Ok(expanded)
    }
}

/// Full backend key of a preference field.
#[must_use]
pub fn key(field: &str) -> String {
    format!("{NAMESPACE}{field}")
}

fn read<B: PreferenceBackend, T: DeserializeOwned>(backend: &B, field: &str) -> Option<T> {
    let key = key(field);
    let raw = backend.get(&key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(%key, error = %err, "ignoring unreadable preference");
            None
        }
    }
}

fn write<B: PreferenceBackend, T: Serialize>(backend: &mut B, field: &str, value: &T) -> Result<(), PreferenceError> {
    let key = key(field);
    let encoded = serde_json::to_string(value).map_err(|source| PreferenceError::Encode {
        key: key.clone(),
        source,
    })?;
    backend.set(&key, &encoded).inspect_err(|err| {
        warn!(%key, error = %err, "failed to save preference");
    })?;
    debug!(%key, "preference saved");
    Ok(())
}
