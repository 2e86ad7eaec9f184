use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::item::{Item, ItemId, StoreLabel};

/// Error returned when a loosely typed update payload cannot be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// Field outside the mutable set.
    #[error("unknown item field: {0}")]
    UnknownField(String),
    /// Value of the wrong JSON type.
    #[error("invalid value for {field}: expected {expected}")]
    InvalidValue {
        /// Offending field.
        field: &'static str,
        /// Accepted shape.
        expected: &'static str,
    },
    /// Rename to a blank name.
    #[error("item name must not be empty")]
    EmptyName,
}

/// Update payload restricted to the mutable item fields.
///
/// Unset fields are left untouched and are not sent over the wire. Decoding
/// goes through [`ItemPatch::from_fields`], so `"store": null` and
/// `"store": ""` both move the item to "no store".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemPatch {
    /// New completion flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// New display text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New store tag (`""` moves the item to "no store").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreLabel>,
}

impl<'de> Deserialize<'de> for ItemPatch {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields = Map::<String, Value>::deserialize(d)?;
        Self::from_fields(fields).map_err(serde::de::Error::custom)
    }
}

impl ItemPatch {
    /// Patch that only sets the completion flag.
    #[must_use]
    pub const fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            name: None,
            store: None,
        }
    }

    /// Patch that renames the item.
    ///
    /// # Errors
    /// Returns [`PatchError::EmptyName`] when the trimmed name is empty.
    pub fn rename(name: impl AsRef<str>) -> Result<Self, PatchError> {
        let name = normalize_name(name.as_ref())?;
        Ok(Self {
            name: Some(name),
            ..Self::default()
        })
    }

    /// Patch that moves the item to another store.
    #[must_use]
    pub fn move_to(store: StoreLabel) -> Self {
        Self {
            store: Some(store),
            ..Self::default()
        }
    }

    /// Combine two patches, fields set in `other` win.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        if other.completed.is_some() {
            self.completed = other.completed;
        }
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.store.is_some() {
            self.store = other.store;
        }
        self
    }

    /// Parse field/value pairs from an untyped payload.
    ///
    /// # Errors
    /// Rejects fields outside the mutable set and values of the wrong shape.
    pub fn from_fields<I, K>(fields: I) -> Result<Self, PatchError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut patch = Self::default();
        for (key, value) in fields {
            match key.as_ref() {
                "completed" => {
                    let flag = value.as_bool().ok_or(PatchError::InvalidValue {
                        field: "completed",
                        expected: "boolean",
                    })?;
                    patch.completed = Some(flag);
                }
                "name" => {
                    let name = value.as_str().ok_or(PatchError::InvalidValue {
                        field: "name",
                        expected: "string",
                    })?;
                    patch.name = Some(normalize_name(name)?);
                }
                "store" => {
                    let store = match &value {
                        Value::Null => StoreLabel::none(),
                        Value::String(raw) => StoreLabel::new(raw),
                        _ => {
                            return Err(PatchError::InvalidValue {
                                field: "store",
                                expected: "string or null",
                            });
                        }
                    };
                    patch.store = Some(store);
                }
                other => return Err(PatchError::UnknownField(other.to_owned())),
            }
        }
        Ok(patch)
    }

    /// Returns true when the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.completed.is_none() && self.name.is_none() && self.store.is_none()
    }

    /// Check invariants that public construction could have bypassed.
    ///
    /// # Errors
    /// Returns [`PatchError::EmptyName`] for a blank rename.
    pub fn validate(&self) -> Result<(), PatchError> {
        match &self.name {
            Some(name) if name.trim().is_empty() => Err(PatchError::EmptyName),
            _ => Ok(()),
        }
    }

    /// Write the set fields into `item`.
    pub fn apply(&self, item: &mut Item) {
        if let Some(completed) = self.completed {
            item.completed = completed;
        }
        if let Some(name) = &self.name {
            item.name.clone_from(name);
        }
        if let Some(store) = &self.store {
            item.store.clone_from(store);
        }
    }
}

fn normalize_name(raw: &str) -> Result<String, PatchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PatchError::EmptyName);
    }
    Ok(trimmed.to_owned())
}

/// Wire body of the update operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateRequest {
    /// Target item.
    pub item_id: ItemId,
    /// Fields to change.
    pub updates: ItemPatch,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item() -> Item {
        let id = ItemId::new("item_1").unwrap_or_else(|err| panic!("valid id: {err}"));
        Item::new(id, "u1", "Milk", StoreLabel::new("Costco"))
    }

    #[test]
    fn completed_patch_serializes_only_the_changed_field() {
        let value = serde_json::to_value(ItemPatch::completed(true))
            .unwrap_or_else(|err| panic!("encode patch: {err}"));
        assert_eq!(value, json!({"completed": true}));
    }

    #[test]
    fn update_request_matches_wire_shape() {
        let request = UpdateRequest {
            item_id: item().id,
            updates: ItemPatch::completed(false),
        };
        let value =
            serde_json::to_value(&request).unwrap_or_else(|err| panic!("encode request: {err}"));
        assert_eq!(value, json!({"itemId": "item_1", "updates": {"completed": false}}));
    }

    #[test]
    fn unknown_fields_are_rejected_when_decoding() {
        let err = serde_json::from_value::<ItemPatch>(json!({"completed": true, "priority": 3}));
        assert!(err.is_err());
    }

    #[test]
    fn decoded_null_store_moves_to_no_store() {
        let decoded: ItemPatch = serde_json::from_value(json!({"store": null}))
            .unwrap_or_else(|err| panic!("decode patch: {err}"));
        assert_eq!(decoded.store, Some(StoreLabel::none()));
        assert_eq!(
            Ok(decoded),
            ItemPatch::from_fields([("store", Value::Null)])
        );
    }

    #[test]
    fn decoding_applies_the_same_rules_as_from_fields() {
        let decoded: ItemPatch = serde_json::from_value(json!({"name": "  Rye  "}))
            .unwrap_or_else(|err| panic!("decode patch: {err}"));
        assert_eq!(decoded.name.as_deref(), Some("Rye"));
        assert!(serde_json::from_value::<ItemPatch>(json!({"name": " "})).is_err());
        assert!(serde_json::from_value::<ItemPatch>(json!({"completed": "yes"})).is_err());
    }

    #[test]
    fn from_fields_accepts_the_closed_set() {
        let patch = ItemPatch::from_fields([
            ("completed", json!(true)),
            ("name", json!("  Oat milk ")),
            ("store", json!("")),
        ])
        .unwrap_or_else(|err| panic!("parse fields: {err}"));
        assert_eq!(patch.completed, Some(true));
        assert_eq!(patch.name.as_deref(), Some("Oat milk"));
        assert_eq!(patch.store, Some(StoreLabel::none()));
    }

    #[test]
    fn from_fields_rejects_unknown_and_mistyped_values() {
        assert_eq!(
            ItemPatch::from_fields([("userId", json!("someone"))]),
            Err(PatchError::UnknownField("userId".into()))
        );
        assert_eq!(
            ItemPatch::from_fields([("completed", json!("yes"))]),
            Err(PatchError::InvalidValue {
                field: "completed",
                expected: "boolean"
            })
        );
        assert_eq!(
            ItemPatch::from_fields([("name", json!(" "))]),
            Err(PatchError::EmptyName)
        );
    }

    #[test]
    fn apply_touches_only_set_fields() {
        let mut target = item();
        ItemPatch::move_to(StoreLabel::new("Kroger")).apply(&mut target);
        assert_eq!(target.store, StoreLabel::new("Kroger"));
        assert_eq!(target.name, "Milk");
        assert!(!target.completed);
    }

    #[test]
    fn merge_prefers_later_fields() {
        let patch = ItemPatch::completed(true).merge(ItemPatch::completed(false));
        assert_eq!(patch.completed, Some(false));
        assert!(ItemPatch::default().is_empty());
        let rename = ItemPatch::rename("Bread").unwrap_or_else(|err| panic!("rename: {err}"));
        assert!(!ItemPatch::completed(true).merge(rename).is_empty());
    }

    #[test]
    fn validate_catches_blank_names() {
        let patch = ItemPatch {
            name: Some("  ".into()),
            ..ItemPatch::default()
        };
        assert_eq!(patch.validate(), Err(PatchError::EmptyName));
    }
}
