use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;
use uuid::Uuid;

/// Validation failures for item fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    /// Names are trimmed and must not end up empty.
    #[error("item name must not be empty")]
    EmptyName,
    /// Identifiers must contain at least one character.
    #[error("item id must not be empty")]
    EmptyId,
}

/// Identifier of an item, unique within its owner's collection.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ItemId(String);

impl ItemId {
    /// Wrap an existing identifier.
    ///
    /// # Errors
    /// Returns [`ItemError::EmptyId`] when `raw` is empty.
    pub fn new(raw: impl Into<String>) -> Result<Self, ItemError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(ItemError::EmptyId);
        }
        Ok(Self(raw))
    }

    /// Generate a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        // v7 keeps freshly minted ids roughly insertion ordered.
        Self(format!("item_{}", Uuid::now_v7().simple()))
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ItemId {
    type Err = ItemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for ItemId {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Store an item is tagged with.
///
/// Absent, empty and whitespace-only labels all normalize to the same
/// "no store" value, so filtering and grouping never tell them apart.
/// "No store" orders before every named store.
#[derive(Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct StoreLabel(Option<String>);

impl StoreLabel {
    /// Normalize a raw label.
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            Self(None)
        } else {
            Self(Some(trimmed.to_owned()))
        }
    }

    /// The canonical "no store" label.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// Returns true for the "no store" label.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Label text, `None` for "no store".
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Wire form: the label text, or `""` for "no store".
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_deref().unwrap_or("")
    }
}

impl From<Option<&str>> for StoreLabel {
    fn from(value: Option<&str>) -> Self {
        value.map_or_else(Self::none, Self::new)
    }
}

impl fmt::Display for StoreLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label().unwrap_or("No store"))
    }
}

impl Serialize for StoreLabel {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StoreLabel {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.map(Self::new).unwrap_or_default())
    }
}

/// A checklist entry as stored in the remote collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Identifier, unique per owner.
    #[serde(rename = "itemId")]
    pub id: ItemId,
    /// User the item belongs to.
    #[serde(rename = "userId", default)]
    pub owner: String,
    /// Display text.
    pub name: String,
    /// Optional store tag.
    #[serde(default)]
    pub store: StoreLabel,
    /// Whether the entry has been checked off.
    #[serde(default)]
    pub completed: bool,
}

impl Item {
    /// Build an incomplete item.
    #[must_use]
    pub fn new(id: ItemId, owner: impl Into<String>, name: impl Into<String>, store: StoreLabel) -> Self {
        Self {
            id,
            owner: owner.into(),
            name: name.into(),
            store,
            completed: false,
        }
    }
}

/// Candidate item submitted to the create operation.
///
/// Serializes to the create payload `{"action":"add","name":..,"store":..}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    name: String,
    store: StoreLabel,
}

impl NewItem {
    /// Validate and normalize a candidate.
    ///
    /// # Errors
    /// Returns [`ItemError::EmptyName`] when the trimmed name is empty.
    pub fn new(name: impl AsRef<str>, store: StoreLabel) -> Result<Self, ItemError> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(ItemError::EmptyName);
        }
        Ok(Self {
            name: name.to_owned(),
            store,
        })
    }

    /// Trimmed display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized store label.
    #[must_use]
    pub const fn store(&self) -> &StoreLabel {
        &self.store
    }

    /// Materialize the candidate with an assigned id and owner.
    #[must_use]
    pub fn into_item(self, id: ItemId, owner: impl Into<String>) -> Item {
        Item::new(id, owner, self.name, self.store)
    }
}

#[derive(Serialize)]
struct CreatePayload<'a> {
    action: &'static str,
    name: &'a str,
    store: &'a StoreLabel,
}

impl Serialize for NewItem {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        CreatePayload {
            action: "add",
            name: &self.name,
            store: &self.store,
        }
        .serialize(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok<T, E: fmt::Display>(result: Result<T, E>, context: &str) -> T {
        result.unwrap_or_else(|err| panic!("{context}: {err}"))
    }

    #[test]
    fn generated_ids_are_unique_and_prefixed() {
        let first = ItemId::generate();
        let second = ItemId::generate();
        assert_ne!(first, second);
        assert!(first.as_str().starts_with("item_"));
    }

    #[test]
    fn empty_id_is_rejected() {
        assert_eq!(ItemId::new(""), Err(ItemError::EmptyId));
        assert!(serde_json::from_value::<ItemId>(json!("")).is_err());
    }

    #[test]
    fn empty_and_missing_store_normalize_identically() {
        assert_eq!(StoreLabel::new(""), StoreLabel::none());
        assert_eq!(StoreLabel::new("   "), StoreLabel::none());
        assert_eq!(StoreLabel::from(None::<&str>), StoreLabel::none());
        assert_eq!(StoreLabel::new(" Costco "), StoreLabel::new("Costco"));
    }

    #[test]
    fn no_store_sorts_first() {
        let mut labels = vec![
            StoreLabel::new("Kroger"),
            StoreLabel::none(),
            StoreLabel::new("Costco"),
        ];
        labels.sort();
        assert_eq!(
            labels,
            vec![
                StoreLabel::none(),
                StoreLabel::new("Costco"),
                StoreLabel::new("Kroger")
            ]
        );
    }

    #[test]
    fn item_decodes_wire_shape_with_missing_store() {
        let item: Item = ok(
            serde_json::from_value(json!({
                "userId": "u1",
                "itemId": "item_1",
                "name": "Milk",
                "completed": true
            })),
            "decode item",
        );
        assert_eq!(item.id.as_str(), "item_1");
        assert_eq!(item.owner, "u1");
        assert!(item.store.is_none());
        assert!(item.completed);

        let with_null: Item = ok(
            serde_json::from_value(json!({
                "userId": "u1",
                "itemId": "item_2",
                "name": "Eggs",
                "store": null
            })),
            "decode item with null store",
        );
        assert_eq!(with_null.store, StoreLabel::none());
        assert!(!with_null.completed);
    }

    #[test]
    fn item_encodes_no_store_as_empty_string() {
        let item = Item::new(ok(ItemId::new("item_1"), "id"), "u1", "Milk", StoreLabel::none());
        let value = ok(serde_json::to_value(&item), "encode item");
        assert_eq!(
            value,
            json!({"itemId": "item_1", "userId": "u1", "name": "Milk", "store": "", "completed": false})
        );
    }

    #[test]
    fn new_item_trims_and_rejects_blank_names() {
        let candidate = ok(NewItem::new("  Milk ", StoreLabel::new("Costco")), "candidate");
        assert_eq!(candidate.name(), "Milk");
        assert_eq!(NewItem::new("   ", StoreLabel::none()), Err(ItemError::EmptyName));
    }

    #[test]
    fn new_item_serializes_create_payload() {
        let candidate = ok(NewItem::new("Milk", StoreLabel::new("Costco")), "candidate");
        let value = ok(serde_json::to_value(&candidate), "encode payload");
        assert_eq!(value, json!({"action": "add", "name": "Milk", "store": "Costco"}));
    }
}
