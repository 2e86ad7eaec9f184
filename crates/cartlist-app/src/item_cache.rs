//! Ordered item cache with an id index.

use std::collections::HashMap;

use cartlist_core::{Item, ItemId};

/// Cached items in display order.
///
/// Every id appears at most once; the index is rebuilt after any change that
/// shifts positions.
#[derive(Debug, Default, Clone)]
pub struct ItemCache {
    items: Vec<Item>,
    index: HashMap<ItemId, usize>,
}

impl ItemCache {
    /// Build a cache from a remote listing, keeping its order.
    ///
    /// When an id repeats, the first occurrence wins.
    #[must_use]
    pub fn from_items(items: Vec<Item>) -> Self {
        let mut cache = Self {
            items: Vec::with_capacity(items.len()),
            index: HashMap::with_capacity(items.len()),
        };
        for item in items {
            if !cache.index.contains_key(&item.id) {
                cache.index.insert(item.id.clone(), cache.items.len());
                cache.items.push(item);
            }
        }
        cache
    }

    /// Items in display order.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Number of cached items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an item by id.
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.index.get(id).and_then(|&idx| self.items.get(idx))
    }

    /// Returns true when `id` is cached.
    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.index.contains_key(id)
    }

    /// Put `item` at the front, replacing any entry with the same id.
    pub fn insert_front(&mut self, item: Item) {
        if let Some(idx) = self.index.get(&item.id).copied() {
            self.items.remove(idx);
        }
        self.items.insert(0, item);
        self.rebuild_index();
    }

    /// Overwrite the entry with the same id in place; returns false if absent.
    pub fn replace(&mut self, item: Item) -> bool {
        match self.index.get(&item.id) {
            Some(&idx) => {
                self.items[idx] = item;
                true
            }
            None => false,
        }
    }

    /// Mutate the entry for `id` in place; returns false if absent.
    pub fn update(&mut self, id: &ItemId, f: impl FnOnce(&mut Item)) -> bool {
        match self.index.get(id) {
            Some(&idx) => {
                f(&mut self.items[idx]);
                true
            }
            None => false,
        }
    }

    /// Remove the entry for `id`, returning it.
    pub fn remove(&mut self, id: &ItemId) -> Option<Item> {
        let idx = self.index.get(id).copied()?;
        let removed = self.items.remove(idx);
        self.rebuild_index();
        Some(removed)
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (idx, item) in self.items.iter().enumerate() {
            self.index.insert(item.id.clone(), idx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartlist_core::StoreLabel;

    fn id(raw: &str) -> ItemId {
        ItemId::new(raw).unwrap_or_else(|err| panic!("must parse item id: {err}"))
    }

    fn item(raw: &str, name: &str) -> Item {
        Item::new(id(raw), "tester", name, StoreLabel::none())
    }

    fn names(cache: &ItemCache) -> Vec<&str> {
        cache.items().iter().map(|item| item.name.as_str()).collect()
    }

    #[test]
    fn from_items_keeps_order_and_first_duplicate() {
        let cache = ItemCache::from_items(vec![item("a", "first"), item("b", "second"), item("a", "dup")]);
        assert_eq!(names(&cache), vec!["first", "second"]);
        assert_eq!(cache.get(&id("a")).map(|i| i.name.as_str()), Some("first"));
    }

    #[test]
    fn insert_front_shifts_index() {
        let mut cache = ItemCache::from_items(vec![item("a", "A"), item("b", "B")]);
        cache.insert_front(item("c", "C"));
        assert_eq!(names(&cache), vec!["C", "A", "B"]);
        assert_eq!(cache.get(&id("b")).map(|i| i.name.as_str()), Some("B"));

        cache.insert_front(item("b", "B2"));
        assert_eq!(names(&cache), vec!["B2", "C", "A"]);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn replace_and_update_only_touch_existing_entries() {
        let mut cache = ItemCache::from_items(vec![item("a", "A")]);
        assert!(cache.replace(item("a", "A2")));
        assert!(!cache.replace(item("z", "Z")));
        assert!(cache.update(&id("a"), |item| item.completed = true));
        assert!(!cache.update(&id("z"), |item| item.completed = true));

        let cached = cache.get(&id("a")).unwrap_or_else(|| panic!("must be cached"));
        assert_eq!(cached.name, "A2");
        assert!(cached.completed);
        assert!(!cache.contains(&id("z")));
    }

    #[test]
    fn remove_reindexes_remaining_items() {
        let mut cache = ItemCache::from_items(vec![item("a", "A"), item("b", "B"), item("c", "C")]);
        assert_eq!(cache.remove(&id("a")).map(|i| i.name), Some("A".to_owned()));
        assert_eq!(cache.remove(&id("a")), None);
        assert_eq!(cache.get(&id("c")).map(|i| i.name.as_str()), Some("C"));
        assert_eq!(names(&cache), vec!["B", "C"]);
        assert!(!cache.is_empty());
    }
}
