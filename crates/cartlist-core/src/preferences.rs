use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::item::{Item, StoreLabel};

/// User-selected view settings; independent of any single item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewPreferences {
    /// Inclusion filter; empty means every store.
    pub selected_stores: BTreeSet<StoreLabel>,
    /// Bucket the view by store instead of showing one flat list.
    pub group_by_store: bool,
    /// Drop completed items from the view.
    pub hide_completed: bool,
    /// Groups currently shown un-collapsed.
    pub expanded_groups: BTreeSet<StoreLabel>,
}

impl ViewPreferences {
    /// Flip membership of `store` in the store filter; returns true when now selected.
    pub fn toggle_store(&mut self, store: StoreLabel) -> bool {
        toggle_member(&mut self.selected_stores, store)
    }

    /// Flip the expanded state of a group; returns true when now expanded.
    pub fn toggle_expanded(&mut self, store: StoreLabel) -> bool {
        toggle_member(&mut self.expanded_groups, store)
    }

    /// Returns true when the store filter is active.
    #[must_use]
    pub fn filters_stores(&self) -> bool {
        !self.selected_stores.is_empty()
    }

    /// Whether `item` passes the store and completion filters.
    #[must_use]
    pub fn admits(&self, item: &Item) -> bool {
        if self.filters_stores() && !self.selected_stores.contains(&item.store) {
            return false;
        }
        !(self.hide_completed && item.completed)
    }
}

fn toggle_member(set: &mut BTreeSet<StoreLabel>, store: StoreLabel) -> bool {
    if set.remove(&store) {
        false
    } else {
        set.insert(store);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemId;

    fn item(store: &str, completed: bool) -> Item {
        let id = ItemId::new("item_1").unwrap_or_else(|err| panic!("valid id: {err}"));
        let mut item = Item::new(id, "u1", "Milk", StoreLabel::new(store));
        item.completed = completed;
        item
    }

    #[test]
    fn defaults_admit_everything() {
        let prefs = ViewPreferences::default();
        assert!(prefs.admits(&item("Costco", true)));
        assert!(prefs.admits(&item("", false)));
    }

    #[test]
    fn toggle_store_adds_then_removes() {
        let mut prefs = ViewPreferences::default();
        assert!(prefs.toggle_store(StoreLabel::new("Costco")));
        assert!(prefs.filters_stores());
        assert!(!prefs.toggle_store(StoreLabel::new(" Costco")));
        assert!(!prefs.filters_stores());
    }

    #[test]
    fn no_store_can_be_selected() {
        let mut prefs = ViewPreferences::default();
        prefs.toggle_store(StoreLabel::none());
        assert!(prefs.admits(&item("", false)));
        assert!(!prefs.admits(&item("Costco", false)));
    }

    #[test]
    fn hide_completed_drops_checked_items() {
        let prefs = ViewPreferences {
            hide_completed: true,
            ..ViewPreferences::default()
        };
        assert!(!prefs.admits(&item("Costco", true)));
        assert!(prefs.admits(&item("Costco", false)));
    }
}
