//! Derivation of the displayed list from the item cache and view preferences.
//!
//! Everything here is a pure function of its inputs and safe to recompute on
//! every cache or preference change.

use std::collections::{BTreeMap, BTreeSet};

use crate::item::{Item, StoreLabel};
use crate::preferences::ViewPreferences;

/// Items of one store within a grouped view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreGroup<'a> {
    /// Normalized store label of the bucket.
    pub store: StoreLabel,
    /// Items in display order.
    pub items: Vec<&'a Item>,
    /// Whether the group is shown un-collapsed.
    pub expanded: bool,
}

impl StoreGroup<'_> {
    /// Number of items still to be checked off.
    #[must_use]
    pub fn incomplete_count(&self) -> usize {
        self.items.iter().filter(|item| !item.completed).count()
    }
}

/// Renderable projection of the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivedView<'a> {
    /// Single ordered list.
    Flat(Vec<&'a Item>),
    /// Buckets ordered by store label.
    Grouped(Vec<StoreGroup<'a>>),
}

impl<'a> DerivedView<'a> {
    /// Total number of items across every group.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Flat(items) => items.len(),
            Self::Grouped(groups) => groups.iter().map(|group| group.items.len()).sum(),
        }
    }

    /// Returns true when nothing is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items in display order, group by group.
    pub fn iter(&self) -> impl Iterator<Item = &'a Item> + '_ {
        let (flat, grouped) = match self {
            Self::Flat(items) => (Some(items.iter().copied()), None),
            Self::Grouped(groups) => (
                None,
                Some(groups.iter().flat_map(|group| group.items.iter().copied())),
            ),
        };
        flat.into_iter().flatten().chain(grouped.into_iter().flatten())
    }
}

/// Compute the view for `items` under `prefs`.
///
/// Filters by store and completion, then stably moves completed items after
/// incomplete ones so each partition keeps its input order, and finally
/// buckets by store when grouping is enabled.
#[must_use]
pub fn derive_view<'a>(items: &'a [Item], prefs: &ViewPreferences) -> DerivedView<'a> {
    let mut visible: Vec<&Item> = items.iter().filter(|item| prefs.admits(item)).collect();
    // sort_by_key is stable.
    visible.sort_by_key(|item| item.completed);

    if !prefs.group_by_store {
        return DerivedView::Flat(visible);
    }

    let mut buckets: BTreeMap<&StoreLabel, Vec<&Item>> = BTreeMap::new();
    for item in visible {
        buckets.entry(&item.store).or_default().push(item);
    }
    let groups = buckets
        .into_iter()
        .map(|(store, items)| StoreGroup {
            expanded: prefs.expanded_groups.contains(store),
            store: store.clone(),
            items,
        })
        .collect();
    DerivedView::Grouped(groups)
}

/// Distinct store labels across the whole, unfiltered collection.
#[must_use]
pub fn store_labels(items: &[Item]) -> BTreeSet<StoreLabel> {
    items.iter().map(|item| item.store.clone()).collect()
}

/// Item count per store across the whole, unfiltered collection.
#[must_use]
pub fn store_counts(items: &[Item]) -> BTreeMap<StoreLabel, usize> {
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item.store.clone()).or_insert(0) += 1;
    }
    counts
}
