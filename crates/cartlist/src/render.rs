//! Plain-text and JSON rendering of derived views.

use std::collections::BTreeMap;

use cartlist_core::{DEFAULT_STORES, DerivedView, Item, StoreLabel, store_emoji};
use serde_json::{Value, json};

pub fn item_line(item: &Item) -> String {
    let mark = if item.completed { "[x]" } else { "[ ]" };
    match item.store.label() {
        Some(label) => format!(
            "{mark} {}  {} {label}  ({})",
            item.name,
            store_emoji(&item.store),
            item.id
        ),
        None => format!("{mark} {}  ({})", item.name, item.id),
    }
}

/// Collapsed groups show only their header.
pub fn view_text(view: &DerivedView<'_>) -> String {
    if view.is_empty() {
        return "No items.\n".to_owned();
    }
    let mut lines = Vec::new();
    match view {
        DerivedView::Flat(items) => lines.extend(items.iter().map(|item| item_line(item))),
        DerivedView::Grouped(groups) => {
            for group in groups {
                let chevron = if group.expanded { "v" } else { ">" };
                lines.push(format!(
                    "{chevron} {} {} ({} of {} left)",
                    store_emoji(&group.store),
                    group.store,
                    group.incomplete_count(),
                    group.items.len()
                ));
                if group.expanded {
                    lines.extend(group.items.iter().map(|item| format!("    {}", item_line(item))));
                }
            }
        }
    }
    lines.push(String::new());
    lines.join("\n")
}

pub fn view_json(view: &DerivedView<'_>) -> Value {
    match view {
        DerivedView::Flat(items) => json!({ "items": items }),
        DerivedView::Grouped(groups) => {
            let groups: Vec<Value> = groups
                .iter()
                .map(|group| {
                    json!({
                        "store": group.store,
                        "expanded": group.expanded,
                        "incomplete": group.incomplete_count(),
                        "items": group.items,
                    })
                })
                .collect();
            json!({ "groups": groups })
        }
    }
}

/// Stores in use with their counts, then suggested stores not yet used.
pub fn stores_text(counts: &BTreeMap<StoreLabel, usize>) -> String {
    let mut lines: Vec<String> = counts
        .iter()
        .map(|(store, count)| format!("{} {store}: {count}", store_emoji(store)))
        .collect();
    let suggested: Vec<&str> = DEFAULT_STORES
        .iter()
        .copied()
        .filter(|name| !counts.contains_key(&StoreLabel::new(name)))
        .collect();
    if !suggested.is_empty() {
        lines.push(format!("suggested: {}", suggested.join(", ")));
    }
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartlist_core::{ItemId, ViewPreferences, derive_view, store_counts};

    fn item(id: &str, name: &str, store: &str, completed: bool) -> Item {
        let id = ItemId::new(id).unwrap_or_else(|err| panic!("must parse id: {err}"));
        let mut item = Item::new(id, "tester", name, StoreLabel::new(store));
        item.completed = completed;
        item
    }

    fn sample() -> Vec<Item> {
        vec![
            item("a", "Milk", "Costco", true),
            item("b", "Eggs", "", false),
            item("c", "Bread", "Costco", false),
        ]
    }

    #[test]
    fn item_line_shows_mark_store_and_id() {
        assert_eq!(
            item_line(&item("a", "Milk", "Costco", true)),
            "[x] Milk  🏪 Costco  (a)"
        );
        assert_eq!(item_line(&item("b", "Eggs", "", false)), "[ ] Eggs  (b)");
    }

    #[test]
    fn flat_text_lists_incomplete_first() {
        let items = sample();
        let text = view_text(&derive_view(&items, &ViewPreferences::default()));
        let names: Vec<&str> = text
            .lines()
            .filter_map(|line| line.get(4..).and_then(|rest| rest.split_whitespace().next()))
            .collect();
        assert_eq!(names, vec!["Eggs", "Bread", "Milk"]);
    }

    #[test]
    fn collapsed_groups_hide_their_items() {
        let items = sample();
        let mut prefs = ViewPreferences {
            group_by_store: true,
            ..ViewPreferences::default()
        };
        prefs.toggle_expanded(StoreLabel::new("Costco"));
        let text = view_text(&derive_view(&items, &prefs));

        assert!(text.contains("> 🛒 No store (1 of 1 left)"));
        assert!(text.contains("v 🏪 Costco (1 of 2 left)"));
        assert!(text.contains("    [ ] Bread"));
        assert!(!text.contains("Eggs"));
    }

    #[test]
    fn empty_view_says_so() {
        let prefs = ViewPreferences {
            hide_completed: true,
            ..ViewPreferences::default()
        };
        let items = vec![item("a", "Milk", "", true)];
        assert_eq!(view_text(&derive_view(&items, &prefs)), "No items.\n");
    }

    #[test]
    fn json_uses_wire_field_names() {
        let items = sample();
        let flat = view_json(&derive_view(&items, &ViewPreferences::default()));
        assert_eq!(flat["items"][0]["itemId"], "b");
        assert_eq!(flat["items"][0]["store"], "");

        let prefs = ViewPreferences {
            group_by_store: true,
            ..ViewPreferences::default()
        };
        let grouped = view_json(&derive_view(&items, &prefs));
        assert_eq!(grouped["groups"][1]["store"], "Costco");
        assert_eq!(grouped["groups"][1]["incomplete"], 1);
    }

    #[test]
    fn stores_text_counts_and_suggests_unused_defaults() {
        let text = stores_text(&store_counts(&sample()));
        assert!(text.contains("🏪 Costco: 2"));
        assert!(text.contains("🛒 No store: 1"));
        assert!(text.contains("suggested: HEB, Whole Foods, Walmart"));
    }
}
