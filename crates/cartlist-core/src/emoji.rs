use crate::item::StoreLabel;

/// Store labels offered as suggestions when adding an item.
pub const DEFAULT_STORES: [&str; 4] = ["Costco", "HEB", "Whole Foods", "Walmart"];

const FALLBACK: &str = "🛒";

const STORE_EMOJI: &[(&str, &str)] = &[
    ("costco", "🏪"),
    ("heb", "❤️"),
    ("h-e-b", "❤️"),
    ("whole foods", "🥬"),
    ("wholefoods", "🥬"),
    ("walmart", "🛒"),
    ("kroger", "🛒"),
    ("target", "🎯"),
    ("aldi", "🏷️"),
    ("trader joe's", "🌻"),
    ("trader joes", "🌻"),
    ("safeway", "🛒"),
    ("publix", "🛒"),
    ("wegmans", "🛒"),
    ("sprouts", "🌱"),
    ("amazon", "📦"),
    ("amazon fresh", "📦"),
];

/// Glyph shown next to a store; unknown stores and "no store" get a cart.
#[must_use]
pub fn store_emoji(store: &StoreLabel) -> &'static str {
    let Some(label) = store.label() else {
        return FALLBACK;
    };
    let normalized = label.to_lowercase();
    STORE_EMOJI
        .iter()
        .find(|(name, _)| *name == normalized)
        .map_or(FALLBACK, |&(_, emoji)| emoji)
}
