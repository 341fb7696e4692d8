//! Category color assignment for map markers and the legend.
//!
//! Labels are matched against the embedded `categories.toml` table: an exact
//! match wins, then the first table entry contained in the label, and
//! finally a hue derived from a rolling hash of the label. Unknown labels
//! therefore get a stable color of their own instead of the shared default.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Saturation used for hash-derived colors.
const HASH_SATURATION: u8 = 65;

/// Lightness used for hash-derived colors.
const HASH_LIGHTNESS: u8 = 50;

/// One known category and its display color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryColor {
    /// Lowercase category name.
    pub name: String,
    /// CSS color string.
    pub color: String,
}

#[derive(Debug, Deserialize)]
struct CategoryTable {
    default_color: String,
    category: Vec<CategoryColor>,
}

static TABLE: LazyLock<CategoryTable> = LazyLock::new(|| {
    let mut table: CategoryTable = toml::from_str(include_str!("../categories.toml"))
        .unwrap_or_else(|e| panic!("Failed to parse categories.toml: {e}"));
    for entry in &mut table.category {
        entry.name = entry.name.trim().to_lowercase();
    }
    table
});

/// Color returned for empty or missing labels.
#[must_use]
pub fn default_color() -> &'static str {
    &TABLE.default_color
}

/// Known categories in table order.
#[must_use]
pub fn known_categories() -> &'static [CategoryColor] {
    &TABLE.category
}

/// Resolves the display color for a category label.
#[must_use]
pub fn resolve_color(label: Option<&str>) -> String {
    let normalized = label.map(|l| l.trim().to_lowercase()).unwrap_or_default();
    if normalized.is_empty() {
        return default_color().to_string();
    }

    let table = known_categories();

    if let Some(entry) = table.iter().find(|c| c.name == normalized) {
        return entry.color.clone();
    }

    if let Some(entry) = table.iter().find(|c| normalized.contains(c.name.as_str())) {
        return entry.color.clone();
    }

    hashed_color(&normalized)
}

/// Rolling `hash * 31 + code` over the UTF-16 code units of `label`, with
/// 32-bit wraparound.
#[must_use]
pub fn label_hash(label: &str) -> i32 {
    label.encode_utf16().fold(0i32, |hash, unit| {
        i32::from(unit).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash))
    })
}

/// HSL color whose hue is `|hash| mod 360`.
#[must_use]
pub fn hashed_color(normalized_label: &str) -> String {
    let hue = label_hash(normalized_label).unsigned_abs() % 360;
    format!("hsl({hue}, {HASH_SATURATION}%, {HASH_LIGHTNESS}%)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_loads_with_lowercase_unique_names() {
        let names: Vec<&str> = known_categories().iter().map(|c| c.name.as_str()).collect();
        assert!(!names.is_empty());
        for name in &names {
            assert_eq!(*name, name.to_lowercase());
        }
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len());
    }

    #[test]
    fn every_known_category_resolves_to_its_color() {
        for entry in known_categories() {
            assert_eq!(resolve_color(Some(&entry.name)), entry.color);
        }
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        let tissue = known_categories()
            .iter()
            .find(|c| c.name == "tissue sample")
            .unwrap();
        assert_eq!(resolve_color(Some("Tissue Sample")), tissue.color);
        assert_eq!(resolve_color(Some("  TISSUE SAMPLE ")), tissue.color);
    }

    #[test]
    fn substring_match_uses_first_table_entry() {
        let soil = known_categories().iter().find(|c| c.name == "soil").unwrap();
        assert_eq!(resolve_color(Some("Agricultural soil core")), soil.color);
    }

    #[test]
    fn short_words_inside_longer_labels_do_not_match() {
        for label in ["Hair follicle", "Internal control", "Random extract"] {
            let normalized = label.to_lowercase();
            assert_eq!(resolve_color(Some(label)), hashed_color(&normalized), "{label}");
        }
        let dna = known_categories()
            .iter()
            .find(|c| c.name == "dna extract")
            .unwrap();
        assert_eq!(resolve_color(Some("Plasmid DNA extract")), dna.color);
    }

    #[test]
    fn empty_label_gets_default() {
        assert_eq!(resolve_color(None), default_color());
        assert_eq!(resolve_color(Some("   ")), default_color());
    }

    #[test]
    fn unknown_label_gets_stable_hashed_color() {
        let first = resolve_color(Some("Unknown Exotic Material"));
        assert!(first.starts_with("hsl("));
        assert_ne!(first, default_color());
        assert_eq!(first, resolve_color(Some("Unknown Exotic Material")));
        assert_eq!(first, hashed_color("unknown exotic material"));
    }

    #[test]
    fn rolling_hash_matches_reference_values() {
        assert_eq!(label_hash(""), 0);
        assert_eq!(label_hash("a"), 97);
        assert_eq!(label_hash("ab"), 97 * 31 + 98);
        assert_eq!(hashed_color("ab"), format!("hsl({}, 65%, 50%)", (97 * 31 + 98) % 360));
    }
}
