//! Text features for allergen analysis.
//!
//! Provides pure functions that turn raw input into candidate ingredients:
//! - Case-insensitive containment
//! - Manual entry splitting
//! - Food-label filtering of image-labeling output

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Keywords that mark an image label as food-related.
pub const FOOD_KEYWORDS: &[&str] = &[
    "food", "ingredient", "dish", "meal", "fruit", "vegetable", "meat", "dairy",
    "bread", "cake", "cookie", "soup", "salad", "sauce", "spice", "herb",
    "flour", "egg", "milk", "cheese", "butter", "oil", "sugar", "salt",
    "pepper", "rice", "pasta", "noodle", "chicken", "beef", "pork", "fish",
    "shrimp", "nut", "berry", "apple", "banana", "orange", "lemon", "lime",
    "tomato", "onion", "garlic", "potato", "carrot", "lettuce", "spinach",
];

/// Maximum number of labels kept by the default filter.
pub const DEFAULT_MAX_LABELS: usize = 10;

/// Characters that separate ingredients in manual entry.
const MANUAL_SEPARATORS: &[char] = &[',', '|', '\n'];

/// Case-insensitive substring test.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Split free text into ingredients.
///
/// Pieces are separated by commas, pipes, or newlines, trimmed, and empty
/// pieces are dropped.
pub fn split_manual_entry(text: &str) -> Vec<String> {
    text.split(MANUAL_SEPARATORS)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trim labels supplied as a list and drop the blank ones.
pub fn clean_labels<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    labels
        .iter()
        .map(|label| label.as_ref().trim())
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

/// Heuristic filter that reduces image labels to candidate ingredients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodLabelFilter {
    /// Also keep any single-word label longer than 2 characters
    pub admit_single_words: bool,
    /// Labels kept after deduplication
    pub max_labels: usize,
}

impl Default for FoodLabelFilter {
    fn default() -> Self {
        Self {
            admit_single_words: true,
            max_labels: DEFAULT_MAX_LABELS,
        }
    }
}

impl FoodLabelFilter {
    /// Keyword hits only; single words without a keyword are dropped.
    pub fn strict() -> Self {
        Self {
            admit_single_words: false,
            ..Self::default()
        }
    }

    pub fn with_max_labels(mut self, max_labels: usize) -> Self {
        self.max_labels = max_labels;
        self
    }

    /// Whether a single label survives the filter.
    pub fn accepts(&self, label: &str) -> bool {
        has_food_keyword(label) || (self.admit_single_words && is_long_single_word(label))
    }

    /// Filter, deduplicate (first occurrence wins), and truncate.
    pub fn apply<S: AsRef<str>>(&self, labels: &[S]) -> Vec<String> {
        let mut seen = HashSet::new();
        let kept: Vec<String> = labels
            .iter()
            .map(|label| label.as_ref())
            .filter(|label| self.accepts(label))
            .filter(|label| seen.insert(*label))
            .take(self.max_labels)
            .map(str::to_string)
            .collect();

        tracing::debug!(
            raw = labels.len(),
            kept = kept.len(),
            strict = !self.admit_single_words,
            "Filtered image labels"
        );
        kept
    }
}

/// Check whether a label contains any food keyword.
pub fn has_food_keyword(label: &str) -> bool {
    let lower = label.to_lowercase();
    FOOD_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

fn is_long_single_word(label: &str) -> bool {
    !label.contains(' ') && label.chars().count() > 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_contains_ignore_case() {
        assert!(contains_ignore_case("Peanut Butter", "PEANUT"));
        assert!(contains_ignore_case("milk", "MILK"));
        assert!(!contains_ignore_case("rice", "shellfish"));
    }

    #[test]
    fn test_split_manual_entry() {
        assert_eq!(
            split_manual_entry("flour, eggs,,\n  milk \r\nsoy sauce | salt"),
            vec!["flour", "eggs", "milk", "soy sauce", "salt"]
        );
    }

    #[test]
    fn test_split_manual_entry_blank() {
        assert!(split_manual_entry("  ,\n , ").is_empty());
        assert!(split_manual_entry("").is_empty());
    }

    #[test]
    fn test_clean_labels() {
        assert_eq!(
            clean_labels(&["milk", " peanuts ", "", "  "]),
            vec!["milk", "peanuts"]
        );
    }

    #[test]
    fn test_keyword_count() {
        assert_eq!(FOOD_KEYWORDS.len(), 47);
    }

    #[test]
    fn test_strict_filter_keeps_keyword_hits() {
        let labels = ["Dog", "Bread", "Xylophone", "Sauce"];
        assert_eq!(FoodLabelFilter::strict().apply(&labels), vec!["Bread", "Sauce"]);
    }

    #[test]
    fn test_default_filter_admits_single_words() {
        let labels = ["Dog", "Bread", "Xylophone", "Sauce", "Tableware set", "Ox"];
        assert_eq!(
            FoodLabelFilter::default().apply(&labels),
            vec!["Dog", "Bread", "Xylophone", "Sauce"]
        );
    }

    #[test]
    fn test_multi_word_needs_keyword() {
        let filter = FoodLabelFilter::default();
        assert!(filter.accepts("Baked goods with Cheese"));
        assert!(!filter.accepts("Kitchen table"));
    }

    #[test]
    fn test_dedup_then_truncate() {
        let labels: Vec<String> = ["Bread", "Bread", "Cake"]
            .into_iter()
            .map(String::from)
            .chain((0..12).map(|i| format!("Fruit {}", i)))
            .collect();
        let kept = FoodLabelFilter::default().apply(&labels);
        assert_eq!(kept.len(), DEFAULT_MAX_LABELS);
        assert_eq!(kept[0], "Bread");
        assert_eq!(kept[1], "Cake");
        assert_eq!(kept[2], "Fruit 0");
        assert_eq!(kept[9], "Fruit 7");
    }

    #[test]
    fn test_dedup_is_case_sensitive() {
        let kept = FoodLabelFilter::default().apply(&["Bread", "bread"]);
        assert_eq!(kept, vec!["Bread", "bread"]);
    }

    #[test]
    fn test_custom_limit() {
        let kept = FoodLabelFilter::strict()
            .with_max_labels(1)
            .apply(&["Soup", "Salad"]);
        assert_eq!(kept, vec!["Soup"]);
    }
}
