//! Core domain model for AllerCheck allergen analysis.
//!
//! This crate defines the fundamental types used throughout the system:
//! - `AllergenMatch`: One (ingredient, allergy) hit produced by the matcher
//! - `MatchType`: Direct or variation match
//! - `AnalysisReport`: The safety verdict returned to callers
//! - `IngredientDetection`: Ingredients obtained from a detection source

use serde::{Deserialize, Serialize};

/// How an allergy label was found inside an ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// The allergy label itself appears in the ingredient
    Direct,
    /// A known variant of the allergy appears in the ingredient
    Variation,
}

impl MatchType {
    /// Wire name of the match type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Variation => "variation",
        }
    }
}

/// A single allergen hit.
///
/// Built only through [`AllergenMatch::direct`] and [`AllergenMatch::variation`],
/// so `variation` is present exactly when `match_type` is `Variation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllergenMatch {
    /// The user's allergy label, verbatim
    pub allergen: String,

    /// The matched ingredient, verbatim
    pub ingredient: String,

    pub match_type: MatchType,

    /// The variant string that matched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation: Option<String>,
}

impl AllergenMatch {
    pub fn direct(allergen: impl Into<String>, ingredient: impl Into<String>) -> Self {
        Self {
            allergen: allergen.into(),
            ingredient: ingredient.into(),
            match_type: MatchType::Direct,
            variation: None,
        }
    }

    pub fn variation(
        allergen: impl Into<String>,
        ingredient: impl Into<String>,
        variation: impl Into<String>,
    ) -> Self {
        Self {
            allergen: allergen.into(),
            ingredient: ingredient.into(),
            match_type: MatchType::Variation,
            variation: Some(variation.into()),
        }
    }
}

/// The result of checking one ingredient list against one set of allergies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Number of ingredients examined
    pub ingredients_checked: usize,

    /// Matches in scan order (ingredient-major, then allergy)
    pub allergens_detected: Vec<AllergenMatch>,

    /// True iff `allergens_detected` is empty
    pub is_safe: bool,

    /// The input ingredients, echoed verbatim
    pub detected_ingredients: Vec<String>,
}

impl AnalysisReport {
    /// Distinct allergy labels that matched, in first-seen order.
    pub fn matched_allergens(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for hit in &self.allergens_detected {
            if !seen.contains(&hit.allergen.as_str()) {
                seen.push(&hit.allergen);
            }
        }
        seen
    }
}

/// Where an ingredient list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSource {
    /// Free text typed by the user
    Manual,
    /// Labels returned by an image-labeling service
    Image,
    /// Ingredients supplied in a request document
    Request,
}

/// Outcome of acquiring ingredients from a detection source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "camelCase")]
pub enum DetectionStatus {
    /// At least one ingredient was obtained
    #[default]
    Detected,
    /// The source answered but nothing food-like survived filtering
    NoFoodLabels,
    /// The source could not be used; no ingredients were produced
    Unavailable {
        reason: String,
    },
}

/// Ingredients obtained from a detection source, before matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientDetection {
    pub source: DetectionSource,

    #[serde(default)]
    pub status: DetectionStatus,

    /// Candidate ingredients handed to the matcher
    #[serde(default)]
    pub ingredients: Vec<String>,

    /// Labels as the source returned them, before filtering
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_labels: Vec<String>,
}

impl IngredientDetection {
    /// Ingredients typed in by hand.
    pub fn manual(ingredients: Vec<String>) -> Self {
        Self {
            source: DetectionSource::Manual,
            status: DetectionStatus::Detected,
            ingredients,
            raw_labels: Vec::new(),
        }
    }

    /// A source that failed; carries no ingredients.
    pub fn unavailable(source: DetectionSource, reason: impl Into<String>) -> Self {
        Self {
            source,
            status: DetectionStatus::Unavailable {
                reason: reason.into(),
            },
            ingredients: Vec::new(),
            raw_labels: Vec::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.status, DetectionStatus::Unavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_match_serialization() {
        let hit = AllergenMatch::direct("milk", "Milk Powder");
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["allergen"], "milk");
        assert_eq!(json["ingredient"], "Milk Powder");
        assert_eq!(json["matchType"], "direct");
        assert!(json.get("variation").is_none());
    }

    #[test]
    fn test_variation_match_serialization() {
        let hit = AllergenMatch::variation("milk", "cheddar cheese", "cheese");
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["matchType"], "variation");
        assert_eq!(json["variation"], "cheese");
    }

    #[test]
    fn test_report_field_names() {
        let report = AnalysisReport {
            ingredients_checked: 1,
            allergens_detected: vec![],
            is_safe: true,
            detected_ingredients: vec!["rice".into()],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["ingredientsChecked"], 1);
        assert_eq!(json["isSafe"], true);
        assert_eq!(json["allergensDetected"], serde_json::json!([]));
        assert_eq!(json["detectedIngredients"], serde_json::json!(["rice"]));
    }

    #[test]
    fn test_matched_allergens_first_seen_order() {
        let report = AnalysisReport {
            ingredients_checked: 2,
            allergens_detected: vec![
                AllergenMatch::direct("peanuts", "peanuts"),
                AllergenMatch::variation("milk", "butter", "butter"),
                AllergenMatch::direct("peanuts", "peanuts oil"),
            ],
            is_safe: false,
            detected_ingredients: vec!["peanuts".into(), "butter".into()],
        };
        assert_eq!(report.matched_allergens(), vec!["peanuts", "milk"]);
    }

    #[test]
    fn test_match_type_names() {
        assert_eq!(MatchType::Direct.as_str(), "direct");
        assert_eq!(MatchType::Variation.as_str(), "variation");
    }

    #[test]
    fn test_detection_status_defaults_to_detected() {
        let detection: IngredientDetection =
            serde_json::from_str(r#"{"source": "manual", "ingredients": ["rice"]}"#).unwrap();
        assert_eq!(detection.status, DetectionStatus::Detected);
        assert_eq!(detection, IngredientDetection::manual(vec!["rice".to_string()]));
    }

    #[test]
    fn test_unavailable_detection_has_no_ingredients() {
        let detection = IngredientDetection::unavailable(DetectionSource::Image, "timeout");
        assert!(!detection.is_available());
        assert!(detection.ingredients.is_empty());
        let json = serde_json::to_value(&detection).unwrap();
        assert_eq!(json["status"]["status"], "unavailable");
        assert_eq!(json["status"]["detail"]["reason"], "timeout");
    }
}
