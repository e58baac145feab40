//! Report building and presentation for allergen analysis.
//!
//! Aggregates matcher output into an `AnalysisReport` and converts it into
//! human-readable text for the CLI and other display layers.

use allercheck_model::{AllergenMatch, AnalysisReport, IngredientDetection, MatchType};
use serde::{Deserialize, Serialize};

/// Build the final report from the checked ingredients and their matches.
///
/// Ingredients are echoed verbatim and matches keep their scan order.
pub fn build_report(ingredients: &[String], matches: Vec<AllergenMatch>) -> AnalysisReport {
    AnalysisReport {
        ingredients_checked: ingredients.len(),
        is_safe: matches.is_empty(),
        allergens_detected: matches,
        detected_ingredients: ingredients.to_vec(),
    }
}

/// A structured explanation for a single match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    /// Short summary (1 line)
    pub summary: String,

    /// Detailed explanation
    pub detail: String,
}

/// Explain why an ingredient was flagged.
pub fn explain_match(hit: &AllergenMatch) -> Explanation {
    match (hit.match_type, hit.variation.as_deref()) {
        (MatchType::Variation, Some(variation)) => Explanation {
            summary: format!("Contains {} (via '{}')", hit.allergen, variation),
            detail: format!(
                "The ingredient '{}' contains '{}', a known form of {}.",
                hit.ingredient, variation, hit.allergen
            ),
        },
        _ => Explanation {
            summary: format!("Contains {}", hit.allergen),
            detail: format!(
                "The ingredient '{}' names {} directly.",
                hit.ingredient, hit.allergen
            ),
        },
    }
}

/// One-line verdict for a report.
pub fn summarize_report(report: &AnalysisReport) -> String {
    if report.is_safe {
        return format!(
            "SAFE: no allergens found in {} ingredient(s)",
            report.ingredients_checked
        );
    }

    format!(
        "WARNING: {} potential allergen match(es): {}",
        report.allergens_detected.len(),
        report.matched_allergens().join(", ")
    )
}

/// Response wrapper handed to display and persistence layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisEnvelope {
    pub success: bool,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AnalysisReport>,

    /// How the ingredients were obtained, for image analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection: Option<IngredientDetection>,
}

impl AnalysisEnvelope {
    pub fn completed(report: AnalysisReport) -> Self {
        Self {
            success: true,
            message: "Analysis completed successfully".to_string(),
            data: Some(report),
            detection: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            detection: None,
        }
    }

    pub fn with_detection(mut self, detection: IngredientDetection) -> Self {
        self.detection = Some(detection);
        self
    }
}
