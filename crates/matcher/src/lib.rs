//! Allergen matching.
//!
//! Scans every ingredient against every user allergy: a direct substring hit
//! on the allergy label first, then the first matching variant from the
//! reference table. This is the only implementation of the algorithm; all
//! front ends call [`analyze`].

use allercheck_allergens::AllergenVariantTable;
use allercheck_features::contains_ignore_case;
use allercheck_model::{AllergenMatch, AnalysisReport};
use allercheck_report::build_report;

/// Classify every (ingredient, allergy) pair.
///
/// Ingredients are the outer loop and allergies the inner loop, so matches come
/// out ingredient-major. A direct hit skips the variant scan for that pair only.
/// Matches are not deduplicated.
pub fn match_allergens<I, A>(
    ingredients: &[I],
    user_allergies: &[A],
    table: &AllergenVariantTable,
) -> Vec<AllergenMatch>
where
    I: AsRef<str>,
    A: AsRef<str>,
{
    let allergies: Vec<&str> = user_allergies
        .iter()
        .map(|a| a.as_ref())
        .filter(|label| {
            let keep = !label.trim().is_empty();
            if !keep {
                tracing::debug!("Skipping blank allergy label");
            }
            keep
        })
        .collect();

    let mut matches = Vec::new();

    for ingredient in ingredients.iter().map(|i| i.as_ref()) {
        for &allergy in &allergies {
            if let Some(hit) = match_pair(ingredient, allergy, table) {
                matches.push(hit);
            }
        }
    }

    tracing::debug!(
        ingredients = ingredients.len(),
        allergies = allergies.len(),
        matches = matches.len(),
        "Matched allergens"
    );

    matches
}

/// Check one ingredient against one allergy label.
fn match_pair(
    ingredient: &str,
    allergy: &str,
    table: &AllergenVariantTable,
) -> Option<AllergenMatch> {
    // Direct match on the label itself
    if contains_ignore_case(ingredient, allergy) {
        return Some(AllergenMatch::direct(allergy, ingredient));
    }

    // First variant that appears wins
    table
        .lookup_variants(allergy)?
        .iter()
        .find(|variant| contains_ignore_case(ingredient, variant))
        .map(|variant| AllergenMatch::variation(allergy, ingredient, variant.as_str()))
}

/// Match and build the report in one call.
pub fn analyze<A: AsRef<str>>(
    ingredients: &[String],
    user_allergies: &[A],
    table: &AllergenVariantTable,
) -> AnalysisReport {
    let matches = match_allergens(ingredients, user_allergies, table);
    build_report(ingredients, matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use allercheck_allergens::AllergenEntry;
    use allercheck_model::MatchType;
    use pretty_assertions::assert_eq;

    fn builtin() -> &'static AllergenVariantTable {
        AllergenVariantTable::builtin()
    }

    #[test]
    fn test_direct_match_short_circuits_variants() {
        let hits = match_allergens(&["peanut butter"], &["peanut"], builtin());
        assert_eq!(hits, vec![AllergenMatch::direct("peanut", "peanut butter")]);
    }

    #[test]
    fn test_variation_match() {
        let hits = match_allergens(&["cheddar cheese"], &["milk"], builtin());
        assert_eq!(
            hits,
            vec![AllergenMatch::variation("milk", "cheddar cheese", "cheese")]
        );
    }

    #[test]
    fn test_first_variant_wins() {
        // "cream cheese" hits both "cheese" and "cream"; "cheese" is declared first
        let hits = match_allergens(&["cream cheese"], &["milk"], builtin());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].variation.as_deref(), Some("cheese"));
    }

    #[test]
    fn test_no_match() {
        assert!(match_allergens(&["rice"], &["shellfish"], builtin()).is_empty());
    }

    #[test]
    fn test_case_insensitive_both_ways() {
        let upper_ingredient = match_allergens(&["MILK"], &["milk"], builtin());
        let upper_allergy = match_allergens(&["milk"], &["MILK"], builtin());
        assert_eq!(upper_ingredient.len(), 1);
        assert_eq!(upper_ingredient[0].match_type, MatchType::Direct);
        assert_eq!(upper_allergy, vec![AllergenMatch::direct("MILK", "milk")]);
    }

    #[test]
    fn test_uppercase_label_uses_table() {
        let hits = match_allergens(&["Whey Protein"], &["Milk"], builtin());
        assert_eq!(
            hits,
            vec![AllergenMatch::variation("Milk", "Whey Protein", "whey")]
        );
    }

    #[test]
    fn test_unknown_label_direct_only() {
        let hits = match_allergens(&["kiwi slices", "apple"], &["kiwi"], builtin());
        assert_eq!(hits, vec![AllergenMatch::direct("kiwi", "kiwi slices")]);
        assert!(match_allergens(&["apple"], &["kiwi"], builtin()).is_empty());
    }

    #[test]
    fn test_same_ingredient_multiple_allergies() {
        let hits = match_allergens(&["peanut butter"], &["peanuts", "milk"], builtin());
        assert_eq!(
            hits,
            vec![
                AllergenMatch::variation("peanuts", "peanut butter", "peanut"),
                AllergenMatch::variation("milk", "peanut butter", "butter"),
            ]
        );
    }

    #[test]
    fn test_direct_hit_does_not_block_other_allergy_variants() {
        let hits = match_allergens(&["peanut butter"], &["peanut", "milk"], builtin());
        assert_eq!(
            hits,
            vec![
                AllergenMatch::direct("peanut", "peanut butter"),
                AllergenMatch::variation("milk", "peanut butter", "butter"),
            ]
        );
    }

    #[test]
    fn test_blank_label_skipped() {
        assert!(match_allergens(&["rice"], &["", "  "], builtin()).is_empty());
    }

    #[test]
    fn test_custom_table() {
        let table =
            AllergenVariantTable::from_entries(vec![AllergenEntry::new("kiwi", ["actinidia"])])
                .unwrap();
        let hits = match_allergens(&["Actinidia extract"], &["kiwi"], &table);
        assert_eq!(
            hits,
            vec![AllergenMatch::variation("kiwi", "Actinidia extract", "actinidia")]
        );
    }

    #[test]
    fn test_analyze_builds_report() {
        let ingredients = vec!["flour".to_string(), "sugar".to_string()];
        let report = analyze(&ingredients, &["wheat"], builtin());
        assert_eq!(report.ingredients_checked, 2);
        assert!(!report.is_safe);
        assert_eq!(
            report.allergens_detected,
            vec![AllergenMatch::variation("wheat", "flour", "flour")]
        );
        assert_eq!(report.detected_ingredients, ingredients);
    }
}
