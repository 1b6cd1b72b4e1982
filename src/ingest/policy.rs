//! Candidate selection policies
//!
//! A detection lists several candidate foods per item. Two historically distinct rules
//! turn those candidates into one set of nutrient totals, and they disagree whenever an
//! item carries more than one confident candidate or only low-confidence ones:
//!
//! - [`AggregationPolicy::ThresholdSum`] adds every candidate above the confidence
//!   threshold, so an item with two confident candidates is counted twice, and an item
//!   whose candidates all fall below the threshold contributes nothing.
//! - [`AggregationPolicy::MaxConfidencePerItem`] adds exactly one candidate per item
//!   (the most confident), whatever its confidence.

use crate::io::detection::{DetectionResult, FoodCandidate};
use crate::nutrient::NutrientProfile;
use serde::{Deserialize, Serialize};

/// Rule for aggregating candidate matches into nutrient totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// Sum every candidate whose confidence is strictly above the threshold
    ThresholdSum,
    /// Per item, use only the highest-confidence candidate (first one on ties)
    MaxConfidencePerItem,
}

impl AggregationPolicy {
    /// Aggregate a detection into nutrient totals
    ///
    /// # Arguments
    ///
    /// * `detection` - Parsed API response
    /// * `confidence_threshold` - Strict lower bound used by `ThresholdSum`
    ///
    /// # Returns
    ///
    /// `None` when no candidate contributed (all five totals exactly zero), so that
    /// "nothing detected" is never reported as "detected zero".
    ///
    /// # Example
    ///
    /// ```
    /// use nutrition_eval::ingest::policy::AggregationPolicy;
    /// use nutrition_eval::io::detection::DetectionResult;
    /// use std::path::Path;
    ///
    /// let json = r#"{"items": [{"food": [{"confidence": 0.9, "quantity": 100,
    ///     "food_info": {"nutrition": {"calories_100g": 300}}}]}]}"#;
    /// let detection = DetectionResult::from_json_str(json, Path::new("rgb.json")).unwrap();
    ///
    /// let totals = AggregationPolicy::ThresholdSum.aggregate(&detection, 0.5).unwrap();
    /// assert_eq!(totals.calories, 300.0);
    /// assert_eq!(totals.mass, 100.0);
    /// ```
    pub fn aggregate(
        &self,
        detection: &DetectionResult,
        confidence_threshold: f64,
    ) -> Option<NutrientProfile> {
        let mut totals = NutrientProfile::default();

        match self {
            AggregationPolicy::ThresholdSum => {
                for candidate in detection.items.iter().flat_map(|item| item.food.iter()) {
                    if candidate.confidence > confidence_threshold {
                        accumulate(&mut totals, candidate);
                    }
                }
            }
            AggregationPolicy::MaxConfidencePerItem => {
                for item in &detection.items {
                    let mut best: Option<&FoodCandidate> = None;
                    for candidate in &item.food {
                        match best {
                            Some(current) if candidate.confidence <= current.confidence => {}
                            _ => best = Some(candidate),
                        }
                    }
                    if let Some(candidate) = best {
                        accumulate(&mut totals, candidate);
                    }
                }
            }
        }

        if totals.is_all_zero() {
            None
        } else {
            Some(totals)
        }
    }
}

/// Add one candidate's contribution: per-100g values scaled by quantity, mass as quantity
fn accumulate(totals: &mut NutrientProfile, candidate: &FoodCandidate) {
    let nutrition = &candidate.food_info.nutrition;
    let quantity = candidate.quantity;
    totals.calories += nutrition.calories_100g * quantity / 100.0;
    totals.mass += quantity;
    totals.fat += nutrition.fat_100g * quantity / 100.0;
    totals.carb += nutrition.carbs_100g * quantity / 100.0;
    totals.protein += nutrition.proteins_100g * quantity / 100.0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn detection(json: &str) -> DetectionResult {
        DetectionResult::from_json_str(json, Path::new("test.json")).unwrap()
    }

    fn candidate(confidence: f64, quantity: f64, calories: f64, fat: f64) -> String {
        format!(
            r#"{{"confidence": {}, "quantity": {}, "food_info": {{"nutrition":
                {{"calories_100g": {}, "fat_100g": {}, "carbs_100g": 10, "proteins_100g": 2}}}}}}"#,
            confidence, quantity, calories, fat
        )
    }

    #[test]
    fn test_threshold_sum_worked_example() {
        let json = r#"{"items": [{"food": [{"confidence": 0.9, "quantity": 100,
            "food_info": {"nutrition": {"calories_100g": 300, "fat_100g": 5,
            "carbs_100g": 40, "proteins_100g": 15}}}]}]}"#;
        let totals = AggregationPolicy::ThresholdSum
            .aggregate(&detection(json), 0.5)
            .unwrap();
        assert_eq!(totals.calories, 300.0);
        assert_eq!(totals.mass, 100.0);
        assert_eq!(totals.fat, 5.0);
        assert_eq!(totals.carb, 40.0);
        assert_eq!(totals.protein, 15.0);
    }

    #[test]
    fn test_low_confidence_only_yields_none() {
        let json = format!(r#"{{"items": [{{"food": [{}]}}]}}"#, candidate(0.4, 150.0, 200.0, 3.0));
        assert_eq!(AggregationPolicy::ThresholdSum.aggregate(&detection(&json), 0.5), None);
    }

    #[test]
    fn test_threshold_is_strict() {
        let json = format!(r#"{{"items": [{{"food": [{}]}}]}}"#, candidate(0.5, 150.0, 200.0, 3.0));
        assert_eq!(AggregationPolicy::ThresholdSum.aggregate(&detection(&json), 0.5), None);
    }

    #[test]
    fn test_empty_detection_yields_none() {
        for policy in [AggregationPolicy::ThresholdSum, AggregationPolicy::MaxConfidencePerItem] {
            assert_eq!(policy.aggregate(&detection(r#"{"items": []}"#), 0.5), None);
            assert_eq!(policy.aggregate(&detection(r#"{"items": [{"food": []}]}"#), 0.5), None);
        }
    }

    #[test]
    fn test_zero_quantity_candidate_yields_none() {
        let json = format!(r#"{{"items": [{{"food": [{}]}}]}}"#, candidate(0.9, 0.0, 200.0, 3.0));
        assert_eq!(AggregationPolicy::ThresholdSum.aggregate(&detection(&json), 0.5), None);
    }

    #[test]
    fn test_policies_diverge_on_multiple_confident_candidates() {
        // One item, two confident candidates: threshold-sum counts both
        let json = format!(
            r#"{{"items": [{{"food": [{}, {}]}}]}}"#,
            candidate(0.6, 100.0, 100.0, 1.0),
            candidate(0.8, 50.0, 400.0, 10.0)
        );
        let d = detection(&json);

        let summed = AggregationPolicy::ThresholdSum.aggregate(&d, 0.5).unwrap();
        assert_eq!(summed.mass, 150.0);
        assert_eq!(summed.calories, 100.0 + 200.0);

        let best = AggregationPolicy::MaxConfidencePerItem.aggregate(&d, 0.5).unwrap();
        assert_eq!(best.mass, 50.0);
        assert_eq!(best.calories, 200.0);
        assert_eq!(best.fat, 5.0);
    }

    #[test]
    fn test_max_confidence_ignores_threshold() {
        let json = format!(
            r#"{{"items": [{{"food": [{}, {}]}}, {{"food": [{}]}}]}}"#,
            candidate(0.2, 100.0, 100.0, 1.0),
            candidate(0.3, 80.0, 50.0, 1.0),
            candidate(0.1, 20.0, 500.0, 1.0)
        );
        let totals = AggregationPolicy::MaxConfidencePerItem
            .aggregate(&detection(&json), 0.5)
            .unwrap();
        assert_eq!(totals.mass, 100.0);
        assert_eq!(totals.calories, 40.0 + 100.0);
    }

    #[test]
    fn test_max_confidence_tie_takes_first() {
        let json = format!(
            r#"{{"items": [{{"food": [{}, {}]}}]}}"#,
            candidate(0.7, 100.0, 100.0, 1.0),
            candidate(0.7, 200.0, 100.0, 1.0)
        );
        let totals = AggregationPolicy::MaxConfidencePerItem
            .aggregate(&detection(&json), 0.5)
            .unwrap();
        assert_eq!(totals.mass, 100.0);
    }

    #[test]
    fn test_serde_names() {
        let parsed: AggregationPolicy = serde_json::from_str("\"threshold_sum\"").unwrap();
        assert_eq!(parsed, AggregationPolicy::ThresholdSum);
    }
}
