//! Food-recognition API response model
//!
//! Mirrors the subset of the analysis response the pipeline consumes:
//!
//! ```text
//! {"items": [{"food": [{"confidence": 0.9, "quantity": 100.0,
//!   "food_info": {"nutrition": {"calories_100g": 300.0, "fat_100g": 5.0,
//!                               "carbs_100g": 40.0, "proteins_100g": 15.0}}}]}]}
//! ```
//!
//! Every key defaults to zero or empty when absent; unknown keys are ignored.

use crate::error::EvaluationError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One analysis response for an (angle, dish, condition) image
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Detected regions of the image
    #[serde(default)]
    pub items: Vec<DetectedItem>,
}

/// A detected food region with its ranked candidate matches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectedItem {
    /// Candidate matches for this region
    #[serde(default)]
    pub food: Vec<FoodCandidate>,
}

/// A single candidate food match
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoodCandidate {
    /// Probability that the match is correct, in [0, 1]
    #[serde(default)]
    pub confidence: f64,

    /// Estimated portion in grams
    #[serde(default)]
    pub quantity: f64,

    /// Nutrition information for the matched food
    #[serde(default)]
    pub food_info: FoodInfo,
}

/// Matched food description
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoodInfo {
    /// Per-100g nutrition profile
    #[serde(default)]
    pub nutrition: NutritionPer100g,
}

/// Nutrient values per 100 g of food
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NutritionPer100g {
    /// kcal per 100 g
    #[serde(default)]
    pub calories_100g: f64,
    /// Fat grams per 100 g
    #[serde(default)]
    pub fat_100g: f64,
    /// Carbohydrate grams per 100 g
    #[serde(default)]
    pub carbs_100g: f64,
    /// Protein grams per 100 g
    #[serde(default)]
    pub proteins_100g: f64,
}

impl DetectionResult {
    /// Parse a response from JSON text
    pub fn from_json_str(text: &str, origin: &Path) -> Result<Self, EvaluationError> {
        serde_json::from_str(text).map_err(|e| EvaluationError::MalformedData {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Read a response file
    ///
    /// # Errors
    ///
    /// - `EvaluationError::MissingFile` if `path` does not exist
    /// - `EvaluationError::MalformedData` if the content is not a valid response
    /// - `EvaluationError::Io` for other read failures
    pub fn read(path: &Path) -> Result<Self, EvaluationError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EvaluationError::MissingFile(path.to_path_buf()));
            }
            // Non-UTF-8 content is a data problem, not a filesystem one
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(EvaluationError::MalformedData {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_json_str(&text, path)
    }

    /// Total number of candidate matches across all items
    pub fn candidate_count(&self) -> usize {
        self.items.iter().map(|item| item.food.len()).sum()
    }
}
