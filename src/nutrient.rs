//! Nutrient identifiers and per-dish nutrient totals

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five tracked nutrient quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nutrient {
    /// Energy in kcal
    Calories,
    /// Total mass in grams
    Mass,
    /// Fat in grams
    Fat,
    /// Carbohydrate in grams
    Carb,
    /// Protein in grams
    Protein,
}

impl Nutrient {
    /// All nutrients in metadata column order (columns 1-5)
    pub const ALL: [Nutrient; 5] = [
        Nutrient::Calories,
        Nutrient::Mass,
        Nutrient::Fat,
        Nutrient::Carb,
        Nutrient::Protein,
    ];

    /// Column name used in every output table
    ///
    /// # Example
    ///
    /// ```
    /// use nutrition_eval::Nutrient;
    ///
    /// assert_eq!(Nutrient::Carb.name(), "carb");
    /// assert_eq!(Nutrient::Calories.name(), "calories");
    /// ```
    pub fn name(&self) -> &'static str {
        match self {
            Nutrient::Calories => "calories",
            Nutrient::Mass => "mass",
            Nutrient::Fat => "fat",
            Nutrient::Carb => "carb",
            Nutrient::Protein => "protein",
        }
    }
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Five nutrient totals for one dish
///
/// Used both for ground truth (from metadata) and for aggregated API estimates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NutrientProfile {
    /// Energy in kcal
    pub calories: f64,
    /// Mass in grams
    pub mass: f64,
    /// Fat in grams
    pub fat: f64,
    /// Carbohydrate in grams
    pub carb: f64,
    /// Protein in grams
    pub protein: f64,
}

impl NutrientProfile {
    /// Value for a single nutrient
    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Calories => self.calories,
            Nutrient::Mass => self.mass,
            Nutrient::Fat => self.fat,
            Nutrient::Carb => self.carb,
            Nutrient::Protein => self.protein,
        }
    }

    /// True when every total is exactly zero
    ///
    /// NaN totals are not zero, so a profile containing NaN is never "empty".
    pub fn is_all_zero(&self) -> bool {
        Nutrient::ALL.iter().all(|&n| self.get(n) == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_all_zero() {
        assert!(NutrientProfile::default().is_all_zero());

        let profile = NutrientProfile {
            mass: 12.0,
            ..Default::default()
        };
        assert!(!profile.is_all_zero());

        let nan = NutrientProfile {
            fat: f64::NAN,
            ..Default::default()
        };
        assert!(!nan.is_all_zero());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Nutrient::Protein).unwrap();
        assert_eq!(json, "\"protein\"");
        let parsed: Nutrient = serde_json::from_str("\"mass\"").unwrap();
        assert_eq!(parsed, Nutrient::Mass);
    }
}
