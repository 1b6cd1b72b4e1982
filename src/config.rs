//! Configuration parameters for the evaluation pipeline

use crate::dataset::join::JoinMode;
use crate::error::EvaluationError;
use crate::ingest::policy::AggregationPolicy;
use crate::nutrient::Nutrient;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Evaluation configuration parameters
///
/// Every stage receives this structure instead of relying on a fixed taxonomy, so the
/// angle and condition lists can change per run. Any subset of fields can be supplied
/// from a JSON file; missing fields keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    // Taxonomy
    /// Camera angles, i.e. first-level directories of the results root
    /// (default: overhead, side_angle)
    pub angles: Vec<String>,

    /// Image conditions, i.e. JSON file stems inside each dish directory
    /// (default: rgb plus six brightness/contrast/saturation shifts)
    pub conditions: Vec<String>,

    /// Nutrients to report, in output column order (default: all five)
    pub nutrients: Vec<Nutrient>,

    /// Unperturbed condition used as the comparison base (default: "rgb")
    pub baseline_condition: String,

    // Ingestion
    /// How candidate matches are turned into nutrient totals (default: ThresholdSum)
    pub aggregation_policy: AggregationPolicy,

    /// Candidates must have confidence strictly above this value to count under
    /// `ThresholdSum` (default: 0.5)
    pub confidence_threshold: f64,

    // Assembly
    /// Join semantics for metadata and per-angle results (default: Inner)
    pub join_mode: JoinMode,

    // Metrics
    /// Relative error below which a prediction counts as close (default: 0.2)
    pub relative_error_threshold: f64,

    // Statistical tests
    /// Minimum paired observations for the t-test (default: 2)
    pub min_t_test_samples: usize,

    /// Minimum paired observations for the signed-rank test (default: 10)
    pub min_rank_test_samples: usize,

    /// Run the signed-rank test in addition to the t-test (default: true)
    pub enable_rank_test: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            angles: vec!["overhead".to_string(), "side_angle".to_string()],
            conditions: [
                "rgb",
                "rgb_brightness_minus",
                "rgb_brightness_plus",
                "rgb_contrast_minus",
                "rgb_contrast_plus",
                "rgb_saturation_minus",
                "rgb_saturation_plus",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            nutrients: Nutrient::ALL.to_vec(),
            baseline_condition: "rgb".to_string(),
            aggregation_policy: AggregationPolicy::ThresholdSum,
            confidence_threshold: 0.5,
            join_mode: JoinMode::Inner,
            relative_error_threshold: 0.2,
            min_t_test_samples: 2,
            min_rank_test_samples: 10,
            enable_rank_test: true,
        }
    }
}

impl EvaluationConfig {
    /// Load a configuration from a JSON file, filling unspecified fields with defaults
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError::Io` if the file cannot be read and
    /// `EvaluationError::InvalidConfig` if it does not parse or fails validation.
    pub fn from_json_file(path: &Path) -> Result<Self, EvaluationError> {
        let text = std::fs::read_to_string(path)?;
        let config: EvaluationConfig = serde_json::from_str(&text).map_err(|e| {
            EvaluationError::InvalidConfig(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check the configuration for internal consistency
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError::InvalidConfig` describing the first problem found.
    pub fn validate(&self) -> Result<(), EvaluationError> {
        if self.angles.is_empty() {
            return Err(EvaluationError::InvalidConfig("no angles configured".to_string()));
        }
        if self.conditions.is_empty() {
            return Err(EvaluationError::InvalidConfig("no conditions configured".to_string()));
        }
        if self.nutrients.is_empty() {
            return Err(EvaluationError::InvalidConfig("no nutrients configured".to_string()));
        }
        check_unique("angle", &self.angles)?;
        check_unique("condition", &self.conditions)?;

        let mut seen = HashSet::new();
        for nutrient in &self.nutrients {
            if !seen.insert(*nutrient) {
                return Err(EvaluationError::InvalidConfig(format!(
                    "duplicate nutrient '{}'",
                    nutrient
                )));
            }
        }

        if !self.conditions.contains(&self.baseline_condition) {
            return Err(EvaluationError::InvalidConfig(format!(
                "baseline condition '{}' is not among the configured conditions",
                self.baseline_condition
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(EvaluationError::InvalidConfig(format!(
                "confidence threshold {} outside [0, 1]",
                self.confidence_threshold
            )));
        }
        if self.relative_error_threshold.is_nan() || self.relative_error_threshold <= 0.0 {
            return Err(EvaluationError::InvalidConfig(format!(
                "relative error threshold {} must be positive",
                self.relative_error_threshold
            )));
        }
        if self.min_t_test_samples < 2 {
            return Err(EvaluationError::InvalidConfig(
                "the t-test needs at least 2 observations".to_string(),
            ));
        }
        if self.min_rank_test_samples < 1 {
            return Err(EvaluationError::InvalidConfig(
                "the signed-rank test needs at least 1 observation".to_string(),
            ));
        }
        Ok(())
    }

    /// Wide-table column name for a derived prediction, `{angle}_{condition}_{nutrient}`
    pub fn prediction_column(&self, angle: &str, condition: &str, nutrient: Nutrient) -> String {
        format!("{}_{}_{}", angle, condition, nutrient.name())
    }

    /// The angle compared against `angle` for the same condition
    ///
    /// This is the first configured angle other than `angle`; with the default two angles
    /// each is the other's counterpart.
    pub fn counterpart_angle(&self, angle: &str) -> Option<&str> {
        self.angles
            .iter()
            .map(String::as_str)
            .find(|candidate| *candidate != angle)
    }
}

fn check_unique(kind: &str, names: &[String]) -> Result<(), EvaluationError> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(EvaluationError::InvalidConfig(format!("empty {} name", kind)));
        }
        if !seen.insert(name.as_str()) {
            return Err(EvaluationError::InvalidConfig(format!(
                "duplicate {} '{}'",
                kind, name
            )));
        }
    }
    Ok(())
}

/// `{dir}/statistical_tests_{nutrient}.csv`
pub fn stat_tests_path(dir: &Path, nutrient: Nutrient) -> PathBuf {
    dir.join(format!("statistical_tests_{}.csv", nutrient.name()))
}

/// Input and output locations for a full pipeline run
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    /// Root of `{angle}/{dish}/{condition}.json`
    pub results_root: PathBuf,
    /// Headerless ground-truth metadata CSV
    pub metadata_csv: PathBuf,
    /// Directory receiving every output table
    pub output_dir: PathBuf,
}

impl PipelinePaths {
    /// Wide table, one row per dish
    pub fn wide_table(&self) -> PathBuf {
        self.output_dir.join("nutrition_evaluation.csv")
    }

    /// Metrics table, one row per angle and condition
    pub fn metrics_table(&self) -> PathBuf {
        self.output_dir.join("metrics_analysis.csv")
    }

    /// Statistical test table for one nutrient
    pub fn stat_tests_table(&self, nutrient: Nutrient) -> PathBuf {
        stat_tests_path(&self.output_dir, nutrient)
    }

    /// Mean prediction per condition
    pub fn summary_table(&self) -> PathBuf {
        self.output_dir.join("nutrition_summary.csv")
    }

    /// Per-metric sub-tables of the metrics table
    pub fn metric_subtables_dir(&self) -> PathBuf {
        self.output_dir.join("subtables_metrics")
    }

    /// Per-nutrient sub-tables of the metrics table
    pub fn nutrient_subtables_dir(&self) -> PathBuf {
        self.output_dir.join("subtables_nutrients")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = EvaluationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.angles.len(), 2);
        assert_eq!(config.conditions.len(), 7);
        assert_eq!(config.nutrients.len(), 5);
    }

    #[test]
    fn test_baseline_must_be_a_condition() {
        let config = EvaluationConfig {
            baseline_condition: "raw".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EvaluationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_duplicate_angle_rejected() {
        let config = EvaluationConfig {
            angles: vec!["overhead".to_string(), "overhead".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_t_test_minimum_rejected() {
        let config = EvaluationConfig {
            min_t_test_samples: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EvaluationConfig = serde_json::from_str(
            r#"{"angles": ["overhead"], "aggregation_policy": "max_confidence_per_item"}"#,
        )
        .unwrap();
        assert_eq!(config.angles, vec!["overhead".to_string()]);
        assert_eq!(config.aggregation_policy, AggregationPolicy::MaxConfidencePerItem);
        assert_eq!(config.conditions.len(), 7);
        assert_eq!(config.confidence_threshold, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_counterpart_angle() {
        let config = EvaluationConfig::default();
        assert_eq!(config.counterpart_angle("overhead"), Some("side_angle"));
        assert_eq!(config.counterpart_angle("side_angle"), Some("overhead"));

        let single = EvaluationConfig {
            angles: vec!["overhead".to_string()],
            ..Default::default()
        };
        assert_eq!(single.counterpart_angle("overhead"), None);
    }

    #[test]
    fn test_stat_tests_paths() {
        let paths = PipelinePaths {
            results_root: PathBuf::from("results"),
            metadata_csv: PathBuf::from("dish_metadata.csv"),
            output_dir: PathBuf::from("out"),
        };
        assert_eq!(
            paths.stat_tests_table(Nutrient::Fat),
            PathBuf::from("out/statistical_tests_fat.csv")
        );
        assert_eq!(
            stat_tests_path(Path::new("elsewhere"), Nutrient::Calories),
            PathBuf::from("elsewhere/statistical_tests_calories.csv")
        );
    }

    #[test]
    fn test_prediction_column() {
        let config = EvaluationConfig::default();
        assert_eq!(
            config.prediction_column("side_angle", "rgb_contrast_plus", Nutrient::Fat),
            "side_angle_rgb_contrast_plus_fat"
        );
    }
}
