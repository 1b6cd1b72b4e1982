//! Reading per-(angle, dish, condition) responses into aggregated observations

use crate::config::EvaluationConfig;
use crate::error::EvaluationError;
use crate::io::detection::DetectionResult;
use crate::nutrient::NutrientProfile;
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

/// Aggregated totals for one (angle, dish, condition); `None` means no usable detection
pub type AggregatedObservation = Option<NutrientProfile>;

/// Counters describing one ingestion pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Dish directories visited
    pub dishes: usize,
    /// Response files parsed successfully
    pub files_read: usize,
    /// Expected response files that did not exist
    pub missing: usize,
    /// Response files that could not be parsed
    pub malformed: usize,
    /// Parsed responses in which no candidate contributed
    pub empty_detections: usize,
}

impl IngestSummary {
    fn merge(&mut self, other: &IngestSummary) {
        self.dishes += other.dishes;
        self.files_read += other.files_read;
        self.missing += other.missing;
        self.malformed += other.malformed;
        self.empty_detections += other.empty_detections;
    }
}

/// Aggregated observations for every dish seen under one angle
#[derive(Debug, Clone, Default)]
pub struct AngleResults {
    /// Angle name (first-level directory)
    pub angle: String,
    /// dish id -> condition -> observation, ordered by dish id
    pub dishes: BTreeMap<String, BTreeMap<String, AggregatedObservation>>,
    /// Counters for this angle
    pub summary: IngestSummary,
}

impl AngleResults {
    /// Whether a dish directory was found for this angle
    pub fn contains(&self, dish_id: &str) -> bool {
        self.dishes.contains_key(dish_id)
    }

    /// Observation for a dish and condition (`None` if absent or null)
    pub fn observation(&self, dish_id: &str, condition: &str) -> AggregatedObservation {
        self.dishes
            .get(dish_id)
            .and_then(|conditions| conditions.get(condition))
            .copied()
            .flatten()
    }
}

/// Read one response file and aggregate it
///
/// # Errors
///
/// `MissingFile` or `MalformedData` for recoverable problems, `Io` otherwise.
pub fn read_observation(
    path: &Path,
    config: &EvaluationConfig,
) -> Result<AggregatedObservation, EvaluationError> {
    let detection = DetectionResult::read(path)?;
    let observation = config
        .aggregation_policy
        .aggregate(&detection, config.confidence_threshold);
    if observation.is_none() {
        log::debug!(
            "No contributing candidate among {} in {}",
            detection.candidate_count(),
            path.display()
        );
    }
    Ok(observation)
}

/// Ingest every dish directory under `{results_root}/{angle}/`
///
/// For each dish and configured condition, a missing or malformed response is logged
/// and recorded as a null observation; processing continues.
///
/// # Errors
///
/// Returns `EvaluationError::Io` only for filesystem failures other than missing files.
pub fn ingest_angle(
    results_root: &Path,
    angle: &str,
    config: &EvaluationConfig,
) -> Result<AngleResults, EvaluationError> {
    let angle_dir = results_root.join(angle);
    let mut results = AngleResults {
        angle: angle.to_string(),
        ..Default::default()
    };

    if !angle_dir.is_dir() {
        log::warn!("Results directory {} not found", angle_dir.display());
        return Ok(results);
    }

    let walker = WalkDir::new(&angle_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(dir_name) = entry.file_name().to_str() else {
            log::warn!("Skipping non-UTF-8 dish directory {}", entry.path().display());
            continue;
        };
        let dish_id = dir_name.trim().to_string();
        results.summary.dishes += 1;

        let mut observations = BTreeMap::new();
        for condition in &config.conditions {
            let path = entry.path().join(format!("{}.json", condition));
            let observation = match read_observation(&path, config) {
                Ok(observation) => {
                    results.summary.files_read += 1;
                    if observation.is_none() {
                        results.summary.empty_detections += 1;
                    }
                    observation
                }
                Err(err) if err.is_recoverable() => {
                    if let EvaluationError::MissingFile(_) = err {
                        results.summary.missing += 1;
                        log::debug!("{}", err);
                    } else {
                        results.summary.malformed += 1;
                        log::warn!("{}", err);
                    }
                    None
                }
                Err(err) => return Err(err),
            };
            observations.insert(condition.clone(), observation);
        }

        if results.dishes.insert(dish_id.clone(), observations).is_some() {
            log::warn!(
                "Dish {} appears twice under {} after trimming; keeping the later directory",
                dish_id,
                angle
            );
        }
    }

    log::info!(
        "Ingested {} dishes for {}: {} files read, {} missing, {} malformed, {} empty",
        results.summary.dishes,
        angle,
        results.summary.files_read,
        results.summary.missing,
        results.summary.malformed,
        results.summary.empty_detections
    );
    Ok(results)
}

/// Ingest every configured angle
pub fn ingest_all(
    results_root: &Path,
    config: &EvaluationConfig,
) -> Result<(Vec<AngleResults>, IngestSummary), EvaluationError> {
    let mut total = IngestSummary::default();
    let mut all = Vec::with_capacity(config.angles.len());
    for angle in &config.angles {
        let results = ingest_angle(results_root, angle, config)?;
        total.merge(&results.summary);
        all.push(results);
    }
    Ok((all, total))
}
