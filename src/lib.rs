//! # Nutrition Eval
//!
//! Evaluation pipeline for food-recognition nutrition estimates. Stored API responses
//! for photographed dishes are compared against ground-truth dish metadata across
//! camera angles and image perturbations.
//!
//! ## Features
//!
//! - **Ingestion**: Null-filling reader for `{angle}/{dish}/{condition}.json` responses,
//!   with a configurable candidate aggregation policy
//! - **Assembly**: Inner or lossless join of metadata and observations into one wide table
//! - **Metrics**: MAE, MAPE, share within 20% relative error, signed and relative bias
//! - **Statistics**: One-sample t-test and Wilcoxon signed-rank test against ground truth,
//!   the counterpart angle and the baseline condition
//!
//! ## Quick Start
//!
//! ```no_run
//! use nutrition_eval::{run_pipeline, EvaluationConfig, PipelinePaths};
//!
//! let paths = PipelinePaths {
//!     results_root: "results".into(),
//!     metadata_csv: "metadata/dish_metadata.csv".into(),
//!     output_dir: "output".into(),
//! };
//! let report = run_pipeline(&paths, &EvaluationConfig::default())?;
//! println!("{} dishes evaluated", report.dishes);
//! # Ok::<(), nutrition_eval::EvaluationError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Metadata CSV ─┐
//!               ├→ Wide table → Metrics / Statistical tests / Summary → CSV
//! Responses ────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod dataset;
pub mod error;
pub mod ingest;
pub mod io;
pub mod nutrient;
pub mod stats;

// Re-export main types
pub use analysis::{
    compare_conditions, compute_metrics, split_metrics_table, summarize_conditions,
    MetricsTable, StatTestTable, SummaryTable,
};
pub use config::{EvaluationConfig, PipelinePaths};
pub use dataset::{assemble, JoinMode, WideTable};
pub use error::EvaluationError;
pub use ingest::{AggregationPolicy, IngestSummary};
pub use nutrient::{Nutrient, NutrientProfile};

use std::path::{Path, PathBuf};

/// Outcome of a full pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// Dish rows in the wide table
    pub dishes: usize,
    /// Ingestion counters over all angles
    pub ingest: IngestSummary,
    /// Files written, in the order they were produced
    pub outputs: Vec<PathBuf>,
}

/// Load metadata, ingest every angle and join them
///
/// # Arguments
///
/// * `results_root` - Root of `{angle}/{dish}/{condition}.json`
/// * `metadata_csv` - Headerless ground-truth CSV
/// * `config` - Evaluation configuration
///
/// # Returns
///
/// The wide table and the ingestion counters
///
/// # Errors
///
/// Returns `EvaluationError` if the configuration is invalid, the metadata cannot be
/// loaded, or the results root cannot be walked.
pub fn build_dataset(
    results_root: &Path,
    metadata_csv: &Path,
    config: &EvaluationConfig,
) -> Result<(WideTable, IngestSummary), EvaluationError> {
    config.validate()?;
    let metadata = io::metadata::load_metadata(metadata_csv)?;
    let (angle_results, summary) = ingest::ingest_all(results_root, config)?;
    let table = assemble(&metadata, &angle_results, config)?;
    Ok((table, summary))
}

/// Run every stage and write all output tables
///
/// The wide table is written first and read back, so every analysis stage sees exactly
/// what was persisted. Outputs go to:
///
/// - `nutrition_evaluation.csv`
/// - `metrics_analysis.csv`
/// - `statistical_tests_{nutrient}.csv`
/// - `nutrition_summary.csv`
/// - `subtables_metrics/` and `subtables_nutrients/`
///
/// # Errors
///
/// Returns `EvaluationError` on invalid configuration, unreadable metadata, a wide table
/// that does not round-trip, or any write failure. Missing and malformed responses are
/// not errors.
///
/// # Example
///
/// ```no_run
/// use nutrition_eval::{run_pipeline, EvaluationConfig, JoinMode, PipelinePaths};
///
/// let config = EvaluationConfig {
///     join_mode: JoinMode::Lossless,
///     ..Default::default()
/// };
/// let paths = PipelinePaths {
///     results_root: "results".into(),
///     metadata_csv: "dish_metadata.csv".into(),
///     output_dir: "output".into(),
/// };
/// let report = run_pipeline(&paths, &config)?;
/// assert!(!report.outputs.is_empty());
/// # Ok::<(), nutrition_eval::EvaluationError>(())
/// ```
pub fn run_pipeline(
    paths: &PipelinePaths,
    config: &EvaluationConfig,
) -> Result<PipelineReport, EvaluationError> {
    use std::time::Instant;
    let start_time = Instant::now();

    log::debug!(
        "Starting evaluation: results {} metadata {}",
        paths.results_root.display(),
        paths.metadata_csv.display()
    );

    let (table, ingest) = build_dataset(&paths.results_root, &paths.metadata_csv, config)?;
    let mut outputs = Vec::new();

    let wide_path = paths.wide_table();
    table.write_path(&wide_path)?;
    outputs.push(wide_path.clone());

    let table = WideTable::read_path(&wide_path)?;

    let metrics_path = paths.metrics_table();
    compute_metrics(&table, config).write_path(&metrics_path)?;
    outputs.push(metrics_path.clone());

    for &nutrient in &config.nutrients {
        let path = paths.stat_tests_table(nutrient);
        compare_conditions(&table, nutrient, config).write_path(&path)?;
        outputs.push(path);
    }

    let summary_path = paths.summary_table();
    summarize_conditions(&table, config).write_path(&summary_path)?;
    outputs.push(summary_path);

    outputs.extend(split_metrics_table(
        &metrics_path,
        &paths.metric_subtables_dir(),
        &paths.nutrient_subtables_dir(),
        config,
    )?);

    log::info!(
        "Evaluated {} dishes into {} files in {:.1} ms",
        table.len(),
        outputs.len(),
        start_time.elapsed().as_secs_f32() * 1000.0
    );

    Ok(PipelineReport {
        dishes: table.len(),
        ingest,
        outputs,
    })
}
