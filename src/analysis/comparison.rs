//! Paired significance tests between predictions and their references
//!
//! Each (angle, condition) prediction column of one nutrient is compared with three
//! references:
//!
//! - the ground truth
//! - the same condition on the counterpart angle
//! - the baseline condition on the same angle
//!
//! Only rows where both sides are non-null take part. Differences are always
//! `prediction - reference`.

use crate::config::EvaluationConfig;
use crate::dataset::WideTable;
use crate::error::EvaluationError;
use crate::io::tables::{ensure_parent_dir, format_cell};
use crate::nutrient::Nutrient;
use crate::stats::{median, one_sample_t_test, wilcoxon_signed_rank};
use std::io::Write;
use std::path::Path;

/// Reference a prediction column is compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonKind {
    /// Ground-truth nutrient column
    GroundTruth,
    /// Same condition on the counterpart angle
    Counterpart,
    /// Baseline condition on the same angle
    BaseCondition,
}

impl ComparisonKind {
    /// All comparisons in output column order
    pub const ALL: [ComparisonKind; 3] = [
        ComparisonKind::GroundTruth,
        ComparisonKind::Counterpart,
        ComparisonKind::BaseCondition,
    ];

    /// Column suffix
    pub fn suffix(&self) -> &'static str {
        match self {
            ComparisonKind::GroundTruth => "ground_truth",
            ComparisonKind::Counterpart => "counterpart",
            ComparisonKind::BaseCondition => "base_condition",
        }
    }
}

/// t-test outcome of one comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTestSummary {
    /// Two-sided p-value of |differences| against zero
    pub p_value: f64,
    /// Mean of |differences|
    pub mean_absolute_difference: f64,
}

/// Signed-rank outcome of one comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankTestSummary {
    /// Two-sided p-value of the signed differences
    pub p_value: f64,
    /// Median of |differences|
    pub median_absolute_difference: f64,
}

/// Result of one comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonOutcome {
    /// Number of paired rows
    pub n: usize,
    /// `None` below the t-test minimum
    pub t_test: Option<TTestSummary>,
    /// `None` below the rank-test minimum or when the rank test is disabled
    pub rank_test: Option<RankTestSummary>,
}

/// Test results for one (angle, condition) and nutrient
#[derive(Debug, Clone, PartialEq)]
pub struct StatTestRow {
    /// Camera angle
    pub angle: String,
    /// Image condition
    pub condition: String,
    /// Against the ground truth
    pub ground_truth: Option<ComparisonOutcome>,
    /// Against the counterpart angle; `None` with a single angle
    pub counterpart: Option<ComparisonOutcome>,
    /// Against the baseline; `None` for the baseline itself
    pub base_condition: Option<ComparisonOutcome>,
}

impl StatTestRow {
    /// Row label, `{angle}_{condition}`
    pub fn label(&self) -> String {
        format!("{}_{}", self.angle, self.condition)
    }

    /// Outcome of one comparison
    pub fn outcome(&self, kind: ComparisonKind) -> Option<&ComparisonOutcome> {
        match kind {
            ComparisonKind::GroundTruth => self.ground_truth.as_ref(),
            ComparisonKind::Counterpart => self.counterpart.as_ref(),
            ComparisonKind::BaseCondition => self.base_condition.as_ref(),
        }
    }
}

/// All test rows of one nutrient
#[derive(Debug, Clone)]
pub struct StatTestTable {
    /// Nutrient under test
    pub nutrient: Nutrient,
    /// Rows in angle, then condition order
    pub rows: Vec<StatTestRow>,
}

impl StatTestTable {
    /// Find the row of an (angle, condition)
    pub fn row(&self, angle: &str, condition: &str) -> Option<&StatTestRow> {
        self.rows
            .iter()
            .find(|r| r.angle == angle && r.condition == condition)
    }

    /// CSV header: `condition`, then five columns per comparison
    pub fn header() -> Vec<String> {
        let mut header = vec!["condition".to_string()];
        for kind in ComparisonKind::ALL {
            let s = kind.suffix();
            header.push(format!("n_{}", s));
            header.push(format!("p_value_{}", s));
            header.push(format!("mean_absolute_difference_{}", s));
            header.push(format!("rank_p_value_{}", s));
            header.push(format!("median_absolute_difference_{}", s));
        }
        header
    }

    /// Write the table as CSV
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), EvaluationError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(Self::header())?;
        for row in &self.rows {
            let mut record = vec![row.label()];
            for kind in ComparisonKind::ALL {
                let outcome = row.outcome(kind);
                let t_test = outcome.and_then(|o| o.t_test);
                let rank_test = outcome.and_then(|o| o.rank_test);
                record.push(outcome.map(|o| o.n.to_string()).unwrap_or_default());
                record.push(format_cell(t_test.map(|t| t.p_value)));
                record.push(format_cell(t_test.map(|t| t.mean_absolute_difference)));
                record.push(format_cell(rank_test.map(|r| r.p_value)));
                record.push(format_cell(rank_test.map(|r| r.median_absolute_difference)));
            }
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Write the table to a CSV file, creating parent directories
    pub fn write_path(&self, path: &Path) -> Result<(), EvaluationError> {
        ensure_parent_dir(path)?;
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))?;
        log::info!(
            "Wrote {} statistical test rows to {}",
            self.rows.len(),
            path.display()
        );
        Ok(())
    }
}

/// Test `(prediction, reference)` pairs
///
/// # Arguments
///
/// * `pairs` - Paired non-null values
/// * `config` - Sample minimums and rank-test switch
///
/// # Returns
///
/// The outcome, with each test left empty when its minimum sample size is not met.
pub fn compare_pairs(pairs: &[(f64, f64)], config: &EvaluationConfig) -> ComparisonOutcome {
    let signed: Vec<f64> = pairs.iter().map(|&(p, r)| p - r).collect();
    let absolute: Vec<f64> = signed.iter().map(|d| d.abs()).collect();
    let n = pairs.len();

    let t_test = if n >= config.min_t_test_samples {
        match one_sample_t_test(&absolute, 0.0) {
            Ok(result) => Some(TTestSummary {
                p_value: result.p_value,
                mean_absolute_difference: result.mean,
            }),
            Err(e) => {
                log::debug!("t-test skipped: {}", e);
                None
            }
        }
    } else {
        log::debug!(
            "t-test skipped: {}",
            EvaluationError::InsufficientSample {
                required: config.min_t_test_samples,
                found: n,
            }
        );
        None
    };

    let rank_test = if !config.enable_rank_test {
        None
    } else if n >= config.min_rank_test_samples {
        match wilcoxon_signed_rank(&signed) {
            Ok(result) => Some(RankTestSummary {
                p_value: result.p_value,
                median_absolute_difference: median(&absolute),
            }),
            Err(e) => {
                log::debug!("Signed-rank test skipped: {}", e);
                None
            }
        }
    } else {
        log::debug!(
            "Signed-rank test skipped: {}",
            EvaluationError::InsufficientSample {
                required: config.min_rank_test_samples,
                found: n,
            }
        );
        None
    };

    ComparisonOutcome {
        n,
        t_test,
        rank_test,
    }
}

fn compare_columns(
    table: &WideTable,
    prediction: &str,
    reference: &str,
    config: &EvaluationConfig,
) -> Option<ComparisonOutcome> {
    match table.paired(prediction, reference) {
        Some(pairs) => Some(compare_pairs(&pairs, config)),
        None => {
            log::debug!("Cannot compare {} with {}: column absent", prediction, reference);
            None
        }
    }
}

/// Run all comparisons for one nutrient
///
/// # Arguments
///
/// * `table` - Wide table with ground-truth and prediction columns
/// * `nutrient` - Nutrient to test
/// * `config` - Taxonomy, baseline condition and test minimums
///
/// # Returns
///
/// One row per (angle, condition), in configuration order
pub fn compare_conditions(
    table: &WideTable,
    nutrient: Nutrient,
    config: &EvaluationConfig,
) -> StatTestTable {
    let mut rows = Vec::with_capacity(config.angles.len() * config.conditions.len());

    for angle in &config.angles {
        let counterpart_angle = config.counterpart_angle(angle);
        for condition in &config.conditions {
            let prediction = config.prediction_column(angle, condition, nutrient);

            let ground_truth = compare_columns(table, &prediction, nutrient.name(), config);
            let counterpart = counterpart_angle.and_then(|other| {
                let reference = config.prediction_column(other, condition, nutrient);
                compare_columns(table, &prediction, &reference, config)
            });
            let base_condition = if *condition == config.baseline_condition {
                None
            } else {
                let reference =
                    config.prediction_column(angle, &config.baseline_condition, nutrient);
                compare_columns(table, &prediction, &reference, config)
            };

            rows.push(StatTestRow {
                angle: angle.clone(),
                condition: condition.clone(),
                ground_truth,
                counterpart,
                base_condition,
            });
        }
    }

    log::info!("Ran statistical tests for {} on {} conditions", nutrient, rows.len());
    StatTestTable { nutrient, rows }
}
