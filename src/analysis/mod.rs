//! Analysis stages over the assembled wide table
//!
//! - Error metrics per angle, condition and nutrient
//! - Paired significance tests against ground truth, counterpart angle and baseline
//! - Mean prediction per condition
//! - Per-metric and per-nutrient slices of the metrics table

pub mod comparison;
pub mod metrics;
pub mod subtables;
pub mod summary;

pub use comparison::{compare_conditions, ComparisonKind, ComparisonOutcome, StatTestRow, StatTestTable};
pub use metrics::{compute_metrics, Metric, MetricRow, MetricsTable, NutrientMetrics};
pub use subtables::split_metrics_table;
pub use summary::{summarize_conditions, ConditionSummary, SummaryTable};
