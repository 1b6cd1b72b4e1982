//! Error metrics of predictions against ground truth
//!
//! For every (angle, condition, nutrient) the engine pairs the ground-truth column with
//! the prediction column, keeps rows where both are present, and computes:
//!
//! | column | definition |
//! |---|---|
//! | `mae_{n}` | mean(\|p - t\|) |
//! | `mape_{n}` | mean(\|(t - p) / t\|) * 100 |
//! | `prop_below_20_{n}` | mean(\|(t - p) / t\| < threshold) |
//! | `avg_error_{n}` | mean(p - t) |
//! | `avg_rel_error_{n}` | mean((p - t) / t) * 100 |
//!
//! Divisions by the ground truth are not guarded: a zero ground truth turns `mape` and
//! `avg_rel_error` into NaN or infinity, and that value is reported as is.

use crate::config::EvaluationConfig;
use crate::dataset::WideTable;
use crate::error::EvaluationError;
use crate::io::tables::{ensure_parent_dir, format_cell};
use crate::nutrient::Nutrient;
use crate::stats::mean;
use std::io::Write;
use std::path::Path;

/// One error metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Mean absolute error
    Mae,
    /// Mean absolute percentage error
    Mape,
    /// Share of predictions within the relative error threshold
    PropBelow20,
    /// Mean signed error
    AvgError,
    /// Mean signed relative error, in percent
    AvgRelError,
}

impl Metric {
    /// All metrics in output column order
    pub const ALL: [Metric; 5] = [
        Metric::Mae,
        Metric::Mape,
        Metric::PropBelow20,
        Metric::AvgError,
        Metric::AvgRelError,
    ];

    /// Column prefix
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Mae => "mae",
            Metric::Mape => "mape",
            Metric::PropBelow20 => "prop_below_20",
            Metric::AvgError => "avg_error",
            Metric::AvgRelError => "avg_rel_error",
        }
    }

    /// Metrics-table column name, `{metric}_{nutrient}`
    pub fn column(&self, nutrient: Nutrient) -> String {
        format!("{}_{}", self.name(), nutrient.name())
    }
}

/// The five metrics for one nutrient of one (angle, condition)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NutrientMetrics {
    /// Number of paired rows used
    pub n: usize,
    /// Mean absolute error
    pub mae: f64,
    /// Mean absolute percentage error
    pub mape: f64,
    /// Share of rows with relative error below the threshold
    pub prop_below_20: f64,
    /// Mean signed error
    pub avg_error: f64,
    /// Mean signed relative error, in percent
    pub avg_rel_error: f64,
}

impl NutrientMetrics {
    /// Compute metrics from `(truth, prediction)` pairs
    ///
    /// # Returns
    ///
    /// `None` when `pairs` is empty.
    ///
    /// # Example
    ///
    /// ```
    /// use nutrition_eval::analysis::metrics::NutrientMetrics;
    ///
    /// let m = NutrientMetrics::compute(&[(100.0, 110.0), (200.0, 150.0)], 0.2).unwrap();
    /// assert_eq!(m.mae, 30.0);
    /// assert_eq!(m.avg_error, -20.0);
    /// assert_eq!(m.prop_below_20, 0.5);
    /// ```
    pub fn compute(pairs: &[(f64, f64)], relative_error_threshold: f64) -> Option<Self> {
        if pairs.is_empty() {
            return None;
        }

        let absolute: Vec<f64> = pairs.iter().map(|&(t, p)| (p - t).abs()).collect();
        let absolute_relative: Vec<f64> = pairs.iter().map(|&(t, p)| ((t - p) / t).abs()).collect();
        let within: Vec<f64> = absolute_relative
            .iter()
            .map(|&r| if r < relative_error_threshold { 1.0 } else { 0.0 })
            .collect();
        let signed: Vec<f64> = pairs.iter().map(|&(t, p)| p - t).collect();
        let signed_relative: Vec<f64> = pairs.iter().map(|&(t, p)| (p - t) / t).collect();

        Some(Self {
            n: pairs.len(),
            mae: mean(&absolute),
            mape: mean(&absolute_relative) * 100.0,
            prop_below_20: mean(&within),
            avg_error: mean(&signed),
            avg_rel_error: mean(&signed_relative) * 100.0,
        })
    }

    /// Value of a single metric
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Mae => self.mae,
            Metric::Mape => self.mape,
            Metric::PropBelow20 => self.prop_below_20,
            Metric::AvgError => self.avg_error,
            Metric::AvgRelError => self.avg_rel_error,
        }
    }
}

/// Metrics for one (angle, condition)
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    /// Camera angle
    pub angle: String,
    /// Image condition
    pub condition: String,
    /// Per nutrient, `None` when no paired row exists or a column is absent
    pub nutrients: Vec<(Nutrient, Option<NutrientMetrics>)>,
}

impl MetricRow {
    /// Row label, `{angle}_{condition}`
    pub fn label(&self) -> String {
        format!("{}_{}", self.angle, self.condition)
    }

    /// Metrics for one nutrient
    pub fn metrics(&self, nutrient: Nutrient) -> Option<&NutrientMetrics> {
        self.nutrients
            .iter()
            .find(|(n, _)| *n == nutrient)
            .and_then(|(_, m)| m.as_ref())
    }
}

/// Metrics for every (angle, condition)
#[derive(Debug, Clone, Default)]
pub struct MetricsTable {
    /// Nutrients in column order
    pub nutrients: Vec<Nutrient>,
    /// Rows in angle, then condition order
    pub rows: Vec<MetricRow>,
}

impl MetricsTable {
    /// Find the row of an (angle, condition)
    pub fn row(&self, angle: &str, condition: &str) -> Option<&MetricRow> {
        self.rows
            .iter()
            .find(|r| r.angle == angle && r.condition == condition)
    }

    /// CSV header: `condition`, then every metric for each nutrient
    pub fn header(&self) -> Vec<String> {
        let mut header = vec!["condition".to_string()];
        for &nutrient in &self.nutrients {
            header.extend(Metric::ALL.iter().map(|m| m.column(nutrient)));
        }
        header
    }

    /// Write the table as CSV
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), EvaluationError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(self.header())?;
        for row in &self.rows {
            let mut record = vec![row.label()];
            for &nutrient in &self.nutrients {
                let metrics = row.metrics(nutrient);
                record.extend(
                    Metric::ALL
                        .iter()
                        .map(|&m| format_cell(metrics.map(|v| v.get(m)))),
                );
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
        log::info!("Wrote metrics for {} conditions to {}", self.rows.len(), path.display());
        Ok(())
    }
}

/// Compute error metrics for every configured (angle, condition, nutrient)
///
/// # Arguments
///
/// * `table` - Wide table with ground-truth and prediction columns
/// * `config` - Taxonomy and relative error threshold
///
/// # Returns
///
/// One row per (angle, condition), in configuration order. Non-finite values from
/// zero ground truths are kept.
pub fn compute_metrics(table: &WideTable, config: &EvaluationConfig) -> MetricsTable {
    let mut rows = Vec::with_capacity(config.angles.len() * config.conditions.len());

    for angle in &config.angles {
        for condition in &config.conditions {
            let nutrients = config
                .nutrients
                .iter()
                .map(|&nutrient| {
                    let prediction = config.prediction_column(angle, condition, nutrient);
                    let metrics = match table.paired(nutrient.name(), &prediction) {
                        Some(pairs) => {
                            let metrics =
                                NutrientMetrics::compute(&pairs, config.relative_error_threshold);
                            if metrics.is_none() {
                                log::debug!("No paired rows for {}", prediction);
                            }
                            metrics
                        }
                        None => {
                            log::debug!("Column {} or {} absent", nutrient.name(), prediction);
                            None
                        }
                    };
                    (nutrient, metrics)
                })
                .collect();

            rows.push(MetricRow {
                angle: angle.clone(),
                condition: condition.clone(),
                nutrients,
            });
        }
    }

    log::info!("Computed metrics for {} conditions", rows.len());
    MetricsTable {
        nutrients: config.nutrients.clone(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::WideRow;

    fn table(rows: &[(&str, Option<f64>, Option<f64>)]) -> WideTable {
        let mut table =
            WideTable::new(vec!["calories".to_string(), "overhead_rgb_calories".to_string()])
                .unwrap();
        for &(id, truth, prediction) in rows {
            table
                .push_row(WideRow {
                    dish_id: id.to_string(),
                    values: vec![truth, prediction],
                })
                .unwrap();
        }
        table
    }

    fn single_config() -> EvaluationConfig {
        EvaluationConfig {
            angles: vec!["overhead".to_string()],
            conditions: vec!["rgb".to_string()],
            nutrients: vec![Nutrient::Calories],
            ..Default::default()
        }
    }

    #[test]
    fn test_metric_values() {
        let t = table(&[
            ("D1", Some(100.0), Some(110.0)),
            ("D2", Some(200.0), Some(100.0)),
            ("D3", Some(50.0), None),
            ("D4", None, Some(10.0)),
        ]);
        let metrics = compute_metrics(&t, &single_config());
        let m = metrics.rows[0].metrics(Nutrient::Calories).unwrap();

        assert_eq!(m.n, 2);
        assert_eq!(m.mae, 55.0);
        assert!((m.mape - 30.0).abs() < 1e-12);
        assert_eq!(m.prop_below_20, 0.5);
        assert_eq!(m.avg_error, -45.0);
        assert!((m.avg_rel_error - (-20.0)).abs() < 1e-12);
    }

    #[test]
    fn test_zero_truth_propagates_non_finite() {
        let t = table(&[("D1", Some(0.0), Some(10.0)), ("D2", Some(100.0), Some(100.0))]);
        let metrics = compute_metrics(&t, &single_config());
        let m = metrics.rows[0].metrics(Nutrient::Calories).unwrap();

        assert_eq!(m.mae, 5.0);
        assert!(!m.mape.is_finite());
        assert!(!m.avg_rel_error.is_finite());
        assert_eq!(m.prop_below_20, 0.5);
    }

    #[test]
    fn test_zero_truth_and_zero_prediction_is_nan() {
        let t = table(&[("D1", Some(0.0), Some(0.0))]);
        let m = compute_metrics(&t, &single_config()).rows[0]
            .metrics(Nutrient::Calories)
            .copied()
            .unwrap();
        assert_eq!(m.mae, 0.0);
        assert!(m.mape.is_nan());
        assert!(m.avg_rel_error.is_nan());
    }

    #[test]
    fn test_no_valid_rows_gives_null_metrics() {
        let t = table(&[("D1", Some(100.0), None)]);
        let metrics = compute_metrics(&t, &single_config());
        assert!(metrics.rows[0].metrics(Nutrient::Calories).is_none());
    }

    #[test]
    fn test_missing_column_gives_null_metrics() {
        let t = table(&[("D1", Some(100.0), Some(90.0))]);
        let config = EvaluationConfig {
            conditions: vec!["rgb".to_string(), "rgb_contrast_plus".to_string()],
            ..single_config()
        };
        let metrics = compute_metrics(&t, &config);
        assert_eq!(metrics.rows.len(), 2);
        assert!(metrics.row("overhead", "rgb").unwrap().metrics(Nutrient::Calories).is_some());
        assert!(metrics
            .row("overhead", "rgb_contrast_plus")
            .unwrap()
            .metrics(Nutrient::Calories)
            .is_none());
    }

    #[test]
    fn test_csv_output() {
        let t = table(&[("D1", Some(0.0), Some(10.0))]);
        let metrics = compute_metrics(&t, &single_config());
        let mut buffer = Vec::new();
        metrics.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text,
            "condition,mae_calories,mape_calories,prop_below_20_calories,avg_error_calories,avg_rel_error_calories\n\
             overhead_rgb,10.0,inf,0.0,10.0,inf\n"
        );
    }
}
