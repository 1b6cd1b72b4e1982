//! Per-metric and per-nutrient slices of the metrics table

use super::metrics::Metric;
use crate::config::EvaluationConfig;
use crate::error::EvaluationError;
use crate::io::tables::write_column_subset;
use std::path::{Path, PathBuf};

/// Split a metrics CSV into narrower tables
///
/// Writes `{metrics_dir}/{metric}_table.csv` with `condition` and that metric for every
/// nutrient, and `{nutrients_dir}/{nutrient}_table.csv` with `condition` and every metric
/// for that nutrient.
///
/// # Returns
///
/// Paths of the files written, metric tables first
pub fn split_metrics_table(
    metrics_csv: &Path,
    metrics_dir: &Path,
    nutrients_dir: &Path,
    config: &EvaluationConfig,
) -> Result<Vec<PathBuf>, EvaluationError> {
    if !metrics_csv.exists() {
        return Err(EvaluationError::MissingFile(metrics_csv.to_path_buf()));
    }

    let mut written = Vec::new();

    for metric in Metric::ALL {
        let mut columns = vec!["condition".to_string()];
        columns.extend(config.nutrients.iter().map(|&n| metric.column(n)));
        let output = metrics_dir.join(format!("{}_table.csv", metric.name()));
        write_column_subset(metrics_csv, &columns, &output)?;
        written.push(output);
    }

    for &nutrient in &config.nutrients {
        let mut columns = vec!["condition".to_string()];
        columns.extend(Metric::ALL.iter().map(|m| m.column(nutrient)));
        let output = nutrients_dir.join(format!("{}_table.csv", nutrient.name()));
        write_column_subset(metrics_csv, &columns, &output)?;
        written.push(output);
    }

    log::info!("Wrote {} metric sub-tables", written.len());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrient::Nutrient;

    #[test]
    fn test_split() {
        let dir = tempfile::tempdir().unwrap();
        let metrics_csv = dir.path().join("metrics_analysis.csv");
        std::fs::write(
            &metrics_csv,
            "condition,mae_calories,mape_calories,prop_below_20_calories,avg_error_calories,avg_rel_error_calories,\
             mae_fat,mape_fat,prop_below_20_fat,avg_error_fat,avg_rel_error_fat\n\
             overhead_rgb,1.0,2.0,0.5,3.0,4.0,5.0,6.0,0.25,7.0,8.0\n",
        )
        .unwrap();
        let config = EvaluationConfig {
            nutrients: vec![Nutrient::Calories, Nutrient::Fat],
            ..Default::default()
        };

        let written = split_metrics_table(
            &metrics_csv,
            &dir.path().join("metrics"),
            &dir.path().join("nutrients"),
            &config,
        )
        .unwrap();
        assert_eq!(written.len(), 7);

        let mae = std::fs::read_to_string(dir.path().join("metrics/mae_table.csv")).unwrap();
        assert_eq!(mae, "condition,mae_calories,mae_fat\noverhead_rgb,1.0,5.0\n");

        let fat = std::fs::read_to_string(dir.path().join("nutrients/fat_table.csv")).unwrap();
        assert_eq!(
            fat,
            "condition,mae_fat,mape_fat,prop_below_20_fat,avg_error_fat,avg_rel_error_fat\n\
             overhead_rgb,5.0,6.0,0.25,7.0,8.0\n"
        );
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let result = split_metrics_table(
            &dir.path().join("absent.csv"),
            dir.path(),
            dir.path(),
            &EvaluationConfig::default(),
        );
        assert!(matches!(result, Err(EvaluationError::MissingFile(_))));
    }
}
