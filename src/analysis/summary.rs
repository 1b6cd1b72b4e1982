//! Mean prediction per condition

use crate::config::EvaluationConfig;
use crate::dataset::WideTable;
use crate::error::EvaluationError;
use crate::io::tables::{ensure_parent_dir, format_cell};
use crate::nutrient::Nutrient;
use crate::stats::mean;
use std::io::Write;
use std::path::Path;

/// Mean predictions of one condition
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSummary {
    /// Image condition
    pub condition: String,
    /// One entry per (angle, nutrient), angle-major; `None` when the column is absent
    /// or entirely null
    pub means: Vec<Option<f64>>,
}

/// Mean predictions of every condition
#[derive(Debug, Clone)]
pub struct SummaryTable {
    angles: Vec<String>,
    nutrients: Vec<Nutrient>,
    /// Rows in configuration order
    pub rows: Vec<ConditionSummary>,
}

impl SummaryTable {
    /// Column names after `condition`, `{angle}_{nutrient}_mean`
    pub fn value_columns(&self) -> Vec<String> {
        self.angles
            .iter()
            .flat_map(|angle| {
                self.nutrients
                    .iter()
                    .map(move |n| format!("{}_{}_mean", angle, n.name()))
            })
            .collect()
    }

    /// Mean of one (condition, angle, nutrient)
    pub fn mean(&self, condition: &str, angle: &str, nutrient: Nutrient) -> Option<f64> {
        let a = self.angles.iter().position(|x| x == angle)?;
        let n = self.nutrients.iter().position(|&x| x == nutrient)?;
        self.rows
            .iter()
            .find(|r| r.condition == condition)
            .and_then(|r| r.means[a * self.nutrients.len() + n])
    }

    /// Write the table as CSV
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), EvaluationError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(std::iter::once("condition".to_string()).chain(self.value_columns()))?;
        for row in &self.rows {
            csv_writer.write_record(
                std::iter::once(row.condition.clone())
                    .chain(row.means.iter().map(|&m| format_cell(m))),
            )?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Write the table to a CSV file, creating parent directories
    pub fn write_path(&self, path: &Path) -> Result<(), EvaluationError> {
        ensure_parent_dir(path)?;
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))?;
        log::info!("Wrote condition summary to {}", path.display());
        Ok(())
    }
}

/// Average every prediction column over its non-null rows
pub fn summarize_conditions(table: &WideTable, config: &EvaluationConfig) -> SummaryTable {
    let rows = config
        .conditions
        .iter()
        .map(|condition| {
            let means = config
                .angles
                .iter()
                .flat_map(|angle| {
                    config.nutrients.iter().map(move |&nutrient| {
                        let column = config.prediction_column(angle, condition, nutrient);
                        let values: Vec<f64> =
                            table.column(&column)?.into_iter().flatten().collect();
                        if values.is_empty() {
                            None
                        } else {
                            Some(mean(&values))
                        }
                    })
                })
                .collect();
            ConditionSummary {
                condition: condition.clone(),
                means,
            }
        })
        .collect();

    SummaryTable {
        angles: config.angles.clone(),
        nutrients: config.nutrients.clone(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::WideRow;

    #[test]
    fn test_means_skip_nulls() {
        let config = EvaluationConfig {
            conditions: vec!["rgb".to_string(), "rgb_contrast_minus".to_string()],
            nutrients: vec![Nutrient::Calories],
            ..Default::default()
        };
        let mut table = WideTable::new(crate::dataset::wide_columns(&config)).unwrap();
        let rows = [
            [Some(100.0), Some(80.0), None, Some(90.0), None],
            [Some(200.0), Some(160.0), None, None, None],
        ];
        for (i, values) in rows.iter().enumerate() {
            table
                .push_row(WideRow {
                    dish_id: format!("D{}", i),
                    values: values.to_vec(),
                })
                .unwrap();
        }

        let summary = summarize_conditions(&table, &config);
        assert_eq!(summary.mean("rgb", "overhead", Nutrient::Calories), Some(120.0));
        assert_eq!(summary.mean("rgb", "side_angle", Nutrient::Calories), Some(90.0));
        assert_eq!(summary.mean("rgb_contrast_minus", "overhead", Nutrient::Calories), None);

        let mut buffer = Vec::new();
        summary.write_csv(&mut buffer).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "condition,overhead_calories_mean,side_angle_calories_mean\n\
             rgb,120.0,90.0\n\
             rgb_contrast_minus,,\n"
        );
    }
}
