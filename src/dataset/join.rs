//! Joining ground truth with per-angle observations

use super::wide::{WideRow, WideTable};
use crate::config::EvaluationConfig;
use crate::error::EvaluationError;
use crate::ingest::AngleResults;
use crate::io::metadata::Metadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How dishes missing from one of the sources are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    /// Keep only dishes present in the metadata and in every angle's results.
    /// Other dishes are dropped without trace in the output.
    Inner,
    /// Keep every dish from any source, with null cells for the missing parts
    Lossless,
}

/// Value columns of the wide table for a configuration
///
/// Ground-truth nutrients first, then `{angle}_{condition}_{nutrient}` in angle,
/// condition, nutrient order.
pub fn wide_columns(config: &EvaluationConfig) -> Vec<String> {
    let mut columns: Vec<String> = config.nutrients.iter().map(|n| n.name().to_string()).collect();
    for angle in &config.angles {
        for condition in &config.conditions {
            for &nutrient in &config.nutrients {
                columns.push(config.prediction_column(angle, condition, nutrient));
            }
        }
    }
    columns
}

/// Assemble the wide table from metadata and per-angle results
///
/// # Arguments
///
/// * `metadata` - Ground truth, in file order
/// * `angle_results` - One entry per configured angle, in configuration order
/// * `config` - Taxonomy and join mode
///
/// # Returns
///
/// One row per retained dish. Inner mode follows metadata order; lossless mode appends
/// dishes unknown to the metadata after it, sorted by identifier.
///
/// # Errors
///
/// `SchemaMismatch` if `angle_results` does not match the configured angles.
pub fn assemble(
    metadata: &Metadata,
    angle_results: &[AngleResults],
    config: &EvaluationConfig,
) -> Result<WideTable, EvaluationError> {
    let configured: Vec<&str> = config.angles.iter().map(String::as_str).collect();
    let provided: Vec<&str> = angle_results.iter().map(|r| r.angle.as_str()).collect();
    if configured != provided {
        return Err(EvaluationError::SchemaMismatch(format!(
            "angle results {:?} do not match configured angles {:?}",
            provided, configured
        )));
    }

    let mut table = WideTable::new(wide_columns(config))?;

    let dish_ids: Vec<String> = match config.join_mode {
        JoinMode::Inner => metadata
            .records()
            .iter()
            .filter(|record| angle_results.iter().all(|r| r.contains(&record.dish_id)))
            .map(|record| record.dish_id.clone())
            .collect(),
        JoinMode::Lossless => {
            let mut ids: Vec<String> =
                metadata.records().iter().map(|r| r.dish_id.clone()).collect();
            let extra: BTreeSet<&String> = angle_results
                .iter()
                .flat_map(|r| r.dishes.keys())
                .filter(|id| !metadata.contains(id))
                .collect();
            ids.extend(extra.into_iter().cloned());
            ids
        }
    };

    for dish_id in dish_ids {
        let truth = metadata.get(&dish_id);
        let mut values: Vec<Option<f64>> = config
            .nutrients
            .iter()
            .map(|&n| truth.and_then(|t| t.truth(n)))
            .collect();
        for results in angle_results {
            for condition in &config.conditions {
                let observation = results.observation(&dish_id, condition);
                values.extend(config.nutrients.iter().map(|&n| observation.map(|o| o.get(n))));
            }
        }
        table.push_row(WideRow { dish_id, values })?;
    }

    match config.join_mode {
        JoinMode::Inner => {
            let dropped_metadata = metadata.len() - table.len();
            log::info!(
                "Inner join kept {} of {} metadata dishes ({} dropped)",
                table.len(),
                metadata.len(),
                dropped_metadata
            );
            for results in angle_results {
                let orphaned = results
                    .dishes
                    .keys()
                    .filter(|id| !metadata.contains(id))
                    .count();
                if orphaned > 0 {
                    log::info!(
                        "{} {} dishes have no metadata and were dropped",
                        orphaned,
                        results.angle
                    );
                }
            }
        }
        JoinMode::Lossless => {
            log::info!("Lossless join produced {} dish rows", table.len());
        }
    }

    Ok(table)
}
