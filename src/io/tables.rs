//! CSV cell encoding and column sub-table extraction
//!
//! Null cells are written empty. Non-finite values are written as `NaN`, `inf` and
//! `-inf` so that a zero ground truth stays distinguishable from a missing one.

use crate::error::EvaluationError;
use std::path::Path;

/// Encode an optional value as a CSV cell
///
/// # Example
///
/// ```
/// use nutrition_eval::io::tables::format_cell;
///
/// assert_eq!(format_cell(None), "");
/// assert_eq!(format_cell(Some(300.0)), "300.0");
/// assert_eq!(format_cell(Some(f64::NAN)), "NaN");
/// assert_eq!(format_cell(Some(f64::INFINITY)), "inf");
/// ```
pub fn format_cell(value: Option<f64>) -> String {
    match value {
        None => String::new(),
        Some(v) => format!("{:?}", v),
    }
}

/// Decode a CSV cell written by [`format_cell`] (or by other tools)
///
/// Empty cells are null. Besides Rust float syntax, `nan`, `inf` and `-inf` in any case
/// are accepted.
pub fn parse_cell(cell: &str) -> Result<Option<f64>, String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(Some)
        .map_err(|_| format!("'{}' is not a number", cell))
}

/// Create the parent directory of `path` if it does not exist yet
pub fn ensure_parent_dir(path: &Path) -> Result<(), EvaluationError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Copy a subset of columns from one CSV file to another
///
/// Columns are written in the order given; names absent from the input are skipped
/// with a warning.
///
/// # Returns
///
/// Number of columns written
pub fn write_column_subset(
    input: &Path,
    columns: &[String],
    output: &Path,
) -> Result<usize, EvaluationError> {
    let mut reader = csv::Reader::from_path(input)?;
    let headers = reader.headers()?.clone();

    let mut positions = Vec::with_capacity(columns.len());
    for name in columns {
        match headers.iter().position(|h| h == name) {
            Some(pos) => positions.push(pos),
            None => log::warn!("Column {} not found in {}", name, input.display()),
        }
    }

    ensure_parent_dir(output)?;
    let mut writer = csv::Writer::from_path(output)?;
    writer.write_record(positions.iter().map(|&p| &headers[p]))?;
    for record in reader.records() {
        let record = record?;
        writer.write_record(positions.iter().map(|&p| record.get(p).unwrap_or("")))?;
    }
    writer.flush()?;

    log::debug!(
        "Wrote {} columns from {} to {}",
        positions.len(),
        input.display(),
        output.display()
    );
    Ok(positions.len())
}
