//! Wide evaluation table: one row per dish, one column per value

use crate::error::EvaluationError;
use crate::io::tables::{ensure_parent_dir, format_cell, parse_cell};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

/// Name of the identifier column
pub const DISH_ID_COLUMN: &str = "dish_id";

/// One dish with its ground-truth and predicted values
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    /// Trimmed dish identifier
    pub dish_id: String,
    /// Values aligned with [`WideTable::columns`]
    pub values: Vec<Option<f64>>,
}

/// Dish-by-column table of optional values
///
/// Columns are the ground-truth nutrients followed by
/// `{angle}_{condition}_{nutrient}` predictions.
#[derive(Debug, Clone, Default)]
pub struct WideTable {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<WideRow>,
}

impl WideTable {
    /// Create an empty table with the given value columns
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError::SchemaMismatch` on duplicate column names or a column
    /// named `dish_id`.
    pub fn new(columns: Vec<String>) -> Result<Self, EvaluationError> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if name == DISH_ID_COLUMN || index.insert(name.clone(), i).is_some() {
                return Err(EvaluationError::SchemaMismatch(format!(
                    "duplicate column '{}'",
                    name
                )));
            }
        }
        Ok(Self {
            columns,
            index,
            rows: Vec::new(),
        })
    }

    /// Append a row
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError::SchemaMismatch` if the value count does not match the
    /// column count.
    pub fn push_row(&mut self, row: WideRow) -> Result<(), EvaluationError> {
        if row.values.len() != self.columns.len() {
            return Err(EvaluationError::SchemaMismatch(format!(
                "row for dish {} has {} values, table has {} columns",
                row.dish_id,
                row.values.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Value column names (without `dish_id`)
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in insertion order
    pub fn rows(&self) -> &[WideRow] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether a dish has a row
    pub fn contains_dish(&self, dish_id: &str) -> bool {
        self.rows.iter().any(|row| row.dish_id == dish_id)
    }

    /// Single cell lookup
    pub fn value(&self, dish_id: &str, column: &str) -> Option<f64> {
        let col = *self.index.get(column)?;
        self.rows
            .iter()
            .find(|row| row.dish_id == dish_id)
            .and_then(|row| row.values[col])
    }

    /// All values of a column, `None` if the column does not exist
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let col = *self.index.get(name)?;
        Some(self.rows.iter().map(|row| row.values[col]).collect())
    }

    /// Rows where both columns are non-null, as `(first, second)` pairs
    ///
    /// Returns `None` if either column does not exist.
    pub fn paired(&self, first: &str, second: &str) -> Option<Vec<(f64, f64)>> {
        let a = *self.index.get(first)?;
        let b = *self.index.get(second)?;
        Some(
            self.rows
                .iter()
                .filter_map(|row| match (row.values[a], row.values[b]) {
                    (Some(x), Some(y)) => Some((x, y)),
                    _ => None,
                })
                .collect(),
        )
    }

    /// Write the table as CSV with a `dish_id` leading column
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), EvaluationError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(
            std::iter::once(DISH_ID_COLUMN).chain(self.columns.iter().map(String::as_str)),
        )?;
        for row in &self.rows {
            let mut record = Vec::with_capacity(self.columns.len() + 1);
            record.push(row.dish_id.clone());
            record.extend(row.values.iter().map(|&v| format_cell(v)));
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
        log::info!("Wrote {} dish rows to {}", self.rows.len(), path.display());
        Ok(())
    }

    /// Read a table written by [`WideTable::write_csv`]
    ///
    /// # Errors
    ///
    /// `SchemaMismatch` if the first column is not `dish_id` or a cell is not numeric.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self, EvaluationError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        if headers.get(0) != Some(DISH_ID_COLUMN) {
            return Err(EvaluationError::SchemaMismatch(format!(
                "first column must be '{}'",
                DISH_ID_COLUMN
            )));
        }

        let mut table = WideTable::new(headers.iter().skip(1).map(str::to_string).collect())?;
        for (line, record) in csv_reader.records().enumerate() {
            let record = record?;
            let dish_id = record.get(0).unwrap_or("").trim().to_string();
            let values = record
                .iter()
                .skip(1)
                .enumerate()
                .map(|(col, cell)| {
                    parse_cell(cell).map_err(|reason| {
                        EvaluationError::SchemaMismatch(format!(
                            "row {} column '{}': {}",
                            line + 2,
                            table.columns[col],
                            reason
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            table.push_row(WideRow { dish_id, values })?;
        }
        Ok(table)
    }

    /// Read a table from a CSV file
    pub fn read_path(path: &Path) -> Result<Self, EvaluationError> {
        let file = std::fs::File::open(path)?;
        let table = Self::read_csv(std::io::BufReader::new(file))?;
        log::debug!("Read {} dish rows from {}", table.len(), path.display());
        Ok(table)
    }
}
