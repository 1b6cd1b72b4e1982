//! Ground-truth dish metadata loading
//!
//! The metadata file is a headerless CSV whose first six columns are
//! `dish_id, calories, mass, fat, carb, protein`. Further columns (ingredient
//! breakdowns in the published dataset) are ignored. A blank nutrient cell is a missing
//! measurement and becomes a null ground-truth value.

use crate::error::EvaluationError;
use crate::nutrient::Nutrient;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Number of leading columns the loader consumes
pub const METADATA_COLUMNS: usize = 6;

/// Ground truth for one dish
#[derive(Debug, Clone, PartialEq)]
pub struct DishRecord {
    /// Whitespace-trimmed dish identifier
    pub dish_id: String,
    /// Measured totals in [`Nutrient::ALL`] order; `None` where the cell was blank
    pub values: [Option<f64>; 5],
}

impl DishRecord {
    /// Ground-truth value of one nutrient
    pub fn truth(&self, nutrient: Nutrient) -> Option<f64> {
        Nutrient::ALL
            .iter()
            .position(|&n| n == nutrient)
            .and_then(|i| self.values[i])
    }
}

/// Ground-truth records in file order, unique by identifier
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    records: Vec<DishRecord>,
    index: HashMap<String, usize>,
}

impl Metadata {
    /// Parse metadata from a headerless CSV source
    ///
    /// Duplicate identifiers keep their first occurrence; later ones are discarded
    /// without error.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError::SchemaMismatch` if any row has fewer than six columns
    /// or a non-blank nutrient cell is not a number, and `EvaluationError::Csv` for reader failures.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, EvaluationError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut metadata = Metadata::default();
        let mut duplicates = 0usize;

        for (line, record) in csv_reader.records().enumerate() {
            let record = record?;
            if record.len() < METADATA_COLUMNS {
                return Err(EvaluationError::SchemaMismatch(format!(
                    "metadata row {} has {} columns, expected at least {}",
                    line + 1,
                    record.len(),
                    METADATA_COLUMNS
                )));
            }

            let dish_id = record[0].trim().to_string();
            let value = |col: usize| -> Result<Option<f64>, EvaluationError> {
                let cell = record[col].trim();
                if cell.is_empty() {
                    return Ok(None);
                }
                cell.parse::<f64>().map(Some).map_err(|_| {
                    EvaluationError::SchemaMismatch(format!(
                        "metadata row {} column {}: '{}' is not a number",
                        line + 1,
                        col,
                        cell
                    ))
                })
            };
            let values = [value(1)?, value(2)?, value(3)?, value(4)?, value(5)?];

            if metadata.index.contains_key(&dish_id) {
                log::debug!("Discarding duplicate metadata row for dish {}", dish_id);
                duplicates += 1;
                continue;
            }
            metadata.index.insert(dish_id.clone(), metadata.records.len());
            metadata.records.push(DishRecord { dish_id, values });
        }

        log::info!(
            "Loaded {} dish records ({} duplicates discarded)",
            metadata.records.len(),
            duplicates
        );
        Ok(metadata)
    }

    /// Records in file order
    pub fn records(&self) -> &[DishRecord] {
        &self.records
    }

    /// Look up a dish by trimmed identifier
    pub fn get(&self, dish_id: &str) -> Option<&DishRecord> {
        self.index.get(dish_id).map(|&i| &self.records[i])
    }

    /// Whether a dish identifier is present
    pub fn contains(&self, dish_id: &str) -> bool {
        self.index.contains_key(dish_id)
    }

    /// Number of unique dishes
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no dish was loaded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Load ground-truth metadata from a CSV file
///
/// # Example
///
/// ```no_run
/// use nutrition_eval::io::metadata::load_metadata;
/// use std::path::Path;
///
/// let metadata = load_metadata(Path::new("data/raw/metadata/dish_metadata_cafe1.csv"))?;
/// println!("{} dishes", metadata.len());
/// # Ok::<(), nutrition_eval::EvaluationError>(())
/// ```
pub fn load_metadata(path: &Path) -> Result<Metadata, EvaluationError> {
    log::debug!("Reading metadata from {}", path.display());
    let file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => EvaluationError::MissingFile(path.to_path_buf()),
        _ => EvaluationError::from(e),
    })?;
    Metadata::from_reader(std::io::BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows_with_extra_columns() {
        let csv = "dish_1,500,200,10,50,20,ingr_1,rice,100\n  dish_2 ,250.5,120,3.5,30,8\n";
        let metadata = Metadata::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(metadata.len(), 2);

        let d1 = metadata.get("dish_1").unwrap();
        assert_eq!(d1.truth(Nutrient::Calories), Some(500.0));
        assert_eq!(d1.truth(Nutrient::Protein), Some(20.0));

        let d2 = metadata.get("dish_2").unwrap();
        assert_eq!(d2.dish_id, "dish_2");
        assert_eq!(d2.truth(Nutrient::Calories), Some(250.5));
    }

    #[test]
    fn test_duplicates_keep_first() {
        let csv = "D1,500,200,10,50,20\nD1,1,1,1,1,1\nD2,1,2,3,4,5\n";
        let metadata = Metadata::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.get("D1").unwrap().truth(Nutrient::Calories), Some(500.0));
        assert_eq!(metadata.records()[1].dish_id, "D2");
    }

    #[test]
    fn test_too_few_columns() {
        let csv = "D1,500,200,10,50,20\nD2,500,200\n";
        let result = Metadata::from_reader(csv.as_bytes());
        assert!(matches!(result, Err(EvaluationError::SchemaMismatch(_))));
    }

    #[test]
    fn test_non_numeric_nutrient() {
        let csv = "D1,lots,200,10,50,20\n";
        let result = Metadata::from_reader(csv.as_bytes());
        assert!(matches!(result, Err(EvaluationError::SchemaMismatch(_))));
    }

    #[test]
    fn test_blank_nutrient_is_null() {
        let csv = "D1,500,,10,50,20\nD2,300,150,5,30,10\n";
        let metadata = Metadata::from_reader(csv.as_bytes()).unwrap();
        let d1 = metadata.get("D1").unwrap();
        assert_eq!(d1.truth(Nutrient::Mass), None);
        assert_eq!(d1.truth(Nutrient::Calories), Some(500.0));
        assert_eq!(metadata.get("D2").unwrap().truth(Nutrient::Mass), Some(150.0));
    }

    #[test]
    fn test_empty_source() {
        let metadata = Metadata::from_reader("".as_bytes()).unwrap();
        assert!(metadata.is_empty());
    }
}
