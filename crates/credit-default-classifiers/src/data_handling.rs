//! Tabular containers and the credit-card schema.
//!
//! `Table` is the loosely typed form used before cleaning (every cell may be
//! missing). `FeatureMatrix` plus a label vector is what the pipeline and the
//! evaluator consume once a table has been cleaned and split.
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Identifier column of the raw files.
pub const ID_COLUMN: &str = "ID";
/// Label column as named in the raw files.
pub const RAW_LABEL_COLUMN: &str = "default payment next month";
/// Canonical label column after cleaning.
pub const LABEL_COLUMN: &str = "default";

pub const CATEGORICAL_COLUMNS: [&str; 3] = ["SEX", "EDUCATION", "MARRIAGE"];

pub const NUMERIC_COLUMNS: [&str; 20] = [
    "LIMIT_BAL",
    "AGE",
    "PAY_0",
    "PAY_2",
    "PAY_3",
    "PAY_4",
    "PAY_5",
    "PAY_6",
    "BILL_AMT1",
    "BILL_AMT2",
    "BILL_AMT3",
    "BILL_AMT4",
    "BILL_AMT5",
    "BILL_AMT6",
    "PAY_AMT1",
    "PAY_AMT2",
    "PAY_AMT3",
    "PAY_AMT4",
    "PAY_AMT5",
    "PAY_AMT6",
];

/// The 23 explanatory columns in file order.
pub fn feature_columns() -> Vec<String> {
    let mut columns = vec!["LIMIT_BAL".to_string()];
    columns.extend(CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()));
    columns.extend(NUMERIC_COLUMNS.iter().skip(1).map(|c| c.to_string()));
    columns
}

/// Rows of optional numeric cells under named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<f64>>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<f64>>>) -> Self {
        Table { columns, rows }
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Same as `column_index` but a missing column is a schema error.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
    }

    /// Values of one column, `None` where missing.
    pub fn column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|row| row[idx]).collect())
    }

    pub fn log_summary(&self, name: &str) {
        let missing = self
            .rows
            .iter()
            .filter(|row| row.iter().any(|cell| cell.is_none()))
            .count();
        log::info!(
            "{}: {} rows x {} columns ({} rows with missing values)",
            name,
            self.nrows(),
            self.ncols(),
            missing
        );
    }
}

/// Dense explanatory attributes with their column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub data: Array2<f64>,
}

impl FeatureMatrix {
    pub fn new(columns: Vec<String>, data: Array2<f64>) -> Result<Self> {
        if columns.len() != data.ncols() {
            return Err(PipelineError::SchemaMismatch {
                expected: columns,
                found: (0..data.ncols()).map(|i| format!("#{}", i)).collect(),
            });
        }
        Ok(FeatureMatrix { columns, data })
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Row subset preserving column names and the given row order.
    pub fn select_rows(&self, indices: &[usize]) -> FeatureMatrix {
        FeatureMatrix {
            columns: self.columns.clone(),
            data: self.data.select(Axis(0), indices),
        }
    }

    /// First `n` rows (or all of them when fewer exist).
    pub fn head(&self, n: usize) -> FeatureMatrix {
        let indices: Vec<usize> = (0..n.min(self.nrows())).collect();
        self.select_rows(&indices)
    }
}

/// Separate a cleaned table into the explanatory matrix and the label vector.
///
/// Every column except `label_column` becomes a feature, in table order.
/// Labels are read as integers; any remaining missing cell is an error since
/// the table is expected to have gone through the cleaner first.
pub fn split_features_label(table: &Table, label_column: &str) -> Result<(FeatureMatrix, Array1<i32>)> {
    let label_idx = table.require_column(label_column)?;
    let feature_indices: Vec<usize> = (0..table.ncols()).filter(|&i| i != label_idx).collect();
    let columns: Vec<String> = feature_indices
        .iter()
        .map(|&i| table.columns[i].clone())
        .collect();

    let mut values = Vec::with_capacity(table.nrows() * feature_indices.len());
    let mut labels = Vec::with_capacity(table.nrows());

    for (row_idx, row) in table.rows.iter().enumerate() {
        for &col in &feature_indices {
            let value = row[col].ok_or_else(|| PipelineError::MissingValue {
                column: table.columns[col].clone(),
                row: row_idx,
            })?;
            values.push(value);
        }
        let label = row[label_idx].ok_or_else(|| PipelineError::MissingValue {
            column: label_column.to_string(),
            row: row_idx,
        })?;
        labels.push(label.round() as i32);
    }

    let data = Array2::from_shape_vec((table.nrows(), feature_indices.len()), values)
        .map_err(|e| PipelineError::InvalidParam {
            path: "table".to_string(),
            reason: e.to_string(),
        })?;

    Ok((FeatureMatrix::new(columns, data)?, Array1::from_vec(labels)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> Table {
        Table::new(
            vec!["A".into(), "default".into(), "B".into()],
            vec![
                vec![Some(1.0), Some(0.0), Some(10.0)],
                vec![Some(2.0), Some(1.0), Some(20.0)],
                vec![Some(3.0), Some(1.0), Some(30.0)],
            ],
        )
    }

    #[test]
    fn feature_columns_has_23_entries_in_file_order() {
        let columns = feature_columns();
        assert_eq!(columns.len(), 23);
        assert_eq!(columns[0], "LIMIT_BAL");
        assert_eq!(columns[1], "SEX");
        assert_eq!(columns[4], "AGE");
        assert_eq!(columns[22], "PAY_AMT6");
    }

    #[test]
    fn split_keeps_rows_aligned() {
        let (x, y) = split_features_label(&small_table(), "default").unwrap();
        assert_eq!(x.columns, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(x.data.row(1).to_vec(), vec![2.0, 20.0]);
        assert_eq!(y.to_vec(), vec![0, 1, 1]);
    }

    #[test]
    fn split_rejects_missing_label_column() {
        let err = split_features_label(&small_table(), "label").unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(c) if c == "label"));
    }

    #[test]
    fn split_rejects_missing_cells() {
        let mut table = small_table();
        table.rows[2][2] = None;
        let err = split_features_label(&table, "default").unwrap_err();
        assert!(matches!(err, PipelineError::MissingValue { row: 2, .. }));
    }
}
