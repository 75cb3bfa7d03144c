//! Record cleaning for the credit-card default dataset.
use serde::{Deserialize, Serialize};

use crate::data_handling::{Table, ID_COLUMN, LABEL_COLUMN, RAW_LABEL_COLUMN};
use crate::error::{PipelineError, Result};

/// Turns a raw table into the canonical feature/label schema.
///
/// Implementations must return a fresh table and leave the input untouched.
pub trait DataCleaner {
    fn clean(&self, table: &Table) -> Result<Table>;

    /// Name of the label column in the tables `clean` returns.
    fn label_column(&self) -> &str;
}

/// Column names and category codes used by [`CreditCardCleaner`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    pub id_column: String,
    pub raw_label_column: String,
    pub label_column: String,
    pub education_column: String,
    pub marriage_column: String,
    /// Education codes above this value are merged into it ("others").
    pub education_others: f64,
    /// Category code meaning "not available".
    pub unavailable_code: f64,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            id_column: ID_COLUMN.to_string(),
            raw_label_column: RAW_LABEL_COLUMN.to_string(),
            label_column: LABEL_COLUMN.to_string(),
            education_column: "EDUCATION".to_string(),
            marriage_column: "MARRIAGE".to_string(),
            education_others: 4.0,
            unavailable_code: 0.0,
        }
    }
}

/// Cleaning rules for the credit-card default files:
///
/// * drop the identifier column,
/// * rename the label column to `default`,
/// * drop rows with any missing cell,
/// * drop rows whose `EDUCATION` or `MARRIAGE` is the "not available" code,
/// * merge `EDUCATION` codes above 4 into 4.
///
/// A table that is already canonical (carries `default` and no identifier)
/// passes through the same rules, which makes cleaning idempotent.
#[derive(Debug, Clone, Default)]
pub struct CreditCardCleaner {
    config: CleanerConfig,
}

impl CreditCardCleaner {
    pub fn new(config: CleanerConfig) -> Self {
        CreditCardCleaner { config }
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    /// Index of the identifier column to drop, if any.
    ///
    /// A raw table (raw label present) must carry the identifier; a canonical
    /// one may not have it anymore.
    fn resolve_id(&self, table: &Table, is_raw: bool) -> Result<Option<usize>> {
        match table.column_index(&self.config.id_column) {
            Some(idx) => Ok(Some(idx)),
            None if is_raw => Err(PipelineError::MissingColumn(self.config.id_column.clone())),
            None => Ok(None),
        }
    }
}

impl DataCleaner for CreditCardCleaner {
    fn label_column(&self) -> &str {
        &self.config.label_column
    }

    fn clean(&self, table: &Table) -> Result<Table> {
        let (label_idx, is_raw) = match table.column_index(&self.config.raw_label_column) {
            Some(idx) => (idx, true),
            None => (table.require_column(&self.config.label_column)?, false),
        };
        let id_idx = self.resolve_id(table, is_raw)?;
        let education_idx = table.require_column(&self.config.education_column)?;
        let marriage_idx = table.require_column(&self.config.marriage_column)?;

        let kept: Vec<usize> = (0..table.ncols()).filter(|&i| Some(i) != id_idx).collect();
        let columns: Vec<String> = kept
            .iter()
            .map(|&i| {
                if i == label_idx {
                    self.config.label_column.clone()
                } else {
                    table.columns[i].clone()
                }
            })
            .collect();

        let mut rows = Vec::with_capacity(table.nrows());
        let mut dropped_missing = 0usize;
        let mut dropped_unavailable = 0usize;

        for row in &table.rows {
            if kept.iter().any(|&i| row[i].is_none()) {
                dropped_missing += 1;
                continue;
            }
            // Both cells are known to be present past the check above.
            let education = row[education_idx].unwrap_or_default();
            let marriage = row[marriage_idx].unwrap_or_default();
            if education == self.config.unavailable_code || marriage == self.config.unavailable_code {
                dropped_unavailable += 1;
                continue;
            }

            let cleaned = kept
                .iter()
                .map(|&i| {
                    if i == education_idx && education > self.config.education_others {
                        Some(self.config.education_others)
                    } else {
                        row[i]
                    }
                })
                .collect();
            rows.push(cleaned);
        }

        log::debug!(
            "Cleaning kept {} of {} rows ({} with missing values, {} with unavailable categories)",
            rows.len(),
            table.nrows(),
            dropped_missing,
            dropped_unavailable
        );

        Ok(Table::new(columns, rows))
    }
}
