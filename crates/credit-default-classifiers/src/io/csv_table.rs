//! Comma-separated tables with a header row.
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use zip::ZipArchive;

use crate::data_handling::Table;

/// Cell contents read as a missing value.
pub const MISSING_TOKENS: [&str; 4] = ["", "NA", "NaN", "nan"];

fn parse_cell(value: &str) -> std::result::Result<Option<f64>, std::num::ParseFloatError> {
    let value = value.trim();
    if MISSING_TOKENS.contains(&value) {
        Ok(None)
    } else {
        value.parse::<f64>().map(Some)
    }
}

/// Read a CSV file into a [`Table`]. Every cell must be numeric or one of
/// [`MISSING_TOKENS`].
pub fn read_csv_table<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
    read_csv_from(file, &path.display().to_string())
}

/// Read the single `.csv` member of a zip archive into a [`Table`].
pub fn read_zipped_csv_table<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open zip archive: {}", path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Failed to read zip archive: {}", path.display()))?;

    let members: Vec<String> = archive
        .file_names()
        .filter(|name| name.to_lowercase().ends_with(".csv"))
        .map(str::to_string)
        .collect();
    let member = match members.as_slice() {
        [only] => only.clone(),
        [] => bail!("Zip archive {} holds no .csv file", path.display()),
        _ => bail!(
            "Zip archive {} holds {} .csv files, expected one: {:?}",
            path.display(),
            members.len(),
            members
        ),
    };
    log::debug!("Reading {} from {}", member, path.display());

    let entry = archive
        .by_name(&member)
        .with_context(|| format!("Failed to open {} in {}", member, path.display()))?;
    read_csv_from(entry, &format!("{}:{}", path.display(), member))
}

/// Read plain or zipped CSV, chosen by the `.zip` extension.
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<Table> {
    if is_zip(path.as_ref()) {
        read_zipped_csv_table(path)
    } else {
        read_csv_table(path)
    }
}

pub fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("zip"))
}

fn read_csv_from<R: Read>(input: R, source: &str) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(input);

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read CSV header row of {}", source))?
        .clone();
    let columns: Vec<String> = headers.iter().map(str::to_string).collect();
    if columns.is_empty() {
        return Err(anyhow!("CSV file {} has no columns", source));
    }

    let mut rows = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;
        let row = record
            .iter()
            .enumerate()
            .map(|(col, value)| {
                parse_cell(value).with_context(|| {
                    format!(
                        "Invalid value '{}' in column '{}' at row {}",
                        value,
                        headers.get(col).unwrap_or(""),
                        row_idx + 1
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }

    let table = Table::new(columns, rows);
    table.log_summary(source);
    Ok(table)
}

/// Write a [`Table`] as CSV; missing cells become empty fields.
pub fn write_csv_table<P: AsRef<Path>>(path: P, table: &Table) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| match cell {
            Some(v) => v.to_string(),
            None => String::new(),
        }))?;
    }
    writer.flush()?;
    Ok(())
}
