use anyhow::Result;
use std::path::Path;

/// Require an existing file ending in `.csv` or `.csv.zip`.
pub fn validate_csv_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();
    if !(name.ends_with(".csv") || name.ends_with(".csv.zip")) {
        anyhow::bail!("File must have a .csv or .csv.zip extension: {}", path.display());
    }

    if !path.exists() {
        anyhow::bail!("File does not exist: {}", path.display());
    }

    Ok(())
}
