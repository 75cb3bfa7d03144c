use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::evaluation::ReportRecord;
use crate::persist;
use crate::pipeline::FittedPipeline;

/// Destination for a finished run.
pub trait ReportWriter {
    fn save_model(&self, model: &FittedPipeline) -> Result<()>;

    /// Emit the records as JSON lines, in the given order.
    fn write_records(&self, records: &[ReportRecord]) -> Result<()>;
}

/// Writes the model artifact and the report to fixed paths on disk.
#[derive(Debug, Clone)]
pub struct FileReportWriter {
    pub model_path: PathBuf,
    pub report_path: PathBuf,
}

impl FileReportWriter {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(model_path: P, report_path: Q) -> Self {
        FileReportWriter {
            model_path: model_path.into(),
            report_path: report_path.into(),
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

/// Serialize `records` one per line into `out`.
pub fn write_json_lines<W: Write>(mut out: W, records: &[ReportRecord]) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut out, record).context("Failed to serialize report record")?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

impl ReportWriter for FileReportWriter {
    fn save_model(&self, model: &FittedPipeline) -> Result<()> {
        persist::save_model(model, &self.model_path)
            .with_context(|| format!("Failed to save model to {}", self.model_path.display()))
    }

    /// The report lands in a temporary sibling first and is renamed into
    /// place once complete.
    fn write_records(&self, records: &[ReportRecord]) -> Result<()> {
        ensure_parent(&self.report_path)?;
        let tmp_path = persist::tmp_sibling(&self.report_path);

        let file = File::create(&tmp_path)
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
        if let Err(err) = write_json_lines(BufWriter::new(file), records) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }
        if let Err(err) = fs::rename(&tmp_path, &self.report_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err).with_context(|| {
                format!(
                    "Failed to move report into place at {}",
                    self.report_path.display()
                )
            });
        }
        log::info!(
            "Wrote {} report records to {}",
            records.len(),
            self.report_path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{DatasetKind, MetricsRecord};

    fn record(dataset: DatasetKind) -> ReportRecord {
        ReportRecord::Metrics(MetricsRecord {
            dataset,
            precision: 0.5,
            balanced_accuracy: 0.6,
            recall: 0.7,
            f1_score: 0.58,
        })
    }

    #[test]
    fn writes_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("nested").join("metrics.jsonl");
        let writer = FileReportWriter::new(dir.path().join("model.bin"), &report);
        writer
            .write_records(&[record(DatasetKind::Train), record(DatasetKind::Test)])
            .unwrap();

        let text = fs::read_to_string(&report).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "metrics");
        assert_eq!(first["dataset"], "train");
        assert!(!dir.path().join("nested").join("metrics.jsonl.tmp").exists());
    }

    #[test]
    fn blocked_report_directory_fails_without_leaving_files() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let report = blocker.join("metrics.jsonl");
        let writer = FileReportWriter::new(dir.path().join("model.bin"), &report);

        let err = writer.write_records(&[record(DatasetKind::Train)]).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to create directory"));
        assert!(!report.exists());
        assert!(!blocker.join("metrics.jsonl.tmp").exists());
        assert!(blocker.is_file());
    }

    #[test]
    fn report_path_that_is_a_directory_keeps_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("metrics.jsonl");
        fs::create_dir(&report).unwrap();
        let writer = FileReportWriter::new(dir.path().join("model.bin"), &report);

        assert!(writer.write_records(&[record(DatasetKind::Test)]).is_err());
        assert!(report.is_dir());
        assert_eq!(fs::read_dir(&report).unwrap().count(), 0);
        assert!(!dir.path().join("metrics.jsonl.tmp").exists());
    }

    #[test]
    fn rewriting_replaces_the_previous_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("metrics.jsonl");
        let writer = FileReportWriter::new(dir.path().join("model.bin"), &report);
        writer.write_records(&[record(DatasetKind::Train), record(DatasetKind::Test)]).unwrap();
        writer.write_records(&[record(DatasetKind::Test)]).unwrap();
        assert_eq!(fs::read_to_string(&report).unwrap().lines().count(), 1);
    }
}
