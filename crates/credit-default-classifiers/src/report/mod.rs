//! Persistence of run outputs: the fitted model and the JSON-lines report.
pub mod writer;

pub use writer::{FileReportWriter, ReportWriter};
