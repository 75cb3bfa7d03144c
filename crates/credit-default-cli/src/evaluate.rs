use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use credit_default_classifiers::cleaning::{CreditCardCleaner, DataCleaner};
use credit_default_classifiers::data_handling::split_features_label;
use credit_default_classifiers::evaluation::{DatasetKind, Evaluator, LabeledData, ReportRecord};
use credit_default_classifiers::io::read_table;
use credit_default_classifiers::persist::load_model;
use credit_default_classifiers::report::writer::write_json_lines;

/// Score a persisted model on a labeled CSV file (plain or zipped): one
/// metrics record and one confusion record, both tagged `test`.
pub fn run_evaluation<P: AsRef<Path>, Q: AsRef<Path>>(model_path: P, data_path: Q) -> Result<Vec<ReportRecord>> {
    run_evaluation_with(&CreditCardCleaner::default(), model_path, data_path)
}

pub fn run_evaluation_with<C: DataCleaner, P: AsRef<Path>, Q: AsRef<Path>>(
    cleaner: &C,
    model_path: P,
    data_path: Q,
) -> Result<Vec<ReportRecord>> {
    let model = load_model(&model_path)
        .with_context(|| format!("Failed to load model from {}", model_path.as_ref().display()))?;
    let raw = read_table(&data_path)?;
    let table = cleaner.clean(&raw)?;
    let (x, y) = split_features_label(&table, cleaner.label_column())?;

    let evaluator = Evaluator::new();
    let data = LabeledData::new(&x, y.view());
    Ok(vec![
        ReportRecord::Metrics(evaluator.metrics(&model, data, DatasetKind::Test)?),
        ReportRecord::ConfusionMatrix(evaluator.confusion_matrix(&model, data, DatasetKind::Test)?),
    ])
}

pub fn print_records<W: Write>(out: W, records: &[ReportRecord]) -> Result<()> {
    write_json_lines(out, records)
}
