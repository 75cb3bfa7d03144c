mod common;

use std::fs;
use std::io::Write;
use std::path::Path;

use credit_default_classifiers::cleaning::{CleanerConfig, CreditCardCleaner, DataCleaner};
use credit_default_classifiers::data_handling::{split_features_label, Table, LABEL_COLUMN};
use credit_default_classifiers::evaluation::{DatasetKind, ReportRecord};
use credit_default_classifiers::io::write_csv_table;
use credit_default_classifiers::model_selection::ParamValue;
use credit_default_classifiers::persist::load_model;
use credit_default_classifiers::pipeline::FeaturePipeline;
use credit_default_classifiers::report::FileReportWriter;
use credit_default_classifiers::workflow::Workflow;

use common::{quick_search, raw_table};

/// Zip `table` as a single CSV member, the way the raw files are shipped.
fn write_zipped_csv(path: &Path, member: &str, table: &Table) {
    let plain = path.with_extension("plain.csv");
    write_csv_table(&plain, table).unwrap();
    let mut zip = zip::ZipWriter::new(fs::File::create(path).unwrap());
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    zip.start_file(member, options).unwrap();
    zip.write_all(&fs::read(&plain).unwrap()).unwrap();
    zip.finish().unwrap();
    fs::remove_file(plain).unwrap();
}

#[test]
fn full_run_writes_model_and_four_records() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let train_csv = dir.path().join("train.csv");
    let test_csv = dir.path().join("test.csv");
    write_csv_table(&train_csv, &raw_table(100, 40, 1)).unwrap();
    write_csv_table(&test_csv, &raw_table(20, 8, 2)).unwrap();

    let model_path = dir.path().join("out").join("model.bin");
    let report_path = dir.path().join("out").join("metrics.jsonl");
    let workflow = Workflow::new(
        CreditCardCleaner::default(),
        FileReportWriter::new(&model_path, &report_path),
        FeaturePipeline::credit_default(),
        quick_search(5),
    );
    let summary = workflow.run_files(&train_csv, &test_csv).unwrap();

    assert_eq!(summary.train_rows, 100);
    assert_eq!(summary.test_rows, 20);
    assert_eq!(summary.cv_results.len(), 1);
    assert_eq!(summary.cv_results[0].fold_scores.len(), 5);
    assert_eq!(summary.best_params["select_k_best.k"], ParamValue::Int(20));
    assert!((0.0..=1.0).contains(&summary.best_score));

    // Records come back in the fixed order and match the file.
    let lines: Vec<serde_json::Value> = fs::read_to_string(&report_path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 4);
    let layout: Vec<(&str, &str)> = lines
        .iter()
        .map(|v| (v["type"].as_str().unwrap(), v["dataset"].as_str().unwrap()))
        .collect();
    assert_eq!(
        layout,
        vec![
            ("metrics", "train"),
            ("metrics", "test"),
            ("cm_matrix", "train"),
            ("cm_matrix", "test"),
        ]
    );
    for line in &lines[..2] {
        for key in ["precision", "balanced_accuracy", "recall", "f1_score"] {
            let value = line[key].as_f64().unwrap();
            assert!((0.0..=1.0).contains(&value), "{} = {}", key, value);
        }
    }
    let cm_total = |v: &serde_json::Value| -> u64 {
        ["true_0", "true_1"]
            .iter()
            .flat_map(|t| ["predicted_0", "predicted_1"].map(|p| v[*t][p].as_u64().unwrap()))
            .sum()
    };
    assert_eq!(cm_total(&lines[2]), 100);
    assert_eq!(cm_total(&lines[3]), 20);

    match &summary.records[3] {
        ReportRecord::ConfusionMatrix(cm) => {
            assert_eq!(cm.dataset, DatasetKind::Test);
            assert_eq!(cm.true_1.predicted_0 + cm.true_1.predicted_1, 8);
        }
        other => panic!("unexpected record {:?}", other),
    }

    // The saved artifact predicts like the model that produced the report.
    let model = load_model(&model_path).unwrap();
    let test = CreditCardCleaner::default().clean(&raw_table(20, 8, 2)).unwrap();
    let (x_test, y_test) = split_features_label(&test, LABEL_COLUMN).unwrap();
    let predicted = model.predict(&x_test).unwrap();
    let tp = predicted
        .iter()
        .zip(y_test.iter())
        .filter(|(p, t)| **p == 1 && **t == 1)
        .count() as u64;
    match &summary.records[3] {
        ReportRecord::ConfusionMatrix(cm) => assert_eq!(cm.true_1.predicted_1, tp),
        _ => unreachable!(),
    }
}

#[test]
fn search_failure_leaves_no_report() {
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("metrics.jsonl");
    let mut search = quick_search(5);
    search.grid.insert("classifier.momentum", vec![ParamValue::Float(0.9)]);
    let workflow = Workflow::new(
        CreditCardCleaner::default(),
        FileReportWriter::new(dir.path().join("model.bin"), &report_path),
        FeaturePipeline::credit_default(),
        search,
    );
    assert!(workflow.run(&raw_table(100, 40, 1), &raw_table(20, 8, 2)).is_err());
    assert!(!report_path.exists());
    assert!(!dir.path().join("model.bin").exists());
}

#[test]
fn custom_label_name_flows_through_the_run() {
    let cleaner = CreditCardCleaner::new(CleanerConfig {
        label_column: "target".to_string(),
        ..CleanerConfig::default()
    });
    let dir = tempfile::tempdir().unwrap();
    let workflow = Workflow::new(
        cleaner,
        FileReportWriter::new(dir.path().join("model.bin"), dir.path().join("metrics.jsonl")),
        FeaturePipeline::credit_default(),
        quick_search(3),
    );
    let (model, summary) = workflow
        .fit_and_evaluate(&raw_table(100, 40, 1), &raw_table(20, 8, 2))
        .unwrap();
    assert_eq!(summary.train_rows, 100);
    assert_eq!(summary.records.len(), 4);
    assert!(!model.input_columns().iter().any(|c| c == "target"));
}

#[test]
fn zipped_inputs_are_read_like_plain_csv() {
    let dir = tempfile::tempdir().unwrap();
    let train_zip = dir.path().join("train_data.csv.zip");
    let test_zip = dir.path().join("test_data.csv.zip");
    write_zipped_csv(&train_zip, "train_default_of_credit_card_clients.csv", &raw_table(100, 40, 1));
    write_zipped_csv(&test_zip, "test_default_of_credit_card_clients.csv", &raw_table(20, 8, 2));

    let report_path = dir.path().join("output").join("metrics.json");
    let workflow = Workflow::new(
        CreditCardCleaner::default(),
        FileReportWriter::new(dir.path().join("models").join("model.bin"), &report_path),
        FeaturePipeline::credit_default(),
        quick_search(3),
    );
    let summary = workflow.run_files(&train_zip, &test_zip).unwrap();
    assert_eq!(summary.train_rows, 100);
    assert_eq!(summary.test_rows, 20);
    assert_eq!(fs::read_to_string(&report_path).unwrap().lines().count(), 4);
}

#[test]
fn model_save_failure_aborts_before_the_report() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("models");
    fs::write(&blocker, b"").unwrap();
    let report_path = dir.path().join("metrics.jsonl");
    let workflow = Workflow::new(
        CreditCardCleaner::default(),
        FileReportWriter::new(blocker.join("model.bin"), &report_path),
        FeaturePipeline::credit_default(),
        quick_search(3),
    );

    let err = workflow
        .run(&raw_table(100, 40, 1), &raw_table(20, 8, 2))
        .unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to save model"));
    assert!(!report_path.exists());
    assert!(!dir.path().join("metrics.jsonl.tmp").exists());
    assert!(blocker.is_file());
}
