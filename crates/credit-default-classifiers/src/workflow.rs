//! End-to-end training run: clean, search, refit, evaluate, persist.
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cleaning::DataCleaner;
use crate::config::SearchConfig;
use crate::data_handling::{split_features_label, Table};
use crate::evaluation::{Evaluator, LabeledData, ReportRecord};
use crate::io::read_table;
use crate::model_selection::{CandidateResult, GridSearchCv, ParamSet};
use crate::pipeline::{FeaturePipeline, FittedPipeline};
use crate::report::ReportWriter;

/// What a finished run produced besides the files written by the writer.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub train_rows: usize,
    pub test_rows: usize,
    pub best_params: ParamSet,
    pub best_score: f64,
    pub cv_results: Vec<CandidateResult>,
    pub records: Vec<ReportRecord>,
}

/// A training run with injectable cleaning and output stages.
pub struct Workflow<C: DataCleaner, W: ReportWriter> {
    pub cleaner: C,
    pub writer: W,
    pub estimator: FeaturePipeline,
    pub search: SearchConfig,
    pub evaluator: Evaluator,
}

impl<C: DataCleaner, W: ReportWriter> Workflow<C, W> {
    pub fn new(cleaner: C, writer: W, estimator: FeaturePipeline, search: SearchConfig) -> Self {
        Workflow {
            cleaner,
            writer,
            estimator,
            search,
            evaluator: Evaluator::new(),
        }
    }

    pub fn run_files<P: AsRef<Path>, Q: AsRef<Path>>(&self, train: P, test: Q) -> Result<RunSummary> {
        let train_raw = read_table(&train)?;
        let test_raw = read_table(&test)?;
        self.run(&train_raw, &test_raw)
    }

    /// Fit on `train_raw`, report on both tables, then hand the model and
    /// the four report records to the writer.
    pub fn run(&self, train_raw: &Table, test_raw: &Table) -> Result<RunSummary> {
        let (model, summary) = self.fit_and_evaluate(train_raw, test_raw)?;
        self.writer.save_model(&model)?;
        self.writer.write_records(&summary.records)?;
        Ok(summary)
    }

    /// Everything except persistence.
    pub fn fit_and_evaluate(
        &self,
        train_raw: &Table,
        test_raw: &Table,
    ) -> Result<(FittedPipeline, RunSummary)> {
        let train = self.cleaner.clean(train_raw).context("Failed to clean training data")?;
        let test = self.cleaner.clean(test_raw).context("Failed to clean test data")?;
        log::info!(
            "Cleaned data: {} of {} training rows, {} of {} test rows kept",
            train.nrows(),
            train_raw.nrows(),
            test.nrows(),
            test_raw.nrows()
        );

        let label = self.cleaner.label_column();
        let (x_train, y_train) = split_features_label(&train, label)?;
        let (x_test, y_test) = split_features_label(&test, label)?;

        let search = GridSearchCv::new(self.search.grid.clone(), self.search.n_splits, self.search.scoring)
            .parallel(self.search.parallel);
        let result = search
            .fit(&self.estimator, &x_train, y_train.view())
            .context("Grid search failed")?;

        let records = self.evaluator.report(
            &result.best_estimator,
            LabeledData::new(&x_train, y_train.view()),
            LabeledData::new(&x_test, y_test.view()),
        )?;

        let summary = RunSummary {
            train_rows: x_train.nrows(),
            test_rows: x_test.nrows(),
            best_params: result.best_params,
            best_score: result.best_score,
            cv_results: result.cv_results,
            records,
        };
        Ok((result.best_estimator, summary))
    }
}
