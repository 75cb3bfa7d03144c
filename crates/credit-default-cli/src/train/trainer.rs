use anyhow::Result;

use credit_default_classifiers::cleaning::CreditCardCleaner;
use credit_default_classifiers::model_selection::describe;
use credit_default_classifiers::pipeline::FeaturePipeline;
use credit_default_classifiers::report::FileReportWriter;
use credit_default_classifiers::workflow::{RunSummary, Workflow};

use crate::train::input::TrainConfig;

pub fn run_training(config: &TrainConfig) -> Result<RunSummary> {
    log::info!(
        "Training on {} (test set {}), {}-fold CV scored by {}",
        config.train_data,
        config.test_data,
        config.search.n_splits,
        config.search.scoring
    );

    let workflow = Workflow::new(
        CreditCardCleaner::default(),
        FileReportWriter::new(&config.model_file, &config.metrics_file),
        FeaturePipeline::from_config(config.pipeline.clone()),
        config.search.clone(),
    );
    let summary = workflow.run_files(&config.train_data, &config.test_data)?;

    log::info!(
        "Best CV {} = {:.4} with {{{}}}; model written to {}, report to {}",
        config.search.scoring,
        summary.best_score,
        describe(&summary.best_params),
        config.model_file,
        config.metrics_file
    );
    Ok(summary)
}
