use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use credit_default_classifiers::config::{PipelineConfig, SearchConfig};
use credit_default_classifiers::metrics::Scoring;

use crate::util::validate_csv_file;

/// Settings of one `train` run, read from JSON and overridable on the
/// command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub train_data: String,
    pub test_data: String,
    pub model_file: String,
    /// JSON-lines report destination.
    pub metrics_file: String,
    pub pipeline: PipelineConfig,
    pub search: SearchConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            train_data: String::from("files/input/train_data.csv.zip"),
            test_data: String::from("files/input/test_data.csv.zip"),
            model_file: String::from("files/models/model.bin"),
            metrics_file: String::from("files/output/metrics.json"),
            pipeline: PipelineConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl TrainConfig {
    pub fn from_json_file(config_path: &PathBuf) -> Result<Self> {
        let config_json = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
        serde_json::from_str(&config_json)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))
    }

    /// Load the config file (or defaults), apply CLI overrides and check
    /// that both input files exist.
    pub fn from_arguments(config_path: Option<&PathBuf>, matches: &ArgMatches) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_json_file(path)?,
            None => TrainConfig::default(),
        };

        // Apply CLI overrides
        if let Some(train_data) = matches.get_one::<String>("train_data") {
            config.train_data = train_data.clone();
        }
        if let Some(test_data) = matches.get_one::<String>("test_data") {
            config.test_data = test_data.clone();
        }
        if let Some(model_file) = matches.get_one::<String>("model_file") {
            config.model_file = model_file.clone();
        }
        if let Some(metrics_file) = matches.get_one::<String>("metrics_file") {
            config.metrics_file = metrics_file.clone();
        }
        if let Some(n_splits) = matches.get_one::<usize>("n_splits") {
            config.search.n_splits = *n_splits;
        }
        if let Some(scoring) = matches.get_one::<String>("scoring") {
            config.search.scoring = scoring.parse::<Scoring>()?;
        }
        if matches.get_flag("sequential") {
            config.search.parallel = false;
        }

        validate_csv_file(&config.train_data)?;
        validate_csv_file(&config.test_data)?;
        Ok(config)
    }

    pub fn template() -> Result<String> {
        Ok(serde_json::to_string_pretty(&TrainConfig::default())?)
    }
}
