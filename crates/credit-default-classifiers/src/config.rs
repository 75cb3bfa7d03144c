use serde::{Deserialize, Serialize};

use crate::data_handling::{CATEGORICAL_COLUMNS, NUMERIC_COLUMNS};
use crate::metrics::Scoring;
use crate::model_selection::{ParamGrid, ParamValue};

/// Hyper-parameters of the multi-layer perceptron.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MlpParams {
    pub hidden_layer_sizes: Vec<usize>,
    /// L2 penalty strength.
    pub alpha: f64,
    pub learning_rate_init: f64,
    /// Epoch cap. Reaching it is accepted, not an error.
    pub max_iter: usize,
    /// Minibatch size; `None` means `min(200, n_samples)`.
    pub batch_size: Option<usize>,
    pub tol: f64,
    pub n_iter_no_change: usize,
    pub beta_1: f64,
    pub beta_2: f64,
    pub epsilon: f64,
    pub shuffle: bool,
    pub random_state: u64,
}

impl Default for MlpParams {
    fn default() -> Self {
        Self {
            hidden_layer_sizes: vec![100],
            alpha: 1e-4,
            learning_rate_init: 1e-3,
            max_iter: 200,
            batch_size: None,
            tol: 1e-4,
            n_iter_no_change: 10,
            beta_1: 0.9,
            beta_2: 0.999,
            epsilon: 1e-8,
            shuffle: true,
            random_state: 42,
        }
    }
}

/// Shape of the feature pipeline before any grid parameter is applied.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub categorical_columns: Vec<String>,
    pub numeric_columns: Vec<String>,
    pub k_best: usize,
    pub n_components: Option<usize>,
    pub classifier: MlpParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            categorical_columns: CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            numeric_columns: NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
            k_best: 10,
            n_components: None,
            classifier: MlpParams {
                max_iter: 15000,
                random_state: 42,
                ..MlpParams::default()
            },
        }
    }
}

/// Cross-validated search settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub n_splits: usize,
    pub scoring: Scoring,
    /// Fan fold fits out over the rayon thread pool.
    pub parallel: bool,
    pub grid: ParamGrid,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_splits: 10,
            scoring: Scoring::BalancedAccuracy,
            parallel: true,
            grid: default_grid(),
        }
    }
}

/// The tuned single-point grid for the credit-default model.
pub fn default_grid() -> ParamGrid {
    ParamGrid::new()
        .with("pca.n_components", vec![ParamValue::None])
        .with("select_k_best.k", vec![ParamValue::Int(20)])
        .with(
            "classifier.hidden_layer_sizes",
            vec![ParamValue::Layers(vec![50, 30, 40, 60])],
        )
        .with("classifier.alpha", vec![ParamValue::Float(0.28)])
        .with("classifier.learning_rate_init", vec![ParamValue::Float(0.001)])
}
