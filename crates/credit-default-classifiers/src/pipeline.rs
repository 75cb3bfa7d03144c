//! The credit-default feature pipeline.
//!
//! Stages run in a fixed order: `preprocessor` (one-hot encoding of the
//! categorical columns, standard scaling of the numeric ones, passthrough of
//! anything else), `select_k_best`, `pca`, and the `classifier`. A
//! [`FeaturePipeline`] is only a configuration; fitting it yields an
//! immutable [`FittedPipeline`].
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::config::{MlpParams, PipelineConfig};
use crate::data_handling::FeatureMatrix;
use crate::decomposition::{FittedPca, Pca};
use crate::error::{PipelineError, Result};
use crate::feature_selection::univariate_selection::{KBestSupport, SelectKBest};
use crate::model_selection::{Estimator, ParamValue, Predictor};
use crate::models::{ClassifierModel, MlpClassifier};
use crate::preprocessing::{ColumnTransformer, FittedColumnTransformer};

#[derive(Clone, Debug, PartialEq)]
pub struct FeaturePipeline {
    pub preprocessor: ColumnTransformer,
    pub select_k_best: SelectKBest,
    pub pca: Pca,
    pub classifier: MlpClassifier,
}

impl Default for FeaturePipeline {
    fn default() -> Self {
        Self::from_config(PipelineConfig::default())
    }
}

impl FeaturePipeline {
    pub fn from_config(config: PipelineConfig) -> Self {
        FeaturePipeline {
            preprocessor: ColumnTransformer::new(config.categorical_columns, config.numeric_columns),
            select_k_best: SelectKBest::new(config.k_best),
            pca: Pca::new(config.n_components),
            classifier: MlpClassifier::new(config.classifier),
        }
    }

    /// The tuned credit-default model: K = 20 best features, every PCA
    /// component, and a (50, 30, 40, 60) network with `alpha = 0.28`.
    pub fn credit_default() -> Self {
        Self::from_config(PipelineConfig {
            k_best: 20,
            n_components: None,
            classifier: MlpParams {
                hidden_layer_sizes: vec![50, 30, 40, 60],
                alpha: 0.28,
                learning_rate_init: 0.001,
                max_iter: 15000,
                random_state: 42,
                ..MlpParams::default()
            },
            ..PipelineConfig::default()
        })
    }
}

impl Estimator for FeaturePipeline {
    type Fitted = FittedPipeline;

    fn set_param(&mut self, path: &str, value: &ParamValue) -> Result<()> {
        let (stage, name) = path
            .split_once('.')
            .ok_or_else(|| PipelineError::UnknownParam(path.to_string()))?;
        match (stage, name) {
            ("select_k_best", "k") => self.select_k_best.k = value.as_usize(path)?,
            ("pca", "n_components") => self.pca.n_components = value.as_optional_usize(path)?,
            ("classifier", name) => self.classifier.set_param(name, value)?,
            _ => return Err(PipelineError::UnknownParam(path.to_string())),
        }
        Ok(())
    }

    fn fit(&self, x: &FeatureMatrix, y: ArrayView1<i32>) -> Result<FittedPipeline> {
        if x.nrows() != y.len() {
            return Err(PipelineError::LengthMismatch {
                x_rows: x.nrows(),
                y_len: y.len(),
            });
        }
        if x.nrows() == 0 {
            return Err(PipelineError::EmptyInput("feature pipeline"));
        }

        let preprocessor = self.preprocessor.fit(x)?;
        let encoded = preprocessor.transform(x)?;
        let support = self.select_k_best.fit(encoded.view(), y)?;
        let selected = support.transform(encoded.view())?;
        let pca = self.pca.fit(selected.view())?;
        let projected = pca.transform(selected.view())?;

        let mut classifier = self.classifier.clone();
        classifier.fit(projected.view(), y)?;

        log::debug!(
            "Fitted pipeline on {} rows: {} encoded -> {} selected -> {} components, {} epochs",
            x.nrows(),
            encoded.ncols(),
            selected.ncols(),
            pca.n_components(),
            classifier.n_iter()
        );

        Ok(FittedPipeline {
            preprocessor,
            select_k_best: support,
            pca,
            classifier,
        })
    }
}

/// A fitted pipeline. Immutable; safe to share across threads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    preprocessor: FittedColumnTransformer,
    select_k_best: KBestSupport,
    pca: FittedPca,
    classifier: MlpClassifier,
}

impl FittedPipeline {
    /// Column names, in order, the pipeline was fitted on.
    pub fn input_columns(&self) -> &[String] {
        &self.preprocessor.input_columns
    }

    /// Names of the encoded columns kept by feature selection.
    pub fn selected_features(&self) -> Vec<String> {
        let names = self.preprocessor.output_columns();
        self.select_k_best
            .indices
            .iter()
            .map(|&i| names[i].clone())
            .collect()
    }

    pub fn classifier(&self) -> &MlpClassifier {
        &self.classifier
    }

    /// Run every stage except the classifier.
    pub fn transform(&self, x: &FeatureMatrix) -> Result<Array2<f64>> {
        let encoded = self.preprocessor.transform(x)?;
        let selected = self.select_k_best.transform(encoded.view())?;
        self.pca.transform(selected.view())
    }

    pub fn predict_proba(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        let projected = self.transform(x)?;
        self.classifier.predict_proba(projected.view())
    }

    pub fn predict(&self, x: &FeatureMatrix) -> Result<Array1<i32>> {
        let projected = self.transform(x)?;
        self.classifier.predict(projected.view())
    }
}

impl Predictor for FittedPipeline {
    fn predict(&self, x: &FeatureMatrix) -> Result<Array1<i32>> {
        FittedPipeline::predict(self, x)
    }
}
