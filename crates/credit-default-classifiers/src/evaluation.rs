//! Post-fit evaluation of a model on labeled data.
use std::fmt;

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::data_handling::FeatureMatrix;
use crate::error::Result;
use crate::metrics::{self, ConfusionMatrix};
use crate::model_selection::Predictor;

/// Which split a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Train,
    Test,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Train => f.write_str("train"),
            DatasetKind::Test => f.write_str("test"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub dataset: DatasetKind,
    pub precision: f64,
    pub balanced_accuracy: f64,
    pub recall: f64,
    pub f1_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictedCounts {
    pub predicted_0: u64,
    pub predicted_1: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionRecord {
    pub dataset: DatasetKind,
    pub true_0: PredictedCounts,
    pub true_1: PredictedCounts,
}

impl ConfusionRecord {
    pub fn from_matrix(dataset: DatasetKind, cm: &ConfusionMatrix) -> Self {
        ConfusionRecord {
            dataset,
            true_0: PredictedCounts {
                predicted_0: cm.tn,
                predicted_1: cm.fp,
            },
            true_1: PredictedCounts {
                predicted_0: cm.fn_,
                predicted_1: cm.tp,
            },
        }
    }

    pub fn total(&self) -> u64 {
        self.true_0.predicted_0 + self.true_0.predicted_1 + self.true_1.predicted_0 + self.true_1.predicted_1
    }
}

/// One line of the JSON-lines report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReportRecord {
    #[serde(rename = "metrics")]
    Metrics(MetricsRecord),
    #[serde(rename = "cm_matrix")]
    ConfusionMatrix(ConfusionRecord),
}

/// Labeled rows of one split.
#[derive(Debug, Clone, Copy)]
pub struct LabeledData<'a> {
    pub x: &'a FeatureMatrix,
    pub y: ArrayView1<'a, i32>,
}

impl<'a> LabeledData<'a> {
    pub fn new(x: &'a FeatureMatrix, y: ArrayView1<'a, i32>) -> Self {
        LabeledData { x, y }
    }
}

/// Computes metrics and confusion counts for a fitted model.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Evaluator
    }

    fn confusion<P: Predictor>(&self, model: &P, data: LabeledData<'_>) -> Result<ConfusionMatrix> {
        let predicted = model.predict(data.x)?;
        metrics::confusion_matrix(data.y, predicted.view())
    }

    fn metrics_from(dataset: DatasetKind, cm: &ConfusionMatrix) -> MetricsRecord {
        MetricsRecord {
            dataset,
            precision: metrics::precision(cm),
            balanced_accuracy: metrics::balanced_accuracy(cm),
            recall: metrics::recall(cm),
            f1_score: metrics::f1(cm),
        }
    }

    /// Precision, recall, F1 and balanced accuracy from a single prediction pass.
    pub fn metrics<P: Predictor>(
        &self,
        model: &P,
        data: LabeledData<'_>,
        dataset: DatasetKind,
    ) -> Result<MetricsRecord> {
        let cm = self.confusion(model, data)?;
        Ok(Self::metrics_from(dataset, &cm))
    }

    pub fn confusion_matrix<P: Predictor>(
        &self,
        model: &P,
        data: LabeledData<'_>,
        dataset: DatasetKind,
    ) -> Result<ConfusionRecord> {
        let cm = self.confusion(model, data)?;
        Ok(ConfusionRecord::from_matrix(dataset, &cm))
    }

    /// Train metrics, test metrics, train matrix, test matrix.
    pub fn report<P: Predictor>(
        &self,
        model: &P,
        train: LabeledData<'_>,
        test: LabeledData<'_>,
    ) -> Result<Vec<ReportRecord>> {
        let train_cm = self.confusion(model, train)?;
        let test_cm = self.confusion(model, test)?;
        let records = vec![
            ReportRecord::Metrics(Self::metrics_from(DatasetKind::Train, &train_cm)),
            ReportRecord::Metrics(Self::metrics_from(DatasetKind::Test, &test_cm)),
            ReportRecord::ConfusionMatrix(ConfusionRecord::from_matrix(DatasetKind::Train, &train_cm)),
            ReportRecord::ConfusionMatrix(ConfusionRecord::from_matrix(DatasetKind::Test, &test_cm)),
        ];
        for record in &records {
            if let ReportRecord::Metrics(m) = record {
                log::info!(
                    "{}: precision={:.4} recall={:.4} f1={:.4} balanced_accuracy={:.4}",
                    m.dataset,
                    m.precision,
                    m.recall,
                    m.f1_score,
                    m.balanced_accuracy
                );
            }
        }
        Ok(records)
    }
}
