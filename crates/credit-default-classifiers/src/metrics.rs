//! Binary classification metrics with label `1` as the positive class.
//!
//! Metrics whose denominator is zero (no predicted positives for precision,
//! no actual positives for recall) are undefined; like scikit-learn they
//! evaluate to `0.0` and a warning is logged.
use std::fmt;
use std::str::FromStr;

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// 2x2 confusion counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tn: u64,
    pub fp: u64,
    pub fn_: u64,
    pub tp: u64,
}

impl ConfusionMatrix {
    pub fn total(&self) -> u64 {
        self.tn + self.fp + self.fn_ + self.tp
    }
}

/// Count outcomes; any label other than `1` counts as negative.
pub fn confusion_matrix(y_true: ArrayView1<i32>, y_pred: ArrayView1<i32>) -> Result<ConfusionMatrix> {
    if y_true.len() != y_pred.len() {
        return Err(PipelineError::LengthMismatch {
            x_rows: y_pred.len(),
            y_len: y_true.len(),
        });
    }
    let mut cm = ConfusionMatrix::default();
    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        match (t == 1, p == 1) {
            (false, false) => cm.tn += 1,
            (false, true) => cm.fp += 1,
            (true, false) => cm.fn_ += 1,
            (true, true) => cm.tp += 1,
        }
    }
    Ok(cm)
}

fn ratio(num: u64, den: u64, metric: &str) -> f64 {
    if den == 0 {
        log::warn!("{} is ill-defined (zero denominator); reporting 0.0", metric);
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub fn precision(cm: &ConfusionMatrix) -> f64 {
    ratio(cm.tp, cm.tp + cm.fp, "precision")
}

pub fn recall(cm: &ConfusionMatrix) -> f64 {
    ratio(cm.tp, cm.tp + cm.fn_, "recall")
}

pub fn f1(cm: &ConfusionMatrix) -> f64 {
    ratio(2 * cm.tp, 2 * cm.tp + cm.fp + cm.fn_, "f1_score")
}

pub fn accuracy(cm: &ConfusionMatrix) -> f64 {
    ratio(cm.tp + cm.tn, cm.total(), "accuracy")
}

/// Mean of per-class recall over the classes present in `y_true`.
pub fn balanced_accuracy(cm: &ConfusionMatrix) -> f64 {
    let mut recalls = Vec::with_capacity(2);
    if cm.tn + cm.fp > 0 {
        recalls.push(cm.tn as f64 / (cm.tn + cm.fp) as f64);
    }
    if cm.tp + cm.fn_ > 0 {
        recalls.push(cm.tp as f64 / (cm.tp + cm.fn_) as f64);
    }
    match recalls.len() {
        0 => {
            log::warn!("balanced_accuracy is ill-defined on an empty set; reporting 0.0");
            0.0
        }
        1 => {
            log::warn!("y_true holds a single class; balanced_accuracy averages one recall");
            recalls[0]
        }
        n => recalls.iter().sum::<f64>() / n as f64,
    }
}

pub fn precision_score(y_true: ArrayView1<i32>, y_pred: ArrayView1<i32>) -> Result<f64> {
    Ok(precision(&confusion_matrix(y_true, y_pred)?))
}

pub fn recall_score(y_true: ArrayView1<i32>, y_pred: ArrayView1<i32>) -> Result<f64> {
    Ok(recall(&confusion_matrix(y_true, y_pred)?))
}

pub fn f1_score(y_true: ArrayView1<i32>, y_pred: ArrayView1<i32>) -> Result<f64> {
    Ok(f1(&confusion_matrix(y_true, y_pred)?))
}

pub fn balanced_accuracy_score(y_true: ArrayView1<i32>, y_pred: ArrayView1<i32>) -> Result<f64> {
    Ok(balanced_accuracy(&confusion_matrix(y_true, y_pred)?))
}

/// Criterion maximised by the grid search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    #[default]
    BalancedAccuracy,
    Accuracy,
    Precision,
    Recall,
    F1,
}

impl Scoring {
    pub fn score(&self, y_true: ArrayView1<i32>, y_pred: ArrayView1<i32>) -> Result<f64> {
        let cm = confusion_matrix(y_true, y_pred)?;
        Ok(match self {
            Scoring::BalancedAccuracy => balanced_accuracy(&cm),
            Scoring::Accuracy => accuracy(&cm),
            Scoring::Precision => precision(&cm),
            Scoring::Recall => recall(&cm),
            Scoring::F1 => f1(&cm),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scoring::BalancedAccuracy => "balanced_accuracy",
            Scoring::Accuracy => "accuracy",
            Scoring::Precision => "precision",
            Scoring::Recall => "recall",
            Scoring::F1 => "f1",
        }
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scoring {
    type Err = PipelineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "balanced_accuracy" => Ok(Scoring::BalancedAccuracy),
            "accuracy" => Ok(Scoring::Accuracy),
            "precision" => Ok(Scoring::Precision),
            "recall" => Ok(Scoring::Recall),
            "f1" | "f1_score" => Ok(Scoring::F1),
            _ => Err(PipelineError::UnknownScoring(s.to_string())),
        }
    }
}
