//! Univariate feature selection methods following scikit-learn's API.
//!
//! See: https://scikit-learn.org/stable/modules/feature_selection.html#univariate-feature-selection

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use crate::error::{PipelineError, Result};

/// Compute the ANOVA F-value for each feature against class labels.
///
/// For every column the samples are grouped by class; the statistic is the
/// ratio of the between-class mean square to the within-class mean square:
///
/// F = (SS_between / (k - 1)) / (SS_within / (n - k))
///
/// # Parameters
///
/// * `x` - A 2D array of shape (n_samples, n_features).
/// * `y` - Class labels of shape (n_samples,).
///
/// # Returns
///
/// A tuple containing:
/// - An array of shape (n_features,) with F-statistics for each feature.
/// - An array of shape (n_features,) with p-values associated with each F-statistic.
///
/// A feature that is constant within every class has a zero within-class sum
/// of squares: its F is infinite when class means differ and NaN when the
/// column is constant overall.
///
/// # Examples
///
/// ```rust
/// use ndarray::array;
/// use credit_default_classifiers::feature_selection::univariate_selection::f_classif;
///
/// let x = array![[1.0, 5.0], [1.2, 3.0], [3.0, 4.0], [3.1, 6.0]];
/// let y = array![0, 0, 1, 1];
/// let (f, p) = f_classif(x.view(), y.view()).unwrap();
/// assert!(f[0] > f[1]);
/// assert!(p[0] < p[1]);
/// ```
pub fn f_classif(x: ArrayView2<f64>, y: ArrayView1<i32>) -> Result<(Array1<f64>, Array1<f64>)> {
    let n_samples = x.nrows();
    if n_samples != y.len() {
        return Err(PipelineError::LengthMismatch { x_rows: n_samples, y_len: y.len() });
    }

    let mut classes: Vec<i32> = y.to_vec();
    classes.sort_unstable();
    classes.dedup();
    let n_classes = classes.len();

    let groups: Vec<Vec<usize>> = classes
        .iter()
        .map(|&c| (0..n_samples).filter(|&i| y[i] == c).collect())
        .collect();

    let df_between = n_classes as f64 - 1.0;
    let df_within = n_samples as f64 - n_classes as f64;

    let mut f_statistic = Array1::zeros(x.ncols());
    for (j, col) in x.axis_iter(Axis(1)).enumerate() {
        let grand_mean = col.mean().unwrap_or(0.0);
        let mut ss_between = 0.0;
        let mut ss_within = 0.0;
        for members in &groups {
            let n_k = members.len() as f64;
            let mean_k = members.iter().map(|&i| col[i]).sum::<f64>() / n_k;
            ss_between += n_k * (mean_k - grand_mean).powi(2);
            ss_within += members.iter().map(|&i| (col[i] - mean_k).powi(2)).sum::<f64>();
        }
        f_statistic[j] = (ss_between / df_between) / (ss_within / df_within);
    }

    let mut p_values = Array1::from_elem(x.ncols(), f64::NAN);
    if df_between > 0.0 && df_within > 0.0 {
        let f_dist = FisherSnedecor::new(df_between, df_within).map_err(|e| {
            PipelineError::InvalidParam {
                path: "select_k_best".to_string(),
                reason: e.to_string(),
            }
        })?;
        for (i, &f) in f_statistic.iter().enumerate() {
            if f.is_nan() {
                continue;
            }
            p_values[i] = if f.is_infinite() { 0.0 } else { f_dist.sf(f) };
        }
    }

    Ok((f_statistic, p_values))
}

/// A struct for selecting the k best features based on F-scores.
///
/// This struct implements a feature selection method similar to scikit-learn's SelectKBest
/// with f_classif as the scoring function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectKBest {
    /// The number of top features to select.
    pub k: usize,
}

/// Columns retained by a fitted [`SelectKBest`], in their original order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KBestSupport {
    pub indices: Vec<usize>,
    pub scores: Vec<f64>,
    pub n_features_in: usize,
}

impl SelectKBest {
    /// Creates a new SelectKBest instance.
    ///
    /// # Arguments
    ///
    /// * `k` - The number of top features to select.
    pub fn new(k: usize) -> Self {
        SelectKBest { k }
    }

    /// Fits the selector and returns the support of the k best features.
    ///
    /// NaN scores rank below every finite score. Among equal scores the
    /// later column wins, matching a stable ascending sort from which the
    /// last `k` entries are kept. When `k` exceeds the number of features
    /// every column is kept.
    ///
    /// # Arguments
    ///
    /// * `x` - The feature matrix (n_samples x n_features).
    /// * `y` - The class labels.
    pub fn fit(&self, x: ArrayView2<f64>, y: ArrayView1<i32>) -> Result<KBestSupport> {
        if self.k == 0 {
            return Err(PipelineError::InvalidParam {
                path: "select_k_best.k".to_string(),
                reason: "k must be at least 1".to_string(),
            });
        }
        let (f_scores, _) = f_classif(x, y)?;
        let n_features = f_scores.len();
        if self.k > n_features {
            log::warn!(
                "select_k_best.k = {} exceeds the {} available features; keeping all of them",
                self.k,
                n_features
            );
        }

        let cleaned: Vec<f64> = f_scores
            .iter()
            .map(|&f| if f.is_nan() { f64::MIN } else { f })
            .collect();

        // Create a vector of indices
        let mut indices: Vec<usize> = (0..n_features).collect();

        // Sort indices based on scores in ascending order using a stable sort
        indices.sort_by(|&i, &j| cleaned[i].total_cmp(&cleaned[j]));

        // Select top k features by taking the last k elements
        let mut selected: Vec<usize> = indices.iter().rev().take(self.k).cloned().collect();
        selected.sort_unstable();

        Ok(KBestSupport {
            indices: selected,
            scores: f_scores.to_vec(),
            n_features_in: n_features,
        })
    }
}

impl KBestSupport {
    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features_in {
            return Err(PipelineError::InvalidParam {
                path: "select_k_best".to_string(),
                reason: format!("fitted on {} features, got {}", self.n_features_in, x.ncols()),
            });
        }
        Ok(x.select(Axis(1), &self.indices))
    }
}
