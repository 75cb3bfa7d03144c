//! Principal component analysis.
//!
//! Components come from the eigendecomposition of the sample covariance
//! matrix. With `n_components = None` every component is kept, so the
//! projection is a rotation that decorrelates the inputs without dropping
//! information.
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pca {
    /// Number of components to keep; `None` keeps `min(n_samples, n_features)`.
    pub n_components: Option<usize>,
}

/// Fitted projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedPca {
    pub mean: Array1<f64>,
    /// One component per row, shape (n_components, n_features).
    pub components: Array2<f64>,
    pub explained_variance: Vec<f64>,
}

impl Pca {
    pub fn new(n_components: Option<usize>) -> Self {
        Pca { n_components }
    }

    pub fn fit(&self, x: ArrayView2<f64>) -> Result<FittedPca> {
        let (n_samples, n_features) = x.dim();
        if n_samples == 0 || n_features == 0 {
            return Err(PipelineError::EmptyInput("pca"));
        }
        let max_components = n_samples.min(n_features);
        let n_components = match self.n_components {
            None => max_components,
            Some(n) if n >= 1 && n <= max_components => n,
            Some(n) => {
                return Err(PipelineError::InvalidParam {
                    path: "pca.n_components".to_string(),
                    reason: format!("must be between 1 and {}, got {}", max_components, n),
                })
            }
        };

        let mean = x.mean_axis(Axis(0)).ok_or(PipelineError::EmptyInput("pca"))?;
        let centered = &x - &mean;

        let denom = (n_samples.max(2) - 1) as f64;
        let cov = centered.t().dot(&centered) / denom;
        let cov = DMatrix::from_row_slice(
            n_features,
            n_features,
            cov.as_standard_layout()
                .as_slice()
                .ok_or_else(|| PipelineError::InvalidParam {
                    path: "pca".to_string(),
                    reason: "covariance matrix is not contiguous".to_string(),
                })?,
        );
        let eigen = SymmetricEigen::new(cov);

        // Sort by eigenvalue (descending)
        let mut order: Vec<usize> = (0..n_features).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let mut components = Array2::zeros((n_components, n_features));
        let mut explained_variance = Vec::with_capacity(n_components);
        for (row, &idx) in order.iter().take(n_components).enumerate() {
            explained_variance.push(eigen.eigenvalues[idx].max(0.0));

            // Eigenvectors are defined up to sign: make the largest loading positive.
            let column = eigen.eigenvectors.column(idx);
            let pivot = column
                .iter()
                .copied()
                .fold(0.0f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
            let sign = if pivot < 0.0 { -1.0 } else { 1.0 };
            for j in 0..n_features {
                components[(row, j)] = sign * column[j];
            }
        }

        log::trace!(
            "PCA kept {} of {} components, leading variances {:?}",
            n_components,
            n_features,
            &explained_variance[..explained_variance.len().min(3)]
        );

        Ok(FittedPca {
            mean,
            components,
            explained_variance,
        })
    }
}

impl FittedPca {
    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.mean.len() {
            return Err(PipelineError::InvalidParam {
                path: "pca".to_string(),
                reason: format!("fitted on {} features, got {}", self.mean.len(), x.ncols()),
            });
        }
        let centered = &x - &self.mean;
        Ok(centered.dot(&self.components.t()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn correlated() -> Array2<f64> {
        array![
            [2.5, 2.4, 0.5],
            [0.5, 0.7, 1.5],
            [2.2, 2.9, 0.7],
            [1.9, 2.2, 1.1],
            [3.1, 3.0, 0.2],
            [2.3, 2.7, 0.9],
            [2.0, 1.6, 1.0],
            [1.0, 1.1, 1.6],
        ]
    }

    #[test]
    fn keeps_all_components_by_default() {
        let fitted = Pca::new(None).fit(correlated().view()).unwrap();
        assert_eq!(fitted.n_components(), 3);
        let t = fitted.transform(correlated().view()).unwrap();
        assert_eq!(t.dim(), (8, 3));
    }

    #[test]
    fn components_are_orthonormal() {
        let fitted = Pca::new(None).fit(correlated().view()).unwrap();
        let gram = fitted.components.dot(&fitted.components.t());
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((gram[(i, j)] - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn projected_columns_are_uncorrelated_and_sorted() {
        let x = correlated();
        let fitted = Pca::new(None).fit(x.view()).unwrap();
        let t = fitted.transform(x.view()).unwrap();
        let cov = t.t().dot(&t) / 7.0;
        assert!(cov[(0, 1)].abs() < 1e-9);
        assert!(cov[(0, 2)].abs() < 1e-9);
        assert!(cov[(0, 0)] >= cov[(1, 1)]);
        assert!(cov[(1, 1)] >= cov[(2, 2)]);
        assert!((cov[(0, 0)] - fitted.explained_variance[0]).abs() < 1e-9);
    }

    #[test]
    fn largest_loading_is_positive() {
        let fitted = Pca::new(None).fit(correlated().view()).unwrap();
        for row in fitted.components.rows() {
            let pivot = row.iter().copied().fold(0.0f64, |a, v| if v.abs() > a.abs() { v } else { a });
            assert!(pivot > 0.0);
        }
    }

    #[test]
    fn rejects_too_many_components() {
        assert!(Pca::new(Some(4)).fit(correlated().view()).is_err());
    }
}
