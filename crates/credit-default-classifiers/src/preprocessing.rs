//! Column preprocessing: one-hot encoding, standard scaling and the column
//! transformer that routes named columns to each of them.
//!
//! Fitting functions return the fitted state directly (`fit_scaler`,
//! `OneHotEncoder::fit`), so a fitted transformer can never be observed in a
//! half-initialised state.

use ndarray::{concatenate, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::data_handling::FeatureMatrix;
use crate::error::{PipelineError, Result};

/// Simple standard scaler (per-column mean/std).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

/// Fit a `Scaler` where rows are samples and columns are features.
///
/// Uses the population standard deviation. Constant columns get a scale of 1
/// so they map to zero instead of dividing by zero.
pub fn fit_scaler(x: ArrayView2<f64>) -> Result<Scaler> {
    let (nrows, ncols) = x.dim();
    if nrows == 0 {
        return Err(PipelineError::EmptyInput("scaler"));
    }

    let mean = x
        .mean_axis(Axis(0))
        .ok_or(PipelineError::EmptyInput("scaler"))?
        .to_vec();

    let mut std = vec![0.0f64; ncols];
    for row in x.rows() {
        for (c, &v) in row.iter().enumerate() {
            let d = v - mean[c];
            std[c] += d * d;
        }
    }
    for v in std.iter_mut() {
        let s = (*v / nrows as f64).sqrt();
        *v = if s > f64::EPSILON { s } else { 1.0 };
    }

    Ok(Scaler { mean, std })
}

/// Transform all rows using the provided `Scaler` and return a new matrix.
pub fn transform_all(x: ArrayView2<f64>, sc: &Scaler) -> Result<Array2<f64>> {
    if x.ncols() != sc.mean.len() {
        return Err(PipelineError::InvalidParam {
            path: "scaler".to_string(),
            reason: format!("fitted on {} columns, got {}", sc.mean.len(), x.ncols()),
        });
    }
    let mut out = x.to_owned();
    for mut row in out.rows_mut() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = (*v - sc.mean[c]) / sc.std[c];
        }
    }
    Ok(out)
}

/// One-hot encoder that ignores categories unseen at fit time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Sorted distinct values per input column.
    pub categories: Vec<Vec<f64>>,
}

impl OneHotEncoder {
    pub fn fit(x: ArrayView2<f64>) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(PipelineError::EmptyInput("one-hot encoder"));
        }
        let categories = x
            .columns()
            .into_iter()
            .map(|col| {
                let mut values: Vec<f64> = col.to_vec();
                values.sort_by(|a, b| a.total_cmp(b));
                values.dedup();
                values
            })
            .collect();
        Ok(OneHotEncoder { categories })
    }

    pub fn n_outputs(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// Output column names, `<column>_<category>`.
    pub fn feature_names(&self, input: &[String]) -> Vec<String> {
        input
            .iter()
            .zip(&self.categories)
            .flat_map(|(name, cats)| cats.iter().map(move |c| format!("{}_{}", name, c)))
            .collect()
    }

    /// Encode each column into indicator columns. A value absent from the
    /// fitted categories yields all zeros for that column.
    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.categories.len() {
            return Err(PipelineError::InvalidParam {
                path: "one-hot encoder".to_string(),
                reason: format!("fitted on {} columns, got {}", self.categories.len(), x.ncols()),
            });
        }
        let mut out = Array2::zeros((x.nrows(), self.n_outputs()));
        for (r, row) in x.rows().into_iter().enumerate() {
            let mut offset = 0;
            for (c, &value) in row.iter().enumerate() {
                let cats = &self.categories[c];
                if let Ok(pos) = cats.binary_search_by(|c| c.total_cmp(&value)) {
                    out[(r, offset + pos)] = 1.0;
                }
                offset += cats.len();
            }
        }
        Ok(out)
    }
}

/// Which columns go to the encoder and which to the scaler. Everything else
/// is passed through.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    pub categorical: Vec<String>,
    pub numeric: Vec<String>,
}

/// Fitted state of a [`ColumnTransformer`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedColumnTransformer {
    pub input_columns: Vec<String>,
    categorical_idx: Vec<usize>,
    numeric_idx: Vec<usize>,
    remainder_idx: Vec<usize>,
    encoder: OneHotEncoder,
    scaler: Scaler,
    output_columns: Vec<String>,
}

fn resolve_indices(x: &FeatureMatrix, names: &[String]) -> Result<Vec<usize>> {
    names
        .iter()
        .map(|name| {
            x.column_index(name)
                .ok_or_else(|| PipelineError::MissingColumn(name.clone()))
        })
        .collect()
}

impl ColumnTransformer {
    pub fn new(categorical: Vec<String>, numeric: Vec<String>) -> Self {
        ColumnTransformer { categorical, numeric }
    }

    pub fn fit(&self, x: &FeatureMatrix) -> Result<FittedColumnTransformer> {
        let categorical_idx = resolve_indices(x, &self.categorical)?;
        let numeric_idx = resolve_indices(x, &self.numeric)?;
        let remainder_idx: Vec<usize> = (0..x.ncols())
            .filter(|i| !categorical_idx.contains(i) && !numeric_idx.contains(i))
            .collect();
        if !remainder_idx.is_empty() {
            log::debug!(
                "Passing {} unlisted columns through unchanged: {:?}",
                remainder_idx.len(),
                remainder_idx.iter().map(|&i| &x.columns[i]).collect::<Vec<_>>()
            );
        }

        let encoder = OneHotEncoder::fit(x.data.select(Axis(1), &categorical_idx).view())?;
        let scaler = fit_scaler(x.data.select(Axis(1), &numeric_idx).view())?;

        let mut output_columns = encoder.feature_names(&self.categorical);
        output_columns.extend(self.numeric.iter().cloned());
        output_columns.extend(remainder_idx.iter().map(|&i| x.columns[i].clone()));

        Ok(FittedColumnTransformer {
            input_columns: x.columns.clone(),
            categorical_idx,
            numeric_idx,
            remainder_idx,
            encoder,
            scaler,
            output_columns,
        })
    }
}

impl FittedColumnTransformer {
    pub fn output_columns(&self) -> &[String] {
        &self.output_columns
    }

    /// Encoded block, then scaled block, then passthrough columns.
    pub fn transform(&self, x: &FeatureMatrix) -> Result<Array2<f64>> {
        if x.columns != self.input_columns {
            return Err(PipelineError::SchemaMismatch {
                expected: self.input_columns.clone(),
                found: x.columns.clone(),
            });
        }
        let encoded = self
            .encoder
            .transform(x.data.select(Axis(1), &self.categorical_idx).view())?;
        let scaled = transform_all(x.data.select(Axis(1), &self.numeric_idx).view(), &self.scaler)?;
        let remainder = x.data.select(Axis(1), &self.remainder_idx);

        concatenate(Axis(1), &[encoded.view(), scaled.view(), remainder.view()]).map_err(|e| {
            PipelineError::InvalidParam {
                path: "preprocessor".to_string(),
                reason: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn fit_scaler_computes_mean_and_std() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let sc = fit_scaler(x.view()).unwrap();
        assert!((sc.mean[0] - 2.5).abs() < 1e-12);
        assert!((sc.mean[1] - 25.0).abs() < 1e-12);
        assert!((sc.std[0] - 1.25f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn transform_all_standardizes() {
        let x = array![[1.0, 100.0], [2.0, 200.0], [3.0, 300.0], [4.0, 400.0]];
        let sc = fit_scaler(x.view()).unwrap();
        let t = transform_all(x.view(), &sc).unwrap();
        for col in t.columns() {
            let mean = col.sum() / 4.0;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 4.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn constant_column_maps_to_zero() {
        let x = array![[5.0], [5.0], [5.0]];
        let sc = fit_scaler(x.view()).unwrap();
        let t = transform_all(x.view(), &sc).unwrap();
        assert!(t.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn one_hot_ignores_unseen_categories() {
        let fit = array![[1.0, 2.0], [2.0, 1.0], [1.0, 3.0]];
        let enc = OneHotEncoder::fit(fit.view()).unwrap();
        assert_eq!(enc.categories, vec![vec![1.0, 2.0], vec![1.0, 2.0, 3.0]]);

        let t = enc.transform(array![[2.0, 9.0]].view()).unwrap();
        assert_eq!(t.row(0).to_vec(), vec![0.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn column_transformer_orders_blocks_and_passes_remainder() {
        let x = FeatureMatrix::new(
            vec!["cat".into(), "num".into(), "extra".into()],
            array![[1.0, 10.0, 7.0], [2.0, 20.0, 8.0]],
        )
        .unwrap();
        let ct = ColumnTransformer::new(vec!["cat".into()], vec!["num".into()]);
        let fitted = ct.fit(&x).unwrap();
        assert_eq!(fitted.output_columns(), &["cat_1", "cat_2", "num", "extra"]);

        let t = fitted.transform(&x).unwrap();
        assert_eq!(t.row(0).to_vec(), vec![1.0, 0.0, -1.0, 7.0]);
        assert_eq!(t.row(1).to_vec(), vec![0.0, 1.0, 1.0, 8.0]);
    }

    #[test]
    fn column_transformer_rejects_other_schema() {
        let x = FeatureMatrix::new(vec!["cat".into(), "num".into()], array![[1.0, 10.0], [2.0, 20.0]]).unwrap();
        let fitted = ColumnTransformer::new(vec!["cat".into()], vec!["num".into()])
            .fit(&x)
            .unwrap();
        let swapped = FeatureMatrix::new(vec!["num".into(), "cat".into()], array![[10.0, 1.0]]).unwrap();
        assert!(matches!(
            fitted.transform(&swapped),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn column_transformer_requires_listed_columns() {
        let x = FeatureMatrix::new(vec!["num".into()], array![[1.0], [2.0]]).unwrap();
        let err = ColumnTransformer::new(vec!["cat".into()], vec!["num".into()])
            .fit(&x)
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(c) if c == "cat"));
    }
}
