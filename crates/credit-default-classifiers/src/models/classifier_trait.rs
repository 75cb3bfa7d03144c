use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::error::Result;

/// Contract shared by binary classifiers at the end of the feature pipeline.
///
/// Labels follow the crate convention: `1` is the positive class (default
/// next month), `0` the negative one.
pub trait ClassifierModel {
    /// Fit the model on a dense feature matrix.
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<i32>) -> Result<()>;

    /// Probability of the positive class for each row.
    fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array1<f64>>;

    /// Hard labels, thresholding the positive-class probability at 0.5.
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<i32>> {
        Ok(self.predict_proba(x)?.mapv(|p| (p > 0.5) as i32))
    }

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}
