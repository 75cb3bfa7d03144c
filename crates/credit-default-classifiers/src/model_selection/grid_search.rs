//! Exhaustive hyperparameter search with stratified cross-validation.
use ndarray::{Array1, ArrayView1};
use rayon::prelude::*;
use serde::Serialize;

use crate::data_handling::FeatureMatrix;
use crate::error::{PipelineError, Result};
use crate::metrics::Scoring;
use crate::model_selection::cross_validation::{Fold, StratifiedKFold};
use crate::model_selection::param_grid::{describe, ParamGrid, ParamSet};
use crate::model_selection::ParamValue;

/// A fitted model able to label feature rows.
pub trait Predictor {
    fn predict(&self, x: &FeatureMatrix) -> Result<Array1<i32>>;
}

/// An unfitted, cloneable model template whose hyperparameters can be
/// addressed by `<stage>.<parameter>` paths.
pub trait Estimator: Clone + Send + Sync {
    type Fitted: Predictor + Send;

    fn set_param(&mut self, path: &str, value: &ParamValue) -> Result<()>;

    /// Fit a fresh model; `self` is left untouched.
    fn fit(&self, x: &FeatureMatrix, y: ArrayView1<i32>) -> Result<Self::Fitted>;

    /// Clone of `self` with every parameter of `params` applied.
    fn with_params(&self, params: &ParamSet) -> Result<Self> {
        let mut estimator = self.clone();
        for (path, value) in params {
            estimator.set_param(path, value)?;
        }
        Ok(estimator)
    }
}

/// Cross-validated scores of one grid point.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CandidateResult {
    pub params: ParamSet,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
    /// 1 for the best candidate; tied scores share a rank.
    pub rank: usize,
}

/// Outcome of [`GridSearchCv::fit`].
#[derive(Debug)]
pub struct SearchResult<F> {
    /// Best configuration refitted on the full training data.
    pub best_estimator: F,
    pub best_params: ParamSet,
    pub best_score: f64,
    pub cv_results: Vec<CandidateResult>,
}

#[derive(Clone, Debug)]
pub struct GridSearchCv {
    pub grid: ParamGrid,
    pub n_splits: usize,
    pub scoring: Scoring,
    /// Evaluate (candidate, fold) pairs on the rayon pool.
    pub parallel: bool,
}

impl GridSearchCv {
    pub fn new(grid: ParamGrid, n_splits: usize, scoring: Scoring) -> Self {
        GridSearchCv {
            grid,
            n_splits,
            scoring,
            parallel: true,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Score every candidate on every fold, then refit the best one on all of
    /// `x`. Candidates are compared by mean fold score; on a tie the one
    /// enumerated first wins. Any failing fold fit aborts the search.
    pub fn fit<E: Estimator>(
        &self,
        estimator: &E,
        x: &FeatureMatrix,
        y: ArrayView1<i32>,
    ) -> Result<SearchResult<E::Fitted>> {
        if x.nrows() != y.len() {
            return Err(PipelineError::LengthMismatch {
                x_rows: x.nrows(),
                y_len: y.len(),
            });
        }
        let candidates = self.grid.candidates();
        if candidates.is_empty() {
            return Err(PipelineError::InvalidParam {
                path: "grid".to_string(),
                reason: "the parameter grid has no candidates".to_string(),
            });
        }
        let estimators = candidates
            .iter()
            .map(|params| estimator.with_params(params))
            .collect::<Result<Vec<E>>>()?;

        let folds = StratifiedKFold::new(self.n_splits).split(y)?;
        log::info!(
            "Fitting {} folds for each of {} candidates, totalling {} fits",
            folds.len(),
            candidates.len(),
            folds.len() * candidates.len()
        );

        let jobs: Vec<(usize, &Fold)> = (0..estimators.len())
            .flat_map(|c| folds.iter().map(move |fold| (c, fold)))
            .collect();
        let run = |&(c, fold): &(usize, &Fold)| self.score_fold(&estimators[c], x, y, fold);
        let scores: Vec<f64> = if self.parallel {
            jobs.par_iter().map(run).collect::<Result<Vec<_>>>()?
        } else {
            jobs.iter().map(run).collect::<Result<Vec<_>>>()?
        };

        let mut cv_results: Vec<CandidateResult> = candidates
            .into_iter()
            .zip(scores.chunks(folds.len()))
            .map(|(params, fold_scores)| {
                let (mean_score, std_score) = mean_std(fold_scores);
                CandidateResult {
                    params,
                    fold_scores: fold_scores.to_vec(),
                    mean_score,
                    std_score,
                    rank: 0,
                }
            })
            .collect();
        assign_ranks(&mut cv_results);

        let mut best = 0;
        for (i, result) in cv_results.iter().enumerate() {
            if result.mean_score > cv_results[best].mean_score {
                best = i;
            }
        }
        for result in &cv_results {
            log::debug!(
                "mean {} = {:.4} (+/- {:.4}) for {{{}}}",
                self.scoring,
                result.mean_score,
                result.std_score,
                describe(&result.params)
            );
        }
        let best_params = cv_results[best].params.clone();
        let best_score = cv_results[best].mean_score;
        log::info!(
            "Best {} = {:.4} with {{{}}}; refitting on {} rows",
            self.scoring,
            best_score,
            describe(&best_params),
            x.nrows()
        );

        let best_estimator = estimators[best].fit(x, y)?;
        Ok(SearchResult {
            best_estimator,
            best_params,
            best_score,
            cv_results,
        })
    }

    fn score_fold<E: Estimator>(
        &self,
        estimator: &E,
        x: &FeatureMatrix,
        y: ArrayView1<i32>,
        fold: &Fold,
    ) -> Result<f64> {
        let x_train = x.select_rows(&fold.train);
        let y_train = y.select(ndarray::Axis(0), &fold.train);
        let x_test = x.select_rows(&fold.test);
        let y_test = y.select(ndarray::Axis(0), &fold.test);

        let fitted = estimator.fit(&x_train, y_train.view())?;
        let predicted = fitted.predict(&x_test)?;
        self.scoring.score(y_test.view(), predicted.view())
    }
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Competition ranking ("1224") on mean score.
fn assign_ranks(results: &mut [CandidateResult]) {
    let means: Vec<f64> = results.iter().map(|r| r.mean_score).collect();
    for (result, mean) in results.iter_mut().zip(&means) {
        result.rank = 1 + means.iter().filter(|&&other| other > *mean).count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Axis};

    /// Predicts 1 when the first feature exceeds `threshold`.
    #[derive(Clone, Debug)]
    struct Threshold {
        threshold: f64,
        fail: bool,
    }

    struct FittedThreshold(f64);

    impl Predictor for FittedThreshold {
        fn predict(&self, x: &FeatureMatrix) -> Result<Array1<i32>> {
            Ok(x.data.index_axis(Axis(1), 0).mapv(|v| (v > self.0) as i32))
        }
    }

    impl Estimator for Threshold {
        type Fitted = FittedThreshold;

        fn set_param(&mut self, path: &str, value: &ParamValue) -> Result<()> {
            match path {
                "model.threshold" => self.threshold = value.as_f64(path)?,
                "model.fail" => self.fail = value.as_usize(path)? == 1,
                _ => return Err(PipelineError::UnknownParam(path.to_string())),
            }
            Ok(())
        }

        fn fit(&self, _x: &FeatureMatrix, _y: ArrayView1<i32>) -> Result<FittedThreshold> {
            if self.fail {
                return Err(PipelineError::EmptyInput("threshold"));
            }
            Ok(FittedThreshold(self.threshold))
        }
    }

    fn data() -> (FeatureMatrix, Array1<i32>) {
        let values: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let x = FeatureMatrix::new(
            vec!["v".to_string()],
            Array2::from_shape_vec((20, 1), values).unwrap(),
        )
        .unwrap();
        let y = Array1::from_vec((0..20).map(|i| (i >= 10) as i32).collect());
        (x, y)
    }

    fn base() -> Threshold {
        Threshold {
            threshold: 0.0,
            fail: false,
        }
    }

    #[test]
    fn picks_the_best_threshold_and_refits() {
        let (x, y) = data();
        let grid = ParamGrid::new().with(
            "model.threshold",
            vec![
                ParamValue::Float(2.5),
                ParamValue::Float(9.5),
                ParamValue::Float(15.5),
            ],
        );
        let search = GridSearchCv::new(grid, 5, Scoring::BalancedAccuracy);
        let result = search.fit(&base(), &x, y.view()).unwrap();

        assert_eq!(result.best_params["model.threshold"], ParamValue::Float(9.5));
        assert_eq!(result.best_estimator.0, 9.5);
        assert!((result.best_score - 1.0).abs() < 1e-12);
        assert_eq!(result.cv_results.len(), 3);
        assert_eq!(result.cv_results[1].rank, 1);
        assert!(result.cv_results.iter().all(|r| r.fold_scores.len() == 5));
    }

    #[test]
    fn ties_keep_the_first_candidate() {
        let (x, y) = data();
        let grid = ParamGrid::new().with(
            "model.threshold",
            vec![ParamValue::Float(9.2), ParamValue::Float(9.7)],
        );
        let result = GridSearchCv::new(grid, 4, Scoring::Accuracy)
            .fit(&base(), &x, y.view())
            .unwrap();
        assert_eq!(result.best_params["model.threshold"], ParamValue::Float(9.2));
        assert_eq!(result.cv_results[0].rank, result.cv_results[1].rank);
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let (x, y) = data();
        let grid = ParamGrid::new().with(
            "model.threshold",
            vec![ParamValue::Float(4.0), ParamValue::Float(12.0)],
        );
        let par = GridSearchCv::new(grid.clone(), 5, Scoring::F1)
            .fit(&base(), &x, y.view())
            .unwrap();
        let seq = GridSearchCv::new(grid, 5, Scoring::F1)
            .parallel(false)
            .fit(&base(), &x, y.view())
            .unwrap();
        assert_eq!(par.cv_results, seq.cv_results);
    }

    #[test]
    fn failures_abort_the_search() {
        let (x, y) = data();
        let grid = ParamGrid::new()
            .with("model.fail", vec![ParamValue::Int(0), ParamValue::Int(1)]);
        assert!(GridSearchCv::new(grid, 5, Scoring::Accuracy)
            .fit(&base(), &x, y.view())
            .is_err());

        let unknown = ParamGrid::new().with("model.depth", vec![ParamValue::Int(3)]);
        assert!(matches!(
            GridSearchCv::new(unknown, 5, Scoring::Accuracy).fit(&base(), &x, y.view()),
            Err(PipelineError::UnknownParam(_))
        ));
    }
}
