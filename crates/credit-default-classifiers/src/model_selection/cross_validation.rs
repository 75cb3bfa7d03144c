//! Fold assignment for cross-validation.
use ndarray::ArrayView1;

use crate::error::{PipelineError, Result};

/// Train/test row indices of one fold.
#[derive(Debug, Clone, PartialEq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Stratified K-Fold cross-validator without shuffling.
///
/// Each class is spread over the folds so every fold keeps roughly the
/// class proportions of the full set. Rows are assigned by position, so the
/// same labels always give the same folds.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        StratifiedKFold { n_splits }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generate train/test indices for each fold.
    ///
    /// Sorted labels are dealt round-robin to the folds to decide how many
    /// members of each class a fold receives; members of a class then fill
    /// the folds in row order.
    pub fn split(&self, y: ArrayView1<i32>) -> Result<Vec<Fold>> {
        let n_samples = y.len();
        if self.n_splits < 2 {
            return Err(PipelineError::CrossValidation(format!(
                "n_splits must be at least 2, got {}",
                self.n_splits
            )));
        }
        if self.n_splits > n_samples {
            return Err(PipelineError::CrossValidation(format!(
                "cannot split {} samples into {} folds",
                n_samples, self.n_splits
            )));
        }

        let mut classes: Vec<i32> = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        let counts: Vec<usize> = classes
            .iter()
            .map(|c| y.iter().filter(|&&v| v == *c).count())
            .collect();

        if counts.iter().all(|&c| c < self.n_splits) {
            return Err(PipelineError::CrossValidation(format!(
                "n_splits = {} is greater than the number of members in every class",
                self.n_splits
            )));
        }
        if let Some(&min_count) = counts.iter().min() {
            if min_count < self.n_splits {
                log::warn!(
                    "The least populated class has only {} members, fewer than n_splits = {}",
                    min_count,
                    self.n_splits
                );
            }
        }

        // allocation[fold][class]: members of `class` tested in `fold`
        let mut sorted_class_idx = Vec::with_capacity(n_samples);
        for (k, &count) in counts.iter().enumerate() {
            sorted_class_idx.extend(std::iter::repeat(k).take(count));
        }
        let mut allocation = vec![vec![0usize; classes.len()]; self.n_splits];
        for (pos, &k) in sorted_class_idx.iter().enumerate() {
            allocation[pos % self.n_splits][k] += 1;
        }

        let mut test_fold = vec![0usize; n_samples];
        for (k, class) in classes.iter().enumerate() {
            let fold_ids = (0..self.n_splits).flat_map(|f| std::iter::repeat(f).take(allocation[f][k]));
            let members = (0..n_samples).filter(|&i| y[i] == *class);
            for (row, fold) in members.zip(fold_ids) {
                test_fold[row] = fold;
            }
        }

        let folds = (0..self.n_splits)
            .map(|f| Fold {
                train: (0..n_samples).filter(|&i| test_fold[i] != f).collect(),
                test: (0..n_samples).filter(|&i| test_fold[i] == f).collect(),
            })
            .collect();
        Ok(folds)
    }
}
