//! Hyperparameter grids, stratified folds and cross-validated grid search.
pub mod cross_validation;
pub mod grid_search;
pub mod param_grid;

pub use cross_validation::{Fold, StratifiedKFold};
pub use grid_search::{CandidateResult, Estimator, GridSearchCv, Predictor, SearchResult};
pub use param_grid::{describe, ParamGrid, ParamSet, ParamValue};
