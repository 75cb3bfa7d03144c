//! Feature selection utilities.
//!
//! This module contains univariate selection routines (a la scikit-learn)
//! for scoring and ranking features against class labels with ANOVA F-tests.
pub mod univariate_selection;
