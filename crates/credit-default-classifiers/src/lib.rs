//! credit-default-classifiers: predicting next-month credit-card default.
//!
//! The crate cleans the raw credit-card records, fits a feature pipeline
//! (one-hot encoding and scaling, ANOVA-F feature selection, PCA and a
//! multi-layer perceptron), tunes it with a stratified cross-validated grid
//! search, and evaluates the refitted model on train and test splits.
//!
//! [`workflow::Workflow`] composes the stages; each one sits behind a trait
//! ([`cleaning::DataCleaner`], [`model_selection::Estimator`],
//! [`report::ReportWriter`]) so runs can swap any of them out.
pub mod cleaning;
pub mod config;
pub mod data_handling;
pub mod decomposition;
pub mod error;
pub mod evaluation;
pub mod feature_selection;
pub mod io;
pub mod metrics;
pub mod model_selection;
pub mod models;
pub mod persist;
pub mod pipeline;
pub mod preprocessing;
pub mod report;
pub mod workflow;

pub use error::{PipelineError, Result};
