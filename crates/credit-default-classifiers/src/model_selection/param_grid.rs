//! Cartesian hyperparameter grids addressed by `<stage>.<parameter>` paths.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// A single hyperparameter value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Layers(Vec<usize>),
    /// Explicit "use the default" (for example all PCA components).
    None,
}

impl ParamValue {
    pub fn as_usize(&self, path: &str) -> Result<usize> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Ok(*v as usize),
            other => Err(invalid(path, "a non-negative integer", other)),
        }
    }

    pub fn as_f64(&self, path: &str) -> Result<f64> {
        match self {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            other => Err(invalid(path, "a number", other)),
        }
    }

    pub fn as_optional_usize(&self, path: &str) -> Result<Option<usize>> {
        match self {
            ParamValue::None => Ok(None),
            other => other.as_usize(path).map(Some),
        }
    }

    pub fn as_layers(&self, path: &str) -> Result<Vec<usize>> {
        match self {
            ParamValue::Layers(sizes) if sizes.iter().all(|&s| s > 0) => Ok(sizes.clone()),
            other => Err(invalid(path, "a list of positive layer widths", other)),
        }
    }
}

fn invalid(path: &str, expected: &str, got: &ParamValue) -> PipelineError {
    PipelineError::InvalidParam {
        path: path.to_string(),
        reason: format!("expected {}, got {}", expected, got),
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Layers(sizes) => write!(f, "{:?}", sizes),
            ParamValue::None => write!(f, "None"),
        }
    }
}

/// One point of the grid.
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Named value lists whose Cartesian product is searched.
///
/// Keys are kept sorted; candidates enumerate with the last key varying
/// fastest. An empty grid yields a single empty candidate (the estimator as
/// configured).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamGrid {
    params: BTreeMap<String, Vec<ParamValue>>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, values: Vec<ParamValue>) -> Self {
        self.params.insert(path.to_string(), values);
        self
    }

    pub fn insert(&mut self, path: &str, values: Vec<ParamValue>) {
        self.params.insert(path.to_string(), values);
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.params.values().map(Vec::len).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// Every combination in enumeration order.
    pub fn candidates(&self) -> Vec<ParamSet> {
        let mut out = vec![ParamSet::new()];
        for (path, values) in &self.params {
            let mut next = Vec::with_capacity(out.len() * values.len());
            for partial in &out {
                for value in values {
                    let mut set = partial.clone();
                    set.insert(path.clone(), value.clone());
                    next.push(set);
                }
            }
            out = next;
        }
        out
    }
}

/// Render a candidate for logs.
pub fn describe(params: &ParamSet) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cartesian_product_enumerates_last_key_fastest() {
        let grid = ParamGrid::new()
            .with("b.y", vec![ParamValue::Int(1), ParamValue::Int(2)])
            .with("a.x", vec![ParamValue::Float(0.1), ParamValue::Float(0.2), ParamValue::Float(0.3)]);
        assert_eq!(grid.len(), 6);

        let candidates = grid.candidates();
        assert_eq!(candidates.len(), 6);
        let pairs: Vec<(f64, i64)> = candidates
            .iter()
            .map(|c| match (&c["a.x"], &c["b.y"]) {
                (ParamValue::Float(x), ParamValue::Int(y)) => (*x, *y),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            pairs,
            vec![(0.1, 1), (0.1, 2), (0.2, 1), (0.2, 2), (0.3, 1), (0.3, 2)]
        );
    }

    #[test]
    fn empty_grid_has_one_empty_candidate() {
        let grid = ParamGrid::new();
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.candidates(), vec![ParamSet::new()]);
    }

    #[test]
    fn a_key_without_values_empties_the_grid() {
        let grid = ParamGrid::new().with("a.x", vec![]);
        assert!(grid.is_empty());
        assert!(grid.candidates().is_empty());
    }

    #[test]
    fn values_parse_from_json() {
        let grid: ParamGrid = serde_json::from_str(
            r#"{"pca.n_components": [null, 5], "classifier.alpha": [0.28], "classifier.hidden_layer_sizes": [[50, 30]]}"#,
        )
        .unwrap();
        let c = &grid.candidates()[0];
        assert_eq!(c["pca.n_components"], ParamValue::None);
        assert_eq!(c["classifier.alpha"], ParamValue::Float(0.28));
        assert_eq!(c["classifier.hidden_layer_sizes"], ParamValue::Layers(vec![50, 30]));
        assert_eq!(grid.candidates()[1]["pca.n_components"], ParamValue::Int(5));
    }

    #[test]
    fn typed_accessors_validate() {
        assert_eq!(ParamValue::Int(3).as_usize("k").unwrap(), 3);
        assert!(ParamValue::Int(-1).as_usize("k").is_err());
        assert_eq!(ParamValue::Int(2).as_f64("alpha").unwrap(), 2.0);
        assert_eq!(ParamValue::None.as_optional_usize("n").unwrap(), None);
        assert!(ParamValue::Layers(vec![3, 0]).as_layers("h").is_err());
    }
}
