//! Multi-layer perceptron for binary classification.
//!
//! ReLU hidden layers feed a single logistic output unit. Training minimises
//! L2-penalised log-loss with Adam over shuffled minibatches and stops once
//! the epoch loss has failed to improve by `tol` for more than
//! `n_iter_no_change` consecutive epochs, or when `max_iter` epochs ran.
use ndarray::{Array, Array1, Array2, ArrayView1, ArrayView2, Axis, Dimension, Zip};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::MlpParams;
use crate::error::{PipelineError, Result};
use crate::model_selection::ParamValue;
use crate::models::classifier_trait::ClassifierModel;

const RELU_INIT_FACTOR: f64 = 6.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MlpClassifier {
    pub params: MlpParams,
    /// Weight matrix per layer, shape (fan_in, fan_out).
    coefs: Vec<Array2<f64>>,
    intercepts: Vec<Array1<f64>>,
    n_iter: usize,
    loss_curve: Vec<f64>,
}

fn logistic(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl MlpClassifier {
    pub fn new(params: MlpParams) -> Self {
        MlpClassifier {
            params,
            coefs: Vec::new(),
            intercepts: Vec::new(),
            n_iter: 0,
            loss_curve: Vec::new(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.coefs.is_empty()
    }

    /// Epochs run by the last `fit`.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn loss_curve(&self) -> &[f64] {
        &self.loss_curve
    }

    pub fn n_features_in(&self) -> Option<usize> {
        self.coefs.first().map(|w| w.nrows())
    }

    /// Override one hyperparameter by name (without the `classifier.` prefix).
    pub fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        let path = format!("classifier.{}", name);
        let p = &mut self.params;
        match name {
            "hidden_layer_sizes" => p.hidden_layer_sizes = value.as_layers(&path)?,
            "alpha" => p.alpha = value.as_f64(&path)?,
            "learning_rate_init" => p.learning_rate_init = value.as_f64(&path)?,
            "max_iter" => p.max_iter = value.as_usize(&path)?,
            "random_state" => p.random_state = value.as_usize(&path)? as u64,
            "batch_size" => p.batch_size = value.as_optional_usize(&path)?,
            "tol" => p.tol = value.as_f64(&path)?,
            "n_iter_no_change" => p.n_iter_no_change = value.as_usize(&path)?,
            _ => return Err(PipelineError::UnknownParam(path)),
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let p = &self.params;
        let bad = |name: &str, reason: &str| PipelineError::InvalidParam {
            path: format!("classifier.{}", name),
            reason: reason.to_string(),
        };
        if p.hidden_layer_sizes.iter().any(|&s| s == 0) {
            return Err(bad("hidden_layer_sizes", "layer widths must be positive"));
        }
        if !(p.alpha >= 0.0) {
            return Err(bad("alpha", "must be non-negative"));
        }
        if !(p.learning_rate_init > 0.0) {
            return Err(bad("learning_rate_init", "must be positive"));
        }
        if p.max_iter == 0 {
            return Err(bad("max_iter", "must be at least 1"));
        }
        if p.n_iter_no_change == 0 {
            return Err(bad("n_iter_no_change", "must be at least 1"));
        }
        if !(0.0..1.0).contains(&p.beta_1) || !(0.0..1.0).contains(&p.beta_2) {
            return Err(bad("beta_1", "Adam betas must lie in [0, 1)"));
        }
        Ok(())
    }

    /// Glorot-uniform initialisation with bound
    /// `sqrt(6 / (fan_in + fan_out))` on every layer. The factor follows the
    /// ReLU hidden activation, the output layer included.
    fn initialize(&mut self, n_features: usize, rng: &mut StdRng) {
        let mut sizes = Vec::with_capacity(self.params.hidden_layer_sizes.len() + 2);
        sizes.push(n_features);
        sizes.extend_from_slice(&self.params.hidden_layer_sizes);
        sizes.push(1);

        self.coefs.clear();
        self.intercepts.clear();
        for pair in sizes.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            let bound = (RELU_INIT_FACTOR / (fan_in + fan_out) as f64).sqrt();
            self.coefs.push(Array2::from_shape_fn((fan_in, fan_out), |_| {
                rng.gen_range(-bound..bound)
            }));
            self.intercepts
                .push(Array1::from_shape_fn(fan_out, |_| rng.gen_range(-bound..bound)));
        }
    }

    /// Activations of every layer, input first.
    fn forward(&self, x: ArrayView2<f64>) -> Vec<Array2<f64>> {
        let last = self.coefs.len() - 1;
        let mut activations = Vec::with_capacity(self.coefs.len() + 1);
        activations.push(x.to_owned());
        for (i, (w, b)) in self.coefs.iter().zip(&self.intercepts).enumerate() {
            let mut z = activations[i].dot(w) + b;
            if i == last {
                z.mapv_inplace(logistic);
            } else {
                z.mapv_inplace(|v| v.max(0.0));
            }
            activations.push(z);
        }
        activations
    }

    /// Penalised batch loss and its gradients.
    fn backprop(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
    ) -> (f64, Vec<Array2<f64>>, Vec<Array1<f64>>) {
        let n = x.nrows() as f64;
        let alpha = self.params.alpha;
        let activations = self.forward(x);
        let output = &activations[activations.len() - 1];

        let eps = f64::EPSILON;
        let mut loss = 0.0;
        for (&p, &t) in output.column(0).iter().zip(y.iter()) {
            let p = p.clamp(eps, 1.0 - eps);
            loss -= t * p.ln() + (1.0 - t) * (1.0 - p).ln();
        }
        loss /= n;
        let penalty: f64 = self.coefs.iter().map(|w| w.iter().map(|v| v * v).sum::<f64>()).sum();
        loss += 0.5 * alpha * penalty / n;

        let n_layers = self.coefs.len();
        let mut coef_grads = vec![Array2::zeros((0, 0)); n_layers];
        let mut intercept_grads = vec![Array1::zeros(0); n_layers];

        let mut delta = output.clone();
        Zip::from(delta.column_mut(0)).and(&y).for_each(|d, &t| *d -= t);

        for i in (0..n_layers).rev() {
            coef_grads[i] = (activations[i].t().dot(&delta) + &self.coefs[i] * alpha) / n;
            intercept_grads[i] = delta.sum_axis(Axis(0)) / n;
            if i > 0 {
                delta = delta.dot(&self.coefs[i].t());
                Zip::from(&mut delta).and(&activations[i]).for_each(|d, &a| {
                    if a <= 0.0 {
                        *d = 0.0;
                    }
                });
            }
        }
        (loss, coef_grads, intercept_grads)
    }

    fn check_input(&self, x: ArrayView2<f64>) -> Result<()> {
        match self.n_features_in() {
            None => Err(PipelineError::NotFitted("MLP classifier")),
            Some(n) if n != x.ncols() => Err(PipelineError::InvalidParam {
                path: "classifier".to_string(),
                reason: format!("fitted on {} features, got {}", n, x.ncols()),
            }),
            Some(_) => Ok(()),
        }
    }
}

/// First and second moment estimates for every parameter array.
struct Adam {
    learning_rate: f64,
    beta_1: f64,
    beta_2: f64,
    epsilon: f64,
    t: i32,
    coef_moments: Vec<(Array2<f64>, Array2<f64>)>,
    intercept_moments: Vec<(Array1<f64>, Array1<f64>)>,
}

impl Adam {
    fn new(params: &MlpParams, coefs: &[Array2<f64>], intercepts: &[Array1<f64>]) -> Self {
        Adam {
            learning_rate: params.learning_rate_init,
            beta_1: params.beta_1,
            beta_2: params.beta_2,
            epsilon: params.epsilon,
            t: 0,
            coef_moments: coefs
                .iter()
                .map(|w| (Array2::zeros(w.raw_dim()), Array2::zeros(w.raw_dim())))
                .collect(),
            intercept_moments: intercepts
                .iter()
                .map(|b| (Array1::zeros(b.raw_dim()), Array1::zeros(b.raw_dim())))
                .collect(),
        }
    }

    fn step(
        &mut self,
        coefs: &mut [Array2<f64>],
        intercepts: &mut [Array1<f64>],
        coef_grads: &[Array2<f64>],
        intercept_grads: &[Array1<f64>],
    ) {
        self.t += 1;
        let lr_t = self.learning_rate * (1.0 - self.beta_2.powi(self.t)).sqrt()
            / (1.0 - self.beta_1.powi(self.t));
        let (b1, b2, eps) = (self.beta_1, self.beta_2, self.epsilon);

        for ((w, (m, v)), g) in coefs.iter_mut().zip(&mut self.coef_moments).zip(coef_grads) {
            adam_update(w, m, v, g, lr_t, b1, b2, eps);
        }
        for ((b, (m, v)), g) in intercepts
            .iter_mut()
            .zip(&mut self.intercept_moments)
            .zip(intercept_grads)
        {
            adam_update(b, m, v, g, lr_t, b1, b2, eps);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn adam_update<D: Dimension>(
    param: &mut Array<f64, D>,
    m: &mut Array<f64, D>,
    v: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    lr_t: f64,
    beta_1: f64,
    beta_2: f64,
    epsilon: f64,
) {
    Zip::from(param).and(m).and(v).and(grad).for_each(|p, m, v, &g| {
        *m = beta_1 * *m + (1.0 - beta_1) * g;
        *v = beta_2 * *v + (1.0 - beta_2) * g * g;
        *p -= lr_t * *m / (v.sqrt() + epsilon);
    });
}

impl ClassifierModel for MlpClassifier {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<i32>) -> Result<()> {
        self.validate()?;
        let (n_samples, n_features) = x.dim();
        if n_samples == 0 || n_features == 0 {
            return Err(PipelineError::EmptyInput("MLP classifier"));
        }
        if n_samples != y.len() {
            return Err(PipelineError::LengthMismatch {
                x_rows: n_samples,
                y_len: y.len(),
            });
        }
        if let Some(bad) = y.iter().find(|&&v| v != 0 && v != 1) {
            return Err(PipelineError::InvalidParam {
                path: "y".to_string(),
                reason: format!("labels must be 0 or 1, found {}", bad),
            });
        }

        let mut rng = StdRng::seed_from_u64(self.params.random_state);
        self.initialize(n_features, &mut rng);
        self.loss_curve.clear();
        self.n_iter = 0;

        let batch_size = self
            .params
            .batch_size
            .map(|b| b.clamp(1, n_samples))
            .unwrap_or_else(|| n_samples.min(200));
        let y = y.mapv(f64::from);
        let mut adam = Adam::new(&self.params, &self.coefs, &self.intercepts);
        let mut indices: Vec<usize> = (0..n_samples).collect();

        let mut best_loss = f64::INFINITY;
        let mut no_improvement = 0usize;
        let mut converged = false;

        for epoch in 0..self.params.max_iter {
            if self.params.shuffle {
                indices.shuffle(&mut rng);
            }
            let mut accumulated = 0.0;
            for batch in indices.chunks(batch_size) {
                let xb = x.select(Axis(0), batch);
                let yb = y.select(Axis(0), batch);
                let (loss, coef_grads, intercept_grads) = self.backprop(xb.view(), yb.view());
                accumulated += loss * batch.len() as f64;
                adam.step(
                    &mut self.coefs,
                    &mut self.intercepts,
                    &coef_grads,
                    &intercept_grads,
                );
            }
            let loss = accumulated / n_samples as f64;
            self.loss_curve.push(loss);
            self.n_iter = epoch + 1;
            log::trace!("Iteration {}, loss = {:.8}", self.n_iter, loss);

            if loss > best_loss - self.params.tol {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            if loss < best_loss {
                best_loss = loss;
            }
            if no_improvement > self.params.n_iter_no_change {
                log::debug!(
                    "Training loss did not improve more than tol={} for {} consecutive epochs; stopping after {} epochs",
                    self.params.tol,
                    self.params.n_iter_no_change,
                    self.n_iter
                );
                converged = true;
                break;
            }
        }
        if !converged {
            log::warn!(
                "Stochastic optimizer: maximum iterations ({}) reached and the optimization hasn't converged yet",
                self.params.max_iter
            );
        }
        Ok(())
    }

    fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        self.check_input(x)?;
        let activations = self.forward(x);
        Ok(activations[activations.len() - 1].column(0).to_owned())
    }

    fn name(&self) -> &str {
        "mlp"
    }
}
