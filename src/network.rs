//! Multi-Layer Perceptron (MLP) and the classifier trained on top of it.
use crate::activations::{Activation, ActivationKind, Linear, Sigmoid, Softmax};
use crate::error::{PipelineError, Result};
use crate::layers::{DenseLayer, Matrix};
use crate::loss::{binary_log_loss, cross_entropy_loss, l2_penalty};
use crate::optim::AdamOptimizer;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One-hot encode
pub fn one_hot(label: usize, num_classes: usize) -> Vec<f64> {
    let mut v = vec![0.0; num_classes];
    if label < num_classes {
        v[label] = 1.0;
    }
    v
}

/// Squashing applied to the final layer's logits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputActivation {
    /// Single unit, binary log-loss.
    Logistic,
    /// One unit per class, categorical cross-entropy.
    Softmax,
}

/// MLP
#[derive(Debug, Clone)]
pub struct MLP {
    /// Ordered list of dense layers from input to output.
    pub layers: Vec<DenseLayer>,
    /// Number of input features.
    input_size: usize,
    output: OutputActivation,
}

/// Gradients for all layers in order
#[derive(Debug, Clone)]
pub struct Gradients {
    pub d_w: Vec<Matrix>,
    pub db: Vec<Vec<f64>>,
}

impl Gradients {
    pub fn zeros_like(mlp: &MLP) -> Self {
        Self {
            d_w: mlp
                .layers
                .iter()
                .map(|l| vec![vec![0.0; l.input_size()]; l.output_size()])
                .collect(),
            db: mlp.layers.iter().map(|l| vec![0.0; l.output_size()]).collect(),
        }
    }

    fn accumulate(&mut self, other: &Gradients) {
        for (a, b) in self.d_w.iter_mut().flatten().zip(other.d_w.iter().flatten()) {
            a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
        }
        for (a, b) in self.db.iter_mut().zip(&other.db) {
            a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
        }
    }

    /// Average over `n` samples and add the L2 term `alpha * W / n`.
    fn finish(&mut self, mlp: &MLP, alpha: f64, n: usize) {
        let n = n as f64;
        for (d_w, layer) in self.d_w.iter_mut().zip(&mlp.layers) {
            for (g_row, w_row) in d_w.iter_mut().zip(&layer.weights) {
                for (g, &w) in g_row.iter_mut().zip(w_row) {
                    *g = (*g + alpha * w) / n;
                }
            }
        }
        for db in self.db.iter_mut() {
            db.iter_mut().for_each(|g| *g /= n);
        }
    }
}

impl MLP {
    /// Create a new MLP with the given sizes.
    ///
    /// - `input_size`: number of input features
    /// - `hidden_sizes`: sizes of hidden layers, in order
    /// - `output_size`: 1 for a logistic output, otherwise one unit per class
    /// - `activation`: activation used for all hidden layers
    pub fn new<R: rand::Rng>(
        input_size: usize,
        hidden_sizes: &[usize],
        output_size: usize,
        activation: ActivationKind,
        rng: &mut R,
    ) -> Self {
        let factor = activation.init_factor();
        let mut layers = Vec::new();
        let mut prev_size = input_size;
        for &size in hidden_sizes {
            layers.push(DenseLayer::new(prev_size, size, activation.to_arc(), factor, rng));
            prev_size = size;
        }
        // Output layer emits logits; squashing happens in `forward`
        let linear: Arc<dyn Activation + Send + Sync> = Arc::new(Linear);
        layers.push(DenseLayer::new(prev_size, output_size, linear, factor, rng));
        let output = if output_size == 1 {
            OutputActivation::Logistic
        } else {
            OutputActivation::Softmax
        };
        Self {
            layers,
            input_size,
            output,
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    fn squash(&self, logits: &[f64]) -> Vec<f64> {
        match self.output {
            OutputActivation::Logistic => Sigmoid.apply_vec(logits),
            OutputActivation::Softmax => Softmax.apply_vec(logits),
        }
    }

    /// Forward pass from input to output probabilities.
    pub fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut current = input.to_vec();
        for layer in &self.layers {
            let (_, a) = layer.forward(&current);
            current = a;
        }
        self.squash(&current)
    }

    /// Loss and gradients (dW, db) for a single sample.
    ///
    /// Both output heads pair with their canonical loss, so the output
    /// delta is `y_hat - target` without an activation derivative.
    pub fn compute_gradients(&self, input: &[f64], target: &[f64]) -> (f64, Gradients) {
        // Forward cache
        let mut activations = vec![input.to_vec()];
        let mut zs: Vec<Vec<f64>> = Vec::with_capacity(self.layers.len());
        let mut current = input.to_vec();
        for layer in &self.layers {
            let (z, a) = layer.forward(&current);
            zs.push(z);
            activations.push(a.clone());
            current = a;
        }
        let y_hat = self.squash(&current);
        let loss = match self.output {
            OutputActivation::Logistic => binary_log_loss(&y_hat, target),
            OutputActivation::Softmax => cross_entropy_loss(&y_hat, target),
        };
        let mut delta: Vec<f64> = y_hat.iter().zip(target).map(|(&p, &t)| p - t).collect();

        let mut d_w: Vec<Matrix> = Vec::with_capacity(self.layers.len());
        let mut db: Vec<Vec<f64>> = Vec::with_capacity(self.layers.len());
        let last = self.layers.len() - 1;
        for layer_idx in (0..self.layers.len()).rev() {
            let layer = &self.layers[layer_idx];
            let a_prev = &activations[layer_idx];
            let dz = if layer_idx == last {
                delta
            } else {
                layer.local_gradient(&delta, &zs[layer_idx])
            };
            // dW = dz (outer) a_prev
            d_w.push(
                dz.iter()
                    .map(|&g| a_prev.iter().map(|&a| g * a).collect())
                    .collect(),
            );
            delta = layer.propagate(&dz, a_prev.len());
            db.push(dz);
        }
        // reverse back to layer order
        d_w.reverse();
        db.reverse();
        (loss, Gradients { d_w, db })
    }
}

impl fmt::Display for MLP {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sizes = vec![self.input_size];
        for layer in &self.layers {
            sizes.push(layer.bias.len());
        }
        write!(f, "MLP: {:?} ({:?} output)", sizes, self.output)
    }
}

/// Training settings for [`MLPClassifier`].
#[derive(Debug, Clone, PartialEq)]
pub struct MlpConfig {
    pub hidden_layer_sizes: Vec<usize>,
    pub activation: ActivationKind,
    /// L2 penalty strength.
    pub alpha: f64,
    /// Upper bound on mini-batch size; clipped to the sample count.
    pub batch_size: usize,
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    /// Maximum number of epochs.
    pub max_iter: usize,
    /// Minimum loss improvement that resets the patience counter.
    pub tol: f64,
    /// Epochs without `tol` improvement tolerated before stopping.
    pub n_iter_no_change: usize,
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden_layer_sizes: vec![3],
            activation: ActivationKind::ReLU,
            alpha: 1e-4,
            batch_size: 200,
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            max_iter: 100,
            tol: 1e-4,
            n_iter_no_change: 10,
            shuffle: true,
            seed: None,
        }
    }
}

impl MlpConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_hidden_layers(mut self, sizes: Vec<usize>) -> Self {
        self.hidden_layer_sizes = sizes;
        self
    }

    pub fn with_activation(mut self, activation: ActivationKind) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(PipelineError::invalid_config("train", msg));
        if self.hidden_layer_sizes.iter().any(|&s| s == 0) {
            return invalid("hidden layer sizes must be positive");
        }
        if self.max_iter == 0 {
            return invalid("max_iter must be positive");
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be positive");
        }
        if !(self.learning_rate > 0.0) || !self.learning_rate.is_finite() {
            return invalid("learning_rate must be a positive number");
        }
        if !(self.alpha >= 0.0) {
            return invalid("alpha must be non-negative");
        }
        Ok(())
    }
}

/// Sorted distinct labels.
pub fn unique_labels(y: &[f64]) -> Vec<f64> {
    let mut classes = y.to_vec();
    classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    classes.dedup();
    classes
}

/// Feed-forward classifier trained with Adam on mini-batches.
#[derive(Debug, Clone)]
pub struct MLPClassifier {
    config: MlpConfig,
    network: Option<MLP>,
    classes: Vec<f64>,
    loss_curve: Vec<f64>,
    n_iter: usize,
}

impl MLPClassifier {
    pub fn new(config: MlpConfig) -> Self {
        Self {
            config,
            network: None,
            classes: Vec::new(),
            loss_curve: Vec::new(),
            n_iter: 0,
        }
    }

    /// Fit on `x` (one row per sample) and labels `y`.
    ///
    /// Stops early once the training loss has not improved by `tol` for more
    /// than `n_iter_no_change` epochs; hitting `max_iter` first is logged, not
    /// an error.
    pub fn fit(mut self, x: &Matrix, y: &[f64]) -> Result<Self> {
        self.config.validate()?;
        if x.is_empty() {
            return Err(PipelineError::insufficient("train", "no training samples"));
        }
        if x.len() != y.len() {
            return Err(PipelineError::shape("train", x.len(), y.len()));
        }
        let n_features = x[0].len();
        if let Some(row) = x.iter().find(|r| r.len() != n_features) {
            return Err(PipelineError::shape("train", n_features, row.len()));
        }
        if let Some(&bad) = y.iter().find(|v| !v.is_finite()) {
            return Err(PipelineError::invalid_config(
                "train",
                format!("label {} is not a finite number", bad),
            ));
        }

        self.classes = unique_labels(y);
        let n_classes = self.classes.len();
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let output_size = if n_classes <= 2 { 1 } else { n_classes };
        let mut mlp = MLP::new(
            n_features,
            &self.config.hidden_layer_sizes,
            output_size,
            self.config.activation,
            &mut rng,
        );
        info!(network = %mlp, classes = n_classes, samples = x.len(), "training classifier");

        if n_classes == 1 {
            warn!(class = self.classes[0], "only one class in training labels, skipping training");
            self.network = Some(mlp);
            return Ok(self);
        }

        let targets: Vec<Vec<f64>> = y
            .iter()
            .map(|&label| {
                let idx = self.class_index(label);
                if output_size == 1 {
                    vec![idx as f64]
                } else {
                    one_hot(idx, n_classes)
                }
            })
            .collect();

        let n = x.len();
        let batch_size = self.config.batch_size.min(n);
        let mut adam = AdamOptimizer::new(
            self.config.learning_rate,
            self.config.beta1,
            self.config.beta2,
            self.config.epsilon,
        );
        let mut indices: Vec<usize> = (0..n).collect();
        let mut best_loss = f64::INFINITY;
        let mut no_improvement = 0usize;
        let mut converged = false;

        for epoch in 0..self.config.max_iter {
            if self.config.shuffle {
                indices.shuffle(&mut rng);
            }
            let mut accumulated = 0.0;
            for batch in indices.chunks(batch_size) {
                let mut grads = Gradients::zeros_like(&mlp);
                let mut batch_loss = 0.0;
                for &i in batch {
                    let (loss, g) = mlp.compute_gradients(&x[i], &targets[i]);
                    batch_loss += loss;
                    grads.accumulate(&g);
                }
                let penalty = l2_penalty(
                    mlp.layers.iter().map(|l| &l.weights),
                    self.config.alpha,
                    batch.len(),
                );
                batch_loss = batch_loss / batch.len() as f64 + penalty;
                grads.finish(&mlp, self.config.alpha, batch.len());
                adam.step(&mut mlp, &grads);
                accumulated += batch_loss * batch.len() as f64;
            }
            let epoch_loss = accumulated / n as f64;
            self.loss_curve.push(epoch_loss);
            self.n_iter = epoch + 1;
            debug!(epoch = epoch + 1, loss = epoch_loss, "epoch finished");

            if epoch_loss > best_loss - self.config.tol {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            if epoch_loss < best_loss {
                best_loss = epoch_loss;
            }
            if no_improvement > self.config.n_iter_no_change {
                info!(
                    epochs = self.n_iter,
                    tol = self.config.tol,
                    "training loss stopped improving"
                );
                converged = true;
                break;
            }
        }
        if !converged {
            warn!(
                max_iter = self.config.max_iter,
                loss = self.loss_curve.last().copied().unwrap_or(f64::NAN),
                "optimizer reached max_iter without converging"
            );
        }
        self.network = Some(mlp);
        Ok(self)
    }

    fn class_index(&self, label: f64) -> usize {
        self.classes
            .iter()
            .position(|&c| c == label)
            .unwrap_or_default()
    }

    fn network(&self) -> Result<&MLP> {
        self.network
            .as_ref()
            .ok_or_else(|| PipelineError::insufficient("predict", "classifier has not been fitted"))
    }

    /// Class probabilities per row, in the order of [`Self::classes`].
    pub fn predict_proba(&self, x: &Matrix) -> Result<Matrix> {
        let mlp = self.network()?;
        x.iter()
            .map(|row| {
                if row.len() != mlp.input_size() {
                    return Err(PipelineError::shape("predict", mlp.input_size(), row.len()));
                }
                Ok(match self.classes.len() {
                    1 => vec![1.0],
                    2 => {
                        let p = mlp.forward(row)[0];
                        vec![1.0 - p, p]
                    }
                    _ => mlp.forward(row),
                })
            })
            .collect()
    }

    /// Most probable training class per row.
    pub fn predict(&self, x: &Matrix) -> Result<Vec<f64>> {
        Ok(self
            .predict_proba(x)?
            .iter()
            .map(|p| {
                let best = p
                    .iter()
                    .enumerate()
                    .fold(0usize, |max_i, (i, &v)| if v > p[max_i] { i } else { max_i });
                self.classes[best]
            })
            .collect())
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn loss_curve(&self) -> &[f64] {
        &self.loss_curve
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generate_synthetic_data;

    fn accuracy(pred: &[f64], truth: &[f64]) -> f64 {
        let hits = pred.iter().zip(truth).filter(|(a, b)| a == b).count();
        hits as f64 / truth.len() as f64
    }

    #[test]
    fn gradients_match_finite_differences() {
        let mut rng = StdRng::seed_from_u64(11);
        let mlp = MLP::new(3, &[4], 1, ActivationKind::Tanh, &mut rng);
        let input = [0.3, -1.2, 0.8];
        let target = [1.0];
        let (_, grads) = mlp.compute_gradients(&input, &target);

        let h = 1e-6;
        for (layer_idx, i, j) in [(0, 0, 0), (0, 3, 2), (1, 0, 1)] {
            let mut plus = mlp.clone();
            plus.layers[layer_idx].weights[i][j] += h;
            let mut minus = mlp.clone();
            minus.layers[layer_idx].weights[i][j] -= h;
            let numeric = (plus.compute_gradients(&input, &target).0
                - minus.compute_gradients(&input, &target).0)
                / (2.0 * h);
            assert!((numeric - grads.d_w[layer_idx][i][j]).abs() < 1e-6);
        }
    }

    #[test]
    fn learns_separable_binary_problem() {
        let (x, y) = generate_synthetic_data(200, 2, 2, 5);
        let config = MlpConfig::default()
            .with_seed(3)
            .with_activation(ActivationKind::Tanh)
            .with_learning_rate(0.05)
            .with_batch_size(16);
        let model = MLPClassifier::new(config).fit(&x, &y).unwrap();
        assert_eq!(model.classes(), &[0.0, 1.0]);
        let pred = model.predict(&x).unwrap();
        assert!(accuracy(&pred, &y) > 0.9);
        assert!(model.n_iter() <= 100);
        assert_eq!(model.loss_curve().len(), model.n_iter());
    }

    #[test]
    fn learns_three_class_problem() {
        let (x, y) = generate_synthetic_data(300, 2, 3, 9);
        let config = MlpConfig::default()
            .with_seed(4)
            .with_hidden_layers(vec![8])
            .with_activation(ActivationKind::Tanh)
            .with_learning_rate(0.05)
            .with_batch_size(16);
        let model = MLPClassifier::new(config).fit(&x, &y).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|p| p.len() == 3 && (p.iter().sum::<f64>() - 1.0).abs() < 1e-9));
        assert!(accuracy(&model.predict(&x).unwrap(), &y) > 0.8);
    }

    #[test]
    fn default_relu_network_reduces_loss() {
        let (x, y) = generate_synthetic_data(120, 3, 2, 1);
        let model = MLPClassifier::new(MlpConfig::default().with_seed(8))
            .fit(&x, &y)
            .unwrap();
        let curve = model.loss_curve();
        assert!(curve.last().unwrap() < curve.first().unwrap());
        assert!(model.n_iter() <= 100);
    }

    #[test]
    fn predictions_come_from_training_classes() {
        let x = vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]];
        let y = vec![7.0, 7.0, 9.0, 9.0];
        let model = MLPClassifier::new(MlpConfig::default().with_seed(1).with_max_iter(5))
            .fit(&x, &y)
            .unwrap();
        let pred = model.predict(&vec![vec![-5.0], vec![10.0]]).unwrap();
        assert!(pred.iter().all(|p| *p == 7.0 || *p == 9.0));
    }

    #[test]
    fn single_class_always_predicts_it() {
        let x = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let model = MLPClassifier::new(MlpConfig::default().with_seed(1))
            .fit(&x, &[1.0, 1.0])
            .unwrap();
        assert_eq!(model.n_iter(), 0);
        assert_eq!(model.predict(&vec![vec![5.0, 5.0]]).unwrap(), vec![1.0]);
    }

    #[test]
    fn shape_errors_are_reported() {
        let x = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let err = MLPClassifier::new(MlpConfig::default()).fit(&x, &[1.0]).unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch { .. }));

        let model = MLPClassifier::new(MlpConfig::default().with_seed(2).with_max_iter(2))
            .fit(&x, &[0.0, 1.0])
            .unwrap();
        let err = model.predict(&vec![vec![1.0]]).unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn empty_training_set_is_rejected() {
        let err = MLPClassifier::new(MlpConfig::default()).fit(&Vec::new(), &[]).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData { .. }));
    }

    #[test]
    fn unfitted_model_cannot_predict() {
        let model = MLPClassifier::new(MlpConfig::default());
        assert!(model.predict(&vec![vec![1.0]]).is_err());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let x = vec![vec![0.0], vec![1.0]];
        let config = MlpConfig::default().with_hidden_layers(vec![0]);
        let err = MLPClassifier::new(config).fit(&x, &[0.0, 1.0]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig { .. }));
    }
}
