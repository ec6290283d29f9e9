//! Dense layer implementation with weights, bias, and activation function.
use crate::activations::Activation;
use rand::Rng;
use std::sync::Arc;

/// Row-major matrix.
pub type Matrix = Vec<Vec<f64>>;

/// A fully-connected (dense) layer with weights, bias, and an activation function.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    /// `weights[out][in]`
    pub weights: Matrix,
    pub bias: Vec<f64>,
    pub activation: Arc<dyn Activation + Send + Sync>,
}

impl DenseLayer {
    /// Create a layer with Glorot-uniform weights and bias in
    /// `U(-sqrt(factor / (fan_in + fan_out)), +sqrt(...))`.
    pub fn new<R: Rng>(
        input_size: usize,
        output_size: usize,
        activation: Arc<dyn Activation + Send + Sync>,
        init_factor: f64,
        rng: &mut R,
    ) -> Self {
        let limit = (init_factor / (input_size + output_size).max(1) as f64).sqrt();
        let weights: Matrix = (0..output_size)
            .map(|_| (0..input_size).map(|_| rng.gen_range(-limit..limit)).collect())
            .collect();
        let bias = (0..output_size).map(|_| rng.gen_range(-limit..limit)).collect();
        Self {
            weights,
            bias,
            activation,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.bias.len()
    }

    /// Forward pass: computes pre-activations `z = W·x + b` and activations `a = act(z)`.
    pub fn forward(&self, input: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let z: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, &b)| row.iter().zip(input).map(|(&w, &i)| w * i).sum::<f64>() + b)
            .collect();
        let a: Vec<f64> = z.iter().map(|&val| self.activation.apply(val)).collect();
        (z, a)
    }

    /// `dL/dz = dL/da * act'(z)`
    pub fn local_gradient(&self, da: &[f64], z: &[f64]) -> Vec<f64> {
        da.iter()
            .zip(z)
            .map(|(&d, &val)| d * self.activation.derivative(val))
            .collect()
    }

    /// `dL/da_prev = W^T * dz`
    pub fn propagate(&self, dz: &[f64], input_size: usize) -> Vec<f64> {
        let mut da_prev = vec![0.0; input_size];
        for (row, &d) in self.weights.iter().zip(dz) {
            for (acc, &w) in da_prev.iter_mut().zip(row) {
                *acc += w * d;
            }
        }
        da_prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activations::{Linear, ReLU};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn init_respects_glorot_bound() {
        let mut rng = StdRng::seed_from_u64(7);
        let layer = DenseLayer::new(4, 3, Arc::new(ReLU), 6.0, &mut rng);
        let limit = (6.0f64 / 7.0).sqrt();
        assert_eq!(layer.input_size(), 4);
        assert_eq!(layer.output_size(), 3);
        assert!(layer.weights.iter().flatten().all(|w| w.abs() <= limit));
        assert!(layer.bias.iter().all(|b| b.abs() <= limit));
    }

    #[test]
    fn forward_and_backward_match_hand_computation() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut layer = DenseLayer::new(2, 2, Arc::new(Linear), 6.0, &mut rng);
        layer.weights = vec![vec![1.0, 2.0], vec![-1.0, 0.5]];
        layer.bias = vec![0.5, 0.0];
        let (z, a) = layer.forward(&[1.0, 1.0]);
        assert_eq!(z, vec![3.5, -0.5]);
        assert_eq!(a, z);
        let dz = layer.local_gradient(&[1.0, 2.0], &z);
        assert_eq!(dz, vec![1.0, 2.0]);
        assert_eq!(layer.propagate(&dz, 2), vec![-1.0, 3.0]);
    }
}
