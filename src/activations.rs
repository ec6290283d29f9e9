use std::fmt;
use std::sync::Arc;

/// Trait for activation functions.
pub trait Activation: fmt::Debug + Send + Sync {
    fn apply(&self, x: f64) -> f64;
    fn derivative(&self, x: f64) -> f64;
    fn apply_vec(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&xi| self.apply(xi)).collect()
    }
}

/// ReLU: max(0, x)
#[derive(Debug, Clone, Default)]
pub struct ReLU;

impl Activation for ReLU {
    fn apply(&self, x: f64) -> f64 {
        x.max(0.0)
    }
    fn derivative(&self, x: f64) -> f64 {
        (x > 0.0) as u8 as f64
    }
}

/// Sigmoid: 1 / (1 + exp(-x))
#[derive(Debug, Clone, Default)]
pub struct Sigmoid;

impl Activation for Sigmoid {
    fn apply(&self, x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }
    fn derivative(&self, x: f64) -> f64 {
        let s = self.apply(x);
        s * (1.0 - s)
    }
}

/// Tanh
#[derive(Debug, Clone, Default)]
pub struct Tanh;

impl Activation for Tanh {
    fn apply(&self, x: f64) -> f64 {
        x.tanh()
    }
    fn derivative(&self, x: f64) -> f64 {
        let t = self.apply(x);
        1.0 - t * t
    }
}

/// Linear: identity
#[derive(Debug, Clone, Default)]
pub struct Linear;

impl Activation for Linear {
    fn apply(&self, x: f64) -> f64 {
        x
    }
    fn derivative(&self, _x: f64) -> f64 {
        1.0
    }
}

/// Softmax over a whole output vector.
#[derive(Debug, Clone, Default)]
pub struct Softmax;

impl Softmax {
    pub fn apply_vec(&self, x: &[f64]) -> Vec<f64> {
        if x.is_empty() {
            return Vec::new();
        }
        let max = x.iter().fold(f64::MIN, |a, &b| a.max(b));
        let exps: Vec<f64> = x.iter().map(|&xi| (xi - max).exp()).collect();
        let exp_sum: f64 = exps.iter().sum();
        if !exp_sum.is_finite() || exp_sum <= 0.0 {
            // Fallback to uniform distribution to avoid NaNs
            let n = x.len() as f64;
            return vec![1.0 / n; x.len()];
        }
        exps.into_iter().map(|e| e / exp_sum).collect()
    }
}

/// Hidden-layer activation choice for [`crate::network::MlpConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivationKind {
    #[default]
    ReLU,
    Sigmoid,
    Tanh,
    Linear,
}

impl ActivationKind {
    pub fn to_arc(self) -> Arc<dyn Activation + Send + Sync> {
        match self {
            ActivationKind::ReLU => Arc::new(ReLU),
            ActivationKind::Sigmoid => Arc::new(Sigmoid),
            ActivationKind::Tanh => Arc::new(Tanh),
            ActivationKind::Linear => Arc::new(Linear),
        }
    }

    /// Numerator of the Glorot-uniform bound `sqrt(factor / (fan_in + fan_out))`.
    pub fn init_factor(self) -> f64 {
        match self {
            ActivationKind::Sigmoid => 2.0,
            _ => 6.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relu_clamps_negatives() {
        assert_eq!(ReLU.apply(-2.0), 0.0);
        assert_eq!(ReLU.apply(3.0), 3.0);
        assert_eq!(ReLU.derivative(-1.0), 0.0);
        assert_eq!(ReLU.derivative(1.0), 1.0);
    }

    #[test]
    fn sigmoid_is_centered() {
        assert_eq!(Sigmoid.apply(0.0), 0.5);
        assert_eq!(Sigmoid.derivative(0.0), 0.25);
        assert!(Sigmoid.apply(-800.0).is_finite());
    }

    #[test]
    fn softmax_sums_to_one() {
        let p = Softmax.apply_vec(&[1.0, 2.0, 3.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(p[2] > p[1] && p[1] > p[0]);
        let big = Softmax.apply_vec(&[1000.0, 1000.0]);
        assert_eq!(big, vec![0.5, 0.5]);
    }
}
