//! Adam optimizer over the dense layers of an [`MLP`].
use crate::network::{Gradients, MLP};

#[derive(Debug, Clone)]
pub struct AdamOptimizer {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: i32,
    m: Option<Gradients>, // First moment
    v: Option<Gradients>, // Second moment
}

impl AdamOptimizer {
    pub fn new(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: None,
            v: None,
        }
    }

    /// One bias-corrected Adam step: `p -= lr_t * m / (sqrt(v) + eps)`.
    pub fn step(&mut self, mlp: &mut MLP, grads: &Gradients) {
        self.t += 1;
        let (b1, b2) = (self.beta1, self.beta2);
        let m = self.m.get_or_insert_with(|| Gradients::zeros_like(mlp));
        let v = self.v.get_or_insert_with(|| Gradients::zeros_like(mlp));
        let lr_t = self.learning_rate * (1.0 - b2.powi(self.t)).sqrt() / (1.0 - b1.powi(self.t));
        let eps = self.epsilon;

        let update = |p: &mut f64, g: f64, m: &mut f64, v: &mut f64| {
            *m = b1 * *m + (1.0 - b1) * g;
            *v = b2 * *v + (1.0 - b2) * g * g;
            *p -= lr_t * *m / (v.sqrt() + eps);
        };

        for (layer_idx, layer) in mlp.layers.iter_mut().enumerate() {
            for (i, row) in layer.weights.iter_mut().enumerate() {
                for (j, w) in row.iter_mut().enumerate() {
                    update(
                        w,
                        grads.d_w[layer_idx][i][j],
                        &mut m.d_w[layer_idx][i][j],
                        &mut v.d_w[layer_idx][i][j],
                    );
                }
            }
            for (i, b) in layer.bias.iter_mut().enumerate() {
                update(
                    b,
                    grads.db[layer_idx][i],
                    &mut m.db[layer_idx][i],
                    &mut v.db[layer_idx][i],
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activations::ActivationKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn first_step_moves_each_parameter_by_learning_rate() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut mlp = MLP::new(2, &[3], 1, ActivationKind::ReLU, &mut rng);
        let before = mlp.clone();
        let mut grads = Gradients::zeros_like(&mlp);
        grads.d_w[0][0][0] = 0.5;
        grads.db[1][0] = -2.0;

        let mut adam = AdamOptimizer::new(0.01, 0.9, 0.999, 1e-8);
        adam.step(&mut mlp, &grads);

        let moved = before.layers[0].weights[0][0] - mlp.layers[0].weights[0][0];
        assert!((moved - 0.01).abs() < 1e-6);
        let moved_bias = mlp.layers[1].bias[0] - before.layers[1].bias[0];
        assert!((moved_bias - 0.01).abs() < 1e-6);
        assert_eq!(before.layers[0].weights[1], mlp.layers[0].weights[1]);
    }
}
