//! Loss functions for training the classifier.

const EPS: f64 = 1e-12;

fn clip(p: f64) -> f64 {
    if !p.is_finite() || p < EPS {
        EPS
    } else if p > 1.0 - EPS {
        1.0 - EPS
    } else {
        p
    }
}

/// Cross-entropy for one sample against a one-hot target.
pub fn cross_entropy_loss(pred: &[f64], target: &[f64]) -> f64 {
    pred.iter()
        .zip(target)
        .map(|(&p, &t)| -t * clip(p).ln())
        .sum()
}

/// Binary log-loss for one sample; `pred` and `target` hold a single value.
pub fn binary_log_loss(pred: &[f64], target: &[f64]) -> f64 {
    pred.iter()
        .zip(target)
        .map(|(&p, &t)| {
            let p = clip(p);
            -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
        })
        .sum()
}

/// `0.5 * alpha * ||W||^2 / n_samples` over every weight matrix.
pub fn l2_penalty<'a>(
    weights: impl IntoIterator<Item = &'a Vec<Vec<f64>>>,
    alpha: f64,
    n_samples: usize,
) -> f64 {
    let sq: f64 = weights
        .into_iter()
        .flat_map(|m| m.iter().flatten())
        .map(|w| w * w)
        .sum();
    0.5 * alpha * sq / n_samples as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_prediction_has_near_zero_loss() {
        assert!(cross_entropy_loss(&[0.0, 1.0], &[0.0, 1.0]) < 1e-9);
        assert!(binary_log_loss(&[1.0], &[1.0]) < 1e-9);
        assert!(binary_log_loss(&[0.0], &[0.0]) < 1e-9);
    }

    #[test]
    fn confident_mistakes_stay_finite() {
        let l = binary_log_loss(&[0.0], &[1.0]);
        assert!(l.is_finite() && l > 20.0);
        assert!(cross_entropy_loss(&[1.0, 0.0], &[0.0, 1.0]).is_finite());
    }

    #[test]
    fn coin_flip_loss_is_ln_two() {
        assert!((binary_log_loss(&[0.5], &[1.0]) - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn l2_penalty_scales_with_samples() {
        let w = vec![vec![vec![1.0, 2.0]], vec![vec![2.0]]];
        assert!((l2_penalty(&w, 0.1, 2) - 0.5 * 0.1 * 9.0 / 2.0).abs() < 1e-12);
    }
}
