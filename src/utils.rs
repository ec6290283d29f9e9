//! Helpers shared by the pipeline stages and tests.
use crate::layers::Matrix;
use crate::preprocessing::FeatureKind;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Generate well-separated blobs: class `c` is centered on a circle of
/// radius 3 in the first two dimensions, with uniform noise in `[-1, 1)` on
/// every dimension. Labels cycle through `0..n_classes`.
pub fn generate_synthetic_data(
    n_samples: usize,
    n_features: usize,
    n_classes: usize,
    seed: u64,
) -> (Matrix, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let classes = n_classes.max(1);
    (0..n_samples)
        .map(|i| {
            let class = i % classes;
            let angle = 2.0 * PI * class as f64 / classes as f64;
            let center = [3.0 * angle.cos(), 3.0 * angle.sin()];
            let input: Vec<f64> = (0..n_features)
                .map(|j| center.get(j).copied().unwrap_or(0.0) + rng.gen_range(-1.0..1.0))
                .collect();
            (input, class as f64)
        })
        .unzip()
}

/// Render a class value for reports: indicator targets print as
/// `False`/`True`, integral numbers without a fraction.
pub fn format_label(value: f64, kind: FeatureKind) -> String {
    match kind {
        FeatureKind::Indicator if value == 0.0 => "False".to_string(),
        FeatureKind::Indicator if value == 1.0 => "True".to_string(),
        _ if value.fract() == 0.0 && value.abs() < 1e15 => format!("{}", value as i64),
        _ => format!("{}", value),
    }
}
