//! Target extraction and random train/eval partitioning.
use crate::error::{PipelineError, Result};
use crate::layers::Matrix;
use crate::preprocessing::{FeatureKind, PreparedTable};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

/// Fraction of rows held out for evaluation when nothing else is configured.
pub const DEFAULT_TEST_SIZE: f64 = 0.25;

#[derive(Debug, Clone, PartialEq)]
pub struct SplitConfig {
    /// Fraction of rows assigned to the evaluation partition, in (0, 1).
    pub test_size: f64,
    /// Fixed shuffle seed; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: DEFAULT_TEST_SIZE,
            seed: None,
        }
    }
}

impl SplitConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }
}

/// Aligned features and labels for both partitions.
///
/// `x_train[i]` and `y_train[i]` come from source row `train_indices[i]`;
/// likewise for the eval side.
#[derive(Debug, Clone)]
pub struct Split {
    pub x_train: Matrix,
    pub x_test: Matrix,
    pub y_train: Vec<f64>,
    pub y_test: Vec<f64>,
    pub feature_names: Vec<String>,
    pub target: String,
    pub label_kind: FeatureKind,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Rows in the evaluation partition for `n` samples.
fn test_count(n: usize, test_size: f64) -> usize {
    (test_size * n as f64).ceil() as usize
}

/// Remove `target` from the features and shuffle rows into train/eval.
pub fn split_dataset(table: &PreparedTable, target: &str, config: &SplitConfig) -> Result<Split> {
    let target_idx = table
        .column_index(target)
        .ok_or_else(|| PipelineError::MissingColumn {
            column: target.to_string(),
            available: table.columns.iter().map(|c| c.name.clone()).collect(),
        })?;
    if !(config.test_size > 0.0 && config.test_size < 1.0) {
        return Err(PipelineError::invalid_config(
            "split",
            format!("test_size must be in (0, 1), got {}", config.test_size),
        ));
    }

    let n = table.n_rows();
    let n_test = test_count(n, config.test_size);
    if n_test == 0 || n_test >= n {
        return Err(PipelineError::insufficient(
            "split",
            format!(
                "{} rows cannot be split into non-empty train and eval sets with test_size {}",
                n, config.test_size
            ),
        ));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    indices.shuffle(&mut rng);
    let (test_indices, train_indices) = indices.split_at(n_test);

    let features = |row: &[f64]| -> Vec<f64> {
        row.iter()
            .enumerate()
            .filter(|&(j, _)| j != target_idx)
            .map(|(_, &v)| v)
            .collect()
    };
    let take_x = |idx: &[usize]| -> Matrix {
        idx.iter().map(|&i| features(&table.rows[i][..])).collect()
    };
    let take_y = |idx: &[usize]| -> Vec<f64> {
        idx.iter().map(|&i| table.rows[i][target_idx]).collect()
    };

    let split = Split {
        x_train: take_x(train_indices),
        x_test: take_x(test_indices),
        y_train: take_y(train_indices),
        y_test: take_y(test_indices),
        feature_names: table
            .columns
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != target_idx)
            .map(|(_, c)| c.name.clone())
            .collect(),
        target: target.to_string(),
        label_kind: table.columns[target_idx].kind,
        train_indices: train_indices.to_vec(),
        test_indices: test_indices.to_vec(),
    };
    info!(
        column = %target,
        train_rows = split.x_train.len(),
        eval_rows = split.x_test.len(),
        features = split.feature_names.len(),
        "split dataset"
    );
    Ok(split)
}
