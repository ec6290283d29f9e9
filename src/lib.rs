//! A small supervised-learning pipeline over tabular CSV data: load,
//! one-hot encode, split, standardize, train an MLP classifier, and report
//! precision/recall/F1 on the held-out rows.
//!
//! - CSV loading with zero-filled missing cells
//! - One-hot encoding of text columns
//! - Seedable random train/eval split
//! - Standard scaling fitted on the training partition only
//! - MLP with one hidden layer trained by mini-batch Adam
//! - Text classification report

pub mod activations;
pub mod datasets;
pub mod error;
pub mod layers;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod optim;
pub mod pipeline;
pub mod preprocessing;
pub mod split;
pub mod utils;

pub use activations::{Activation, ActivationKind, Linear, ReLU, Sigmoid, Softmax, Tanh};
pub use datasets::{read_dataset, Column, ColumnData, RawTable};
pub use error::{PipelineError, Result};
pub use layers::{DenseLayer, Matrix};
pub use metrics::{accuracy, classification_report, confusion_matrix, ClassificationReport};
pub use network::{MLPClassifier, MlpConfig, MLP};
pub use pipeline::{run, run_with_config, PipelineConfig};
pub use preprocessing::{prepare_dataset, scale_features, PreparedTable, StandardScaler};
pub use split::{split_dataset, Split, SplitConfig};
pub use utils::generate_synthetic_data;
