//! End-to-end run: load, prepare, split, scale, train, report.
use crate::datasets::read_dataset;
use crate::error::Result;
use crate::metrics::{classification_report, ClassificationReport};
use crate::network::{unique_labels, MLPClassifier, MlpConfig};
use crate::preprocessing::{prepare_dataset, scale_features};
use crate::split::{split_dataset, SplitConfig};
use crate::utils::format_label;
use std::path::Path;
use tracing::info;

/// Settings for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    pub split: SplitConfig,
    pub model: MlpConfig,
}

impl PipelineConfig {
    /// Fix the partition shuffle and the model initialization.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.split.seed = Some(seed);
        self.model.seed = Some(seed);
        self
    }

    pub fn with_model(mut self, model: MlpConfig) -> Self {
        self.model = model;
        self
    }

    pub fn with_split(mut self, split: SplitConfig) -> Self {
        self.split = split;
        self
    }
}

/// Train on `path` to predict `target_column` and return the text report.
pub fn run(path: impl AsRef<Path>, target_column: &str) -> Result<String> {
    run_with_config(path, target_column, &PipelineConfig::default()).map(|r| r.to_string())
}

/// Like [`run`], returning the structured report.
pub fn run_with_config(
    path: impl AsRef<Path>,
    target_column: &str,
    config: &PipelineConfig,
) -> Result<ClassificationReport> {
    let raw = read_dataset(path)?;
    let prepared = prepare_dataset(&raw);
    let split = split_dataset(&prepared, target_column, &config.split)?;
    let (x_train, x_test) = scale_features(&split.x_train, &split.x_test)?;

    let model = MLPClassifier::new(config.model.clone()).fit(&x_train, &split.y_train)?;
    let predictions = model.predict(&x_test)?;

    let kind = split.label_kind;
    let mut report = classification_report(&split.y_test, &predictions, |v| format_label(v, kind))?;

    let unseen: Vec<String> = unique_labels(&split.y_test)
        .into_iter()
        .filter(|c| !model.classes().contains(c))
        .map(|c| format_label(c, kind))
        .collect();
    if !unseen.is_empty() {
        report.add_warning(format!(
            "evaluation labels never seen in training, their recall is meaningless: {}",
            unseen.join(", ")
        ));
    }
    info!(
        accuracy = report.accuracy,
        epochs = model.n_iter(),
        "pipeline finished"
    );
    Ok(report)
}
