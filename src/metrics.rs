//! Metrics for evaluating classifier predictions.
use crate::error::{PipelineError, Result};
use crate::network::unique_labels;
use std::fmt;
use tracing::warn;

/// Fraction of positions where prediction equals truth.
pub fn accuracy(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

/// `cm[i][j]` counts samples of true class `labels[i]` predicted as `labels[j]`.
/// Values outside `labels` are ignored.
pub fn confusion_matrix(y_true: &[f64], y_pred: &[f64], labels: &[f64]) -> Vec<Vec<usize>> {
    let mut cm = vec![vec![0; labels.len()]; labels.len()];
    let index = |v: f64| labels.iter().position(|&l| l == v);
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if let (Some(i), Some(j)) = (index(t), index(p)) {
            cm[i][j] += 1;
        }
    }
    cm
}

/// Scores for one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetrics {
    pub label: String,
    pub value: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Macro or support-weighted average over classes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class precision/recall/F1/support plus accuracy and averages.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    /// Conditions under which some scores are not meaningful.
    pub warnings: Vec<String>,
}

impl ClassificationReport {
    pub fn class(&self, label: &str) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.label == label)
    }

    pub(crate) fn add_warning(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}

/// Compare predictions against truth over the sorted union of observed labels.
///
/// Precision or recall with a zero denominator is reported as 0.0 and noted
/// in [`ClassificationReport::warnings`].
pub fn classification_report<F>(
    y_true: &[f64],
    y_pred: &[f64],
    label_name: F,
) -> Result<ClassificationReport>
where
    F: Fn(f64) -> String,
{
    if y_true.len() != y_pred.len() {
        return Err(PipelineError::shape("report", y_true.len(), y_pred.len()));
    }
    if y_true.is_empty() {
        return Err(PipelineError::insufficient("report", "no evaluation samples"));
    }

    let mut all: Vec<f64> = y_true.to_vec();
    all.extend_from_slice(y_pred);
    let labels = unique_labels(&all);
    let cm = confusion_matrix(y_true, y_pred, &labels);

    let mut no_predictions = Vec::new();
    let mut no_support = Vec::new();
    let classes: Vec<ClassMetrics> = labels
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let tp = cm[i][i];
            let predicted: usize = cm.iter().map(|row| row[i]).sum();
            let support: usize = cm[i].iter().sum();
            let label = label_name(value);
            let precision = ratio(tp, predicted).unwrap_or_else(|| {
                no_predictions.push(label.clone());
                0.0
            });
            let recall = ratio(tp, support).unwrap_or_else(|| {
                no_support.push(label.clone());
                0.0
            });
            let f1_score = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                label,
                value,
                precision,
                recall,
                f1_score,
                support,
            }
        })
        .collect();

    let total: usize = classes.iter().map(|c| c.support).sum();
    let k = classes.len() as f64;
    let macro_avg = AverageMetrics {
        precision: classes.iter().map(|c| c.precision).sum::<f64>() / k,
        recall: classes.iter().map(|c| c.recall).sum::<f64>() / k,
        f1_score: classes.iter().map(|c| c.f1_score).sum::<f64>() / k,
        support: total,
    };
    let weighted = |f: fn(&ClassMetrics) -> f64| {
        classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / total as f64
    };
    let weighted_avg = AverageMetrics {
        precision: weighted(|c| c.precision),
        recall: weighted(|c| c.recall),
        f1_score: weighted(|c| c.f1_score),
        support: total,
    };

    let mut report = ClassificationReport {
        accuracy: accuracy(y_true, y_pred),
        classes,
        macro_avg,
        weighted_avg,
        warnings: Vec::new(),
    };
    if !no_predictions.is_empty() {
        report.add_warning(format!(
            "precision is ill-defined and set to 0.0 for labels with no predicted samples: {}",
            no_predictions.join(", ")
        ));
    }
    if !no_support.is_empty() {
        report.add_warning(format!(
            "recall is ill-defined and set to 0.0 for labels with no true samples: {}",
            no_support.join(", ")
        ));
    }
    Ok(report)
}

const DIGITS: usize = 2;
const HEADERS: [&str; 4] = ["precision", "recall", "f1-score", "support"];

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .chain(["weighted avg".len(), DIGITS])
            .max()
            .unwrap_or(0);
        let row = |f: &mut fmt::Formatter<'_>, name: &str, p: f64, r: f64, f1: f64, s: usize| {
            writeln!(
                f,
                "{:>width$}  {:>9.d$} {:>9.d$} {:>9.d$} {:>9}",
                name,
                p,
                r,
                f1,
                s,
                width = width,
                d = DIGITS
            )
        };

        write!(f, "{:>width$} ", "", width = width)?;
        for h in HEADERS {
            write!(f, " {:>9}", h)?;
        }
        writeln!(f)?;
        writeln!(f)?;
        for c in &self.classes {
            row(f, &c.label, c.precision, c.recall, c.f1_score, c.support)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9.d$} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.macro_avg.support,
            width = width,
            d = DIGITS
        )?;
        let m = &self.macro_avg;
        row(f, "macro avg", m.precision, m.recall, m.f1_score, m.support)?;
        let w = &self.weighted_avg;
        row(f, "weighted avg", w.precision, w.recall, w.f1_score, w.support)
    }
}
