//! One-hot encoding of categorical columns and standardization of features.
use crate::datasets::{ColumnData, RawTable};
use crate::error::{PipelineError, Result};
use crate::layers::Matrix;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// How a prepared column was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// Passed through from a numeric source column.
    Numeric,
    /// 0/1 indicator for one category of a categorical column.
    Indicator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    pub name: String,
    pub kind: FeatureKind,
}

/// Purely numeric table: `rows[i][j]` is sample `i`, column `j`.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTable {
    pub columns: Vec<FeatureColumn>,
    pub rows: Matrix,
}

impl PreparedTable {
    /// Exact, case-sensitive lookup by column name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Values of column `idx` in row order.
    pub fn column_values(&self, idx: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[idx]).collect()
    }
}

/// Expand every categorical column into `{column}_{value}` indicator columns.
///
/// Numeric columns keep their source order and come first; indicator columns
/// follow, grouped by source column, with categories in lexical order.
pub fn prepare_dataset(table: &RawTable) -> PreparedTable {
    let n_rows = table.n_rows();
    let mut columns = Vec::new();

    // Schema first, so every row is allocated once at its final width.
    for col in table.columns() {
        if col.data.is_numeric() {
            columns.push(FeatureColumn {
                name: col.name.clone(),
                kind: FeatureKind::Numeric,
            });
        }
    }
    // (first prepared column, category -> offset) per categorical source column
    let mut encodings: Vec<(usize, &[String], BTreeMap<&str, usize>)> = Vec::new();
    for col in table.columns() {
        if let ColumnData::Categorical(v) = &col.data {
            let categories: BTreeSet<&str> = v.iter().map(String::as_str).collect();
            debug!(column = %col.name, categories = categories.len(), "one-hot encoding");
            let start = columns.len();
            let offsets = categories
                .into_iter()
                .enumerate()
                .map(|(offset, category)| {
                    columns.push(FeatureColumn {
                        name: format!("{}_{}", col.name, category),
                        kind: FeatureKind::Indicator,
                    });
                    (category, offset)
                })
                .collect();
            encodings.push((start, v.as_slice(), offsets));
        }
    }

    let width = columns.len();
    let mut rows: Matrix = vec![vec![0.0; width]; n_rows];
    let numeric = table.columns().iter().filter_map(|c| match &c.data {
        ColumnData::Numeric(v) => Some(v),
        ColumnData::Categorical(_) => None,
    });
    for (j, values) in numeric.enumerate() {
        for (row, &v) in rows.iter_mut().zip(values) {
            row[j] = v;
        }
    }
    for (start, values, offsets) in &encodings {
        for (row, value) in rows.iter_mut().zip(values.iter()) {
            row[start + offsets[value.as_str()]] = 1.0;
        }
    }
    info!(
        source_columns = table.n_columns(),
        prepared_columns = columns.len(),
        "prepared dataset"
    );
    PreparedTable { columns, rows }
}

/// Per-column standardization fitted on a reference matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
    /// Columns whose variance was negligible and got a unit scale.
    degenerate: Vec<usize>,
}

impl StandardScaler {
    /// Compute mean and population standard deviation per column.
    pub fn fit(x: &Matrix) -> Result<Self> {
        let n = x.len();
        if n == 0 {
            return Err(PipelineError::insufficient(
                "scale",
                "cannot fit scaler on an empty training matrix",
            ));
        }
        let width = x[0].len();
        for (row_idx, row) in x.iter().enumerate() {
            if row.len() != width {
                return Err(PipelineError::shape("scale", width, row.len()));
            }
            if let Some((column, &value)) = row.iter().enumerate().find(|(_, v)| !v.is_finite()) {
                return Err(PipelineError::NonFinite {
                    column,
                    row: row_idx,
                    value,
                });
            }
        }

        let nf = n as f64;
        let mut mean = vec![0.0; width];
        for row in x {
            for (m, &v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= nf);

        let mut var = vec![0.0; width];
        for row in x {
            for ((s, &v), &m) in var.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2);
            }
        }
        var.iter_mut().for_each(|s| *s /= nf);

        let mut degenerate = Vec::new();
        let scale = var
            .iter()
            .zip(&mean)
            .enumerate()
            .map(|(j, (&v, &m))| {
                if is_constant(v, m, nf) {
                    degenerate.push(j);
                    1.0
                } else {
                    v.sqrt()
                }
            })
            .collect();
        if !degenerate.is_empty() {
            warn!(columns = ?degenerate, "zero-variance training columns, using unit scale");
        }
        Ok(Self {
            mean,
            scale,
            degenerate,
        })
    }

    /// Apply `(x - mean) / scale` using the fitted parameters.
    pub fn transform(&self, x: &Matrix) -> Result<Matrix> {
        x.iter()
            .map(|row| {
                if row.len() != self.mean.len() {
                    return Err(PipelineError::shape("scale", self.mean.len(), row.len()));
                }
                Ok(row
                    .iter()
                    .zip(&self.mean)
                    .zip(&self.scale)
                    .map(|((&v, &m), &s)| (v - m) / s)
                    .collect())
            })
            .collect()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn degenerate_columns(&self) -> &[usize] {
        &self.degenerate
    }
}

/// Variance below the floating-point noise floor for this mean and sample count.
fn is_constant(var: f64, mean: f64, n: f64) -> bool {
    let eps = f64::EPSILON;
    let upper_bound = n * eps * var + (n * mean * eps).powi(2);
    var <= upper_bound
}

/// Fit on `train` only, then transform both partitions.
pub fn scale_features(train: &Matrix, eval: &Matrix) -> Result<(Matrix, Matrix)> {
    let scaler = StandardScaler::fit(train)?;
    Ok((scaler.transform(train)?, scaler.transform(eval)?))
}
