//! CSV loading into a column-typed in-memory table.
use crate::error::{PipelineError, Result};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Cell values treated as missing, in addition to the empty string.
const NA_MARKERS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A", "#NA",
    "#N/A N/A", "<NA>", "1.#IND", "-1.#IND", "1.#QNAN", "-1.#QNAN",
];

/// Category used for missing cells in a categorical column.
pub const MISSING_CATEGORY: &str = "0";

/// Typed storage for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnData::Numeric(_))
    }
}

/// A named column of a [`RawTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn categorical<S: Into<String>>(name: impl Into<String>, values: Vec<S>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Categorical(values.into_iter().map(Into::into).collect()),
        }
    }
}

/// Loaded dataset: rows are samples, columns are named fields.
///
/// Every column holds exactly `n_rows` values and no cell is missing; gaps in
/// the source are already filled with zero.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    columns: Vec<Column>,
    n_rows: usize,
}

impl RawTable {
    /// Build a table from columns of equal length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(|c| c.data.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.data.len() != n_rows) {
            return Err(PipelineError::shape("load", n_rows, bad.data.len()));
        }
        Ok(Self { columns, n_rows })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }
}

/// Load a comma-separated file with a header row.
pub fn read_dataset(path: impl AsRef<Path>) -> Result<RawTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| PipelineError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    let table = read_dataset_from_reader(file, path)?;
    info!(
        path = %path.display(),
        rows = table.n_rows(),
        columns = table.n_columns(),
        "loaded dataset"
    );
    Ok(table)
}

/// Parse CSV from any reader. `origin` is only used in error messages.
pub fn read_dataset_from_reader<R: Read>(reader: R, origin: &Path) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| csv_error(e, origin))?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(PipelineError::Parse {
            path: origin.to_path_buf(),
            message: "missing header row".to_string(),
        });
    }
    let names = dedupe_headers(headers);

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    for result in rdr.records() {
        let record = result.map_err(|e| csv_error(e, origin))?;
        for (col, field) in cells.iter_mut().zip(record.iter()) {
            col.push(if is_missing(field) {
                None
            } else {
                Some(field.to_string())
            });
        }
    }

    let columns = names
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| infer_column(name, raw))
        .collect();
    RawTable::from_columns(columns)
}

fn csv_error(err: csv::Error, origin: &Path) -> PipelineError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => PipelineError::FileAccess {
            path: origin.to_path_buf(),
            source,
        },
        _ => PipelineError::Parse {
            path: origin.to_path_buf(),
            message,
        },
    }
}

fn is_missing(field: &str) -> bool {
    let trimmed = field.trim();
    // float parsing also accepts spellings like "NAN" or "nAn"
    trimmed.is_empty()
        || NA_MARKERS.contains(&trimmed)
        || trimmed.parse::<f64>().is_ok_and(f64::is_nan)
}

/// Repeated names become `name.1`, `name.2`, ...
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(headers.len());
    for name in headers {
        let count = seen.entry(name.clone()).or_insert(0);
        if *count == 0 {
            out.push(name);
        } else {
            out.push(format!("{}.{}", name, count));
        }
        *count += 1;
    }
    out
}

fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        return Some(1.0);
    }
    if s.eq_ignore_ascii_case("false") {
        return Some(0.0);
    }
    s.parse::<f64>().ok()
}

/// Numeric when every present cell parses; missing cells become zero either way.
fn infer_column(name: String, raw: Vec<Option<String>>) -> Column {
    let parsed: Option<Vec<f64>> = raw
        .iter()
        .map(|cell| match cell {
            None => Some(0.0),
            Some(s) => parse_number(s),
        })
        .collect();
    match parsed {
        Some(values) => {
            debug!(column = %name, "numeric column");
            Column::numeric(name, values)
        }
        None => {
            debug!(column = %name, "categorical column");
            let values = raw
                .into_iter()
                .map(|cell| cell.unwrap_or_else(|| MISSING_CATEGORY.to_string()))
                .collect::<Vec<String>>();
            Column::categorical(name, values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(text: &str) -> Result<RawTable> {
        read_dataset_from_reader(text.as_bytes(), &PathBuf::from("inline.csv"))
    }

    #[test]
    fn missing_numeric_cell_becomes_zero() {
        let table = parse("age,income\n30,1000\n,2000\n41,\n").unwrap();
        assert_eq!(
            table.column("age").unwrap().data,
            ColumnData::Numeric(vec![30.0, 0.0, 41.0])
        );
        assert_eq!(
            table.column("income").unwrap().data,
            ColumnData::Numeric(vec![1000.0, 2000.0, 0.0])
        );
    }

    #[test]
    fn na_markers_are_missing() {
        let table = parse("x\n1.5\nNA\nNaN\nnull\n").unwrap();
        assert_eq!(
            table.column("x").unwrap().data,
            ColumnData::Numeric(vec![1.5, 0.0, 0.0, 0.0])
        );
    }

    #[test]
    fn nan_spellings_are_missing() {
        let table = parse("x\n1\nNAN\n-nAn\n").unwrap();
        assert_eq!(
            table.column("x").unwrap().data,
            ColumnData::Numeric(vec![1.0, 0.0, 0.0])
        );
    }

    #[test]
    fn nan_label_loads_as_zero_class() {
        let table = parse("x,y\n1,1\n2,NAN\n3,0\n").unwrap();
        assert_eq!(
            table.column("y").unwrap().data,
            ColumnData::Numeric(vec![1.0, 0.0, 0.0])
        );
    }

    #[test]
    fn windows_style_na_markers_keep_column_numeric() {
        for marker in ["1.#IND", "-1.#QNAN", "#N/A N/A"] {
            let table = parse(&format!("x\n1.5\n{}\n2\n", marker)).unwrap();
            assert_eq!(
                table.column("x").unwrap().data,
                ColumnData::Numeric(vec![1.5, 0.0, 2.0])
            );
        }
    }

    #[test]
    fn text_column_is_categorical_with_zero_fill() {
        let table = parse("city,age\nA,1\n,2\nB,3\n").unwrap();
        assert_eq!(
            table.column("city").unwrap().data,
            ColumnData::Categorical(vec!["A".into(), "0".into(), "B".into()])
        );
        assert!(table.column("age").unwrap().data.is_numeric());
    }

    #[test]
    fn boolean_literals_are_numeric() {
        let table = parse("flag\nTrue\nfalse\nTRUE\n").unwrap();
        assert_eq!(
            table.column("flag").unwrap().data,
            ColumnData::Numeric(vec![1.0, 0.0, 1.0])
        );
    }

    #[test]
    fn duplicate_headers_are_suffixed() {
        let table = parse("a,a,b,a\n1,2,3,4\n").unwrap();
        assert_eq!(table.column_names(), vec!["a", "a.1", "b", "a.2"]);
    }

    #[test]
    fn header_with_spaces_is_preserved() {
        let table = parse("loan status,term\nCharged Off,36\n").unwrap();
        assert!(table.column("loan status").is_some());
    }

    #[test]
    fn ragged_rows_are_parse_errors() {
        let err = parse("a,b\n1,2\n3\n").unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }

    #[test]
    fn empty_input_is_parse_error() {
        let err = parse("").unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }

    #[test]
    fn header_only_gives_empty_table() {
        let table = parse("a,b\n").unwrap();
        assert_eq!(table.n_rows(), 0);
        assert_eq!(table.n_columns(), 2);
    }

    #[test]
    fn missing_file_is_file_access_error() {
        let err = read_dataset("definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, PipelineError::FileAccess { .. }));
    }

    #[test]
    fn unequal_columns_are_rejected() {
        let err = RawTable::from_columns(vec![
            Column::numeric("a", vec![1.0, 2.0]),
            Column::numeric("b", vec![1.0]),
        ])
        .unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch { .. }));
    }
}
