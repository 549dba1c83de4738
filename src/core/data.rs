// src/core/data.rs
use crate::core::{ColumnConfig, InsightError, Result};
use ndarray::{s, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A coerced feature block (rows x features).
pub type Dataset = Array2<f64>;

/// One cell of an already-cleaned table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    /// Numeric reading of the cell: numbers as-is, text when it parses.
    ///
    /// NaN and infinities (including text such as `"inf"`) are not numbers here.
    pub fn as_f64(&self) -> Option<f64> {
        let n = match self {
            Value::Number(n) => *n,
            Value::Text(s) => s.trim().parse::<f64>().ok()?,
            Value::Missing => return None,
        };
        n.is_finite().then_some(n)
    }

    /// String form used for every class comparison.
    ///
    /// Text that reads as a number takes that number's label, so `1`, `"1"` and
    /// `"1.0"` are the same class.
    pub fn label(&self) -> String {
        match self {
            Value::Number(n) => format!("{}", n),
            Value::Text(s) => match self.as_f64() {
                Some(n) => format!("{}", n),
                None => s.clone(),
            },
            Value::Missing => "Missing".to_string(),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Missing, Into::into)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Read-only view over a cleaned table, stored row-major in original row order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(InsightError::InvalidInput(format!(
                    "Column '{}' appears more than once.",
                    name
                )));
            }
        }
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(InsightError::IncompatibleDimensions(format!(
                    "Row {} has {} cells, but the table has {} columns.",
                    idx,
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Table { columns, rows })
    }

    /// Builds a table from named columns of equal length.
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Vec<Value>)>) -> Result<Self> {
        let n_rows = columns.first().map_or(0, |(_, values)| values.len());
        let mut names = Vec::with_capacity(columns.len());
        let mut rows: Vec<Vec<Value>> = (0..n_rows)
            .map(|_| Vec::with_capacity(columns.len()))
            .collect();

        for (name, values) in columns {
            let name = name.into();
            if values.len() != n_rows {
                return Err(InsightError::IncompatibleDimensions(format!(
                    "Column '{}' has {} values, expected {}.",
                    name,
                    values.len(),
                    n_rows
                )));
            }
            for (row, value) in rows.iter_mut().zip(values) {
                row.push(value);
            }
            names.push(name);
        }
        Table::new(names, rows)
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row`, `col`; `None` when either index is out of range.
    pub fn value(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row)?.get(col)
    }

    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| &row[col])
    }

    /// Samples the leading non-missing cells of a column to decide its kind.
    pub fn column_kind(&self, col: usize, config: &ColumnConfig) -> ColumnKind {
        let mut sampled = 0usize;
        let mut numeric = 0usize;
        for value in self
            .column_values(col)
            .filter(|v| !v.is_missing())
            .take(config.sample_size)
        {
            sampled += 1;
            if value.as_f64().is_some() {
                numeric += 1;
            }
        }
        if sampled > 0 && numeric as f64 >= config.numeric_ratio * sampled as f64 {
            ColumnKind::Numeric
        } else {
            ColumnKind::Categorical
        }
    }

    /// Every parseable cell of a column, in row order.
    pub fn numeric_values(&self, col: usize) -> Vec<f64> {
        self.column_values(col).filter_map(Value::as_f64).collect()
    }

    /// Coerces the named columns into a dense matrix over the first `row_limit` rows.
    ///
    /// Cells that do not parse become 0.0 and are counted in `coercion_failures`.
    pub fn feature_matrix(
        &self,
        columns: &[String],
        row_limit: Option<usize>,
    ) -> Result<FeatureMatrix> {
        let indices = columns
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| InsightError::MissingColumn(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let n_rows = row_limit.map_or(self.n_rows(), |limit| limit.min(self.n_rows()));
        let mut flat = Vec::with_capacity(n_rows * indices.len());
        let mut coercion_failures = 0usize;
        for row in self.rows.iter().take(n_rows) {
            for &col in &indices {
                match row[col].as_f64() {
                    Some(x) => flat.push(x),
                    None => {
                        coercion_failures += 1;
                        flat.push(0.0);
                    }
                }
            }
        }

        let values = Dataset::from_shape_vec((n_rows, indices.len()), flat)?;
        Ok(FeatureMatrix {
            columns: columns.to_vec(),
            values,
            coercion_failures,
        })
    }
}

/// Numeric features after coercion, with a count of cells that had to be zero-filled.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub values: Dataset,
    pub coercion_failures: usize,
}

impl FeatureMatrix {
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn column(&self, idx: usize) -> ArrayView1<'_, f64> {
        self.values.column(idx)
    }

    /// Splits into leading and trailing row blocks at `at`.
    pub fn split_rows(&self, at: usize) -> (ArrayView2<'_, f64>, ArrayView2<'_, f64>) {
        let at = at.min(self.nrows());
        (
            self.values.slice(s![..at, ..]),
            self.values.slice(s![at.., ..]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Result<Table> {
        Table::from_columns(vec![
            ("age", vec![Value::from(30), Value::from("41"), Value::from(25)]),
            ("dept", vec![Value::from("IT"), Value::from("HR"), Value::Missing]),
            ("score", vec![Value::from(1.5), Value::from("n/a"), Value::from(2.5)]),
        ])
    }

    #[test]
    fn numbers_and_numeric_text_share_a_label() {
        assert_eq!(Value::from(1).label(), Value::from("1").label());
        assert_eq!(Value::from(2.5).label(), "2.5");
        assert_eq!(Value::Missing.label(), "Missing");
        assert_eq!(Value::from(" 3.25 ").as_f64(), Some(3.25));
        assert_eq!(Value::from("Yes").as_f64(), None);
        assert_eq!(Value::from("1.0").label(), Value::from(1).label());
        assert_eq!(Value::from(" 2.50").label(), "2.5");
        assert_eq!(Value::from("007x").label(), "007x");
    }

    #[test]
    fn non_finite_cells_are_not_numbers() -> Result<()> {
        assert_eq!(Value::from("inf").as_f64(), None);
        assert_eq!(Value::from(f64::NAN).as_f64(), None);
        assert_eq!(Value::from("-Infinity").label(), "-Infinity");

        let table = Table::from_columns(vec![(
            "x",
            vec![Value::from(1.0), Value::from("inf"), Value::from(f64::NEG_INFINITY)],
        )])?;
        let features = table.feature_matrix(&["x".to_string()], None)?;
        assert_eq!(features.coercion_failures, 2);
        assert_eq!(table.numeric_values(0), vec![1.0]);
        Ok(())
    }

    #[test]
    fn out_of_range_cells_are_none() -> Result<()> {
        let table = sample_table()?;
        assert!(table.value(0, 0).is_some());
        assert_eq!(table.value(table.n_rows(), 0), None);
        assert_eq!(table.value(0, table.n_cols()), None);
        Ok(())
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Table::new(
            vec!["a".into(), "b".into()],
            vec![vec![Value::from(1)], vec![Value::from(1), Value::from(2)]],
        )
        .unwrap_err();
        assert!(matches!(err, InsightError::IncompatibleDimensions(_)));
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let err = Table::new(vec!["a".into(), "a".into()], vec![]).unwrap_err();
        assert!(matches!(err, InsightError::InvalidInput(_)));
    }

    #[test]
    fn kind_inference_uses_the_numeric_ratio() -> Result<()> {
        let table = sample_table()?;
        let config = ColumnConfig::default();
        assert_eq!(table.column_kind(0, &config), ColumnKind::Numeric);
        assert_eq!(table.column_kind(1, &config), ColumnKind::Categorical);
        // 2 of 3 cells parse: below 80%.
        assert_eq!(table.column_kind(2, &config), ColumnKind::Categorical);

        let lenient = ColumnConfig {
            numeric_ratio: 0.6,
            ..ColumnConfig::default()
        };
        assert_eq!(table.column_kind(2, &lenient), ColumnKind::Numeric);
        Ok(())
    }

    #[test]
    fn all_missing_column_is_categorical() -> Result<()> {
        let table = Table::from_columns(vec![("x", vec![Value::Missing, Value::Missing])])?;
        assert_eq!(
            table.column_kind(0, &ColumnConfig::default()),
            ColumnKind::Categorical
        );
        Ok(())
    }

    #[test]
    fn coercion_zero_fills_and_counts() -> Result<()> {
        let table = sample_table()?;
        let matrix = table.feature_matrix(&["age".to_string(), "score".to_string()], None)?;
        assert_eq!(matrix.nrows(), 3);
        assert_eq!(matrix.ncols(), 2);
        assert_eq!(matrix.values[[1, 0]], 41.0);
        assert_eq!(matrix.values[[1, 1]], 0.0);
        assert_eq!(matrix.coercion_failures, 1);

        let (train, test) = matrix.split_rows(2);
        assert_eq!(train.nrows(), 2);
        assert_eq!(test.nrows(), 1);
        Ok(())
    }

    #[test]
    fn feature_matrix_honours_row_limit_and_missing_columns() -> Result<()> {
        let table = sample_table()?;
        let matrix = table.feature_matrix(&["age".to_string()], Some(2))?;
        assert_eq!(matrix.nrows(), 2);

        let err = table.feature_matrix(&["salary".to_string()], None).unwrap_err();
        assert!(matches!(err, InsightError::MissingColumn(name) if name == "salary"));
        Ok(())
    }

    #[test]
    fn values_serialize_as_plain_json() -> Result<()> {
        let json = serde_json::to_string(&vec![Value::from(1), Value::from("a"), Value::Missing])?;
        assert_eq!(json, r#"[1.0,"a",null]"#);
        let back: Vec<Value> = serde_json::from_str(r#"[2, "b", null]"#)?;
        assert_eq!(back, vec![Value::from(2), Value::from("b"), Value::Missing]);
        Ok(())
    }
}
