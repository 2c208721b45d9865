use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CellValue – a single cell of a table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Using `BTreeSet` downstream so `CellValue` must be `Ord`.
#[derive(Debug, Clone)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Timezone-naive instant.
    DateTime(NaiveDateTime),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                DateTime(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::DateTime(dt) => dt.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "<null>"),
            other => write!(f, "{}", other.as_text()),
        }
    }
}

impl CellValue {
    /// Try to interpret the value as an `f64` (booleans count as 0/1).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// String form used for text matching. Whole floats keep one decimal
    /// (`2.0`), nulls become the empty string.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::String(s) => Cow::Borrowed(s),
            CellValue::Integer(i) => Cow::Owned(i.to_string()),
            CellValue::Float(v) if v.is_finite() && v.fract() == 0.0 => {
                Cow::Owned(format!("{v:.1}"))
            }
            CellValue::Float(v) => Cow::Owned(v.to_string()),
            CellValue::Bool(b) => Cow::Owned(b.to_string()),
            CellValue::DateTime(dt) => Cow::Owned(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            CellValue::Null => Cow::Borrowed(""),
        }
    }
}

// ---------------------------------------------------------------------------
// DType – storage type of a column
// ---------------------------------------------------------------------------

/// Storage type of a column, inferred from its values on load.
/// `Categorical` is never inferred; it has to be declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Boolean,
    Integer,
    Float,
    Text,
    DateTime,
    Categorical,
}

impl DType {
    pub fn is_numeric(self) -> bool {
        matches!(self, DType::Boolean | DType::Integer | DType::Float)
    }
}

/// Infer the dtype of a sequence of cells. Nulls are ignored; a column with
/// no non-null values is `Text`.
fn infer_dtype(values: &[CellValue]) -> DType {
    let mut seen_bool = false;
    let mut seen_int = false;
    let mut seen_float = false;
    let mut seen_datetime = false;
    let mut seen_other = false;

    for v in values {
        match v {
            CellValue::Null => {}
            CellValue::Bool(_) => seen_bool = true,
            CellValue::Integer(_) => seen_int = true,
            CellValue::Float(_) => seen_float = true,
            CellValue::DateTime(_) => seen_datetime = true,
            CellValue::String(_) => seen_other = true,
        }
    }

    match (seen_bool, seen_int, seen_float, seen_datetime, seen_other) {
        (true, false, false, false, false) => DType::Boolean,
        (false, true, false, false, false) => DType::Integer,
        (false, _, true, false, false) => DType::Float,
        (false, false, false, true, false) => DType::DateTime,
        _ => DType::Text,
    }
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// A named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: DType,
    pub values: Vec<CellValue>,
}

impl Column {
    /// Build a column and infer its dtype. Integers in a mixed
    /// integer/float column are promoted to floats.
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        let dtype = infer_dtype(&values);
        let values = if dtype == DType::Float {
            values
                .into_iter()
                .map(|v| match v {
                    CellValue::Integer(i) => CellValue::Float(i as f64),
                    other => other,
                })
                .collect()
        } else {
            values
        };
        Column {
            name: name.into(),
            dtype,
            values,
        }
    }

    /// Override the inferred dtype, e.g. to declare a column categorical.
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sorted set of the distinct non-null values.
    pub fn unique_values(&self) -> BTreeSet<CellValue> {
        self.values
            .iter()
            .filter(|v| !v.is_null())
            .cloned()
            .collect()
    }

    /// Number of distinct non-null values.
    pub fn n_unique(&self) -> usize {
        self.unique_values().len()
    }

    pub fn is_all_null(&self) -> bool {
        self.values.iter().all(CellValue::is_null)
    }

    /// New column holding the cells at `indices`, in that order.
    pub fn take(&self, indices: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            dtype: self.dtype,
            values: indices.iter().map(|&i| self.values[i].clone()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("column '{column}' has {found} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("cannot concatenate tables with different columns")]
    SchemaMismatch,
}

/// Named, positionally aligned columns plus an optional index column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// Row labels; kept through filtering but never filtered on.
    pub index: Option<Column>,
    /// Ordered data columns.
    pub columns: Vec<Column>,
}

impl Table {
    /// Build a table, checking that every column has the same length.
    pub fn new(columns: Vec<Column>) -> Result<Self, ModelError> {
        if let Some(first) = columns.first() {
            let expected = first.len();
            for col in &columns {
                if col.len() != expected {
                    return Err(ModelError::LengthMismatch {
                        column: col.name.clone(),
                        expected,
                        found: col.len(),
                    });
                }
            }
        }
        Ok(Table {
            index: None,
            columns,
        })
    }

    /// Attach an index column of matching length.
    pub fn with_index(mut self, index: Column) -> Result<Self, ModelError> {
        if !self.columns.is_empty() && index.len() != self.n_rows() {
            return Err(ModelError::LengthMismatch {
                column: index.name.clone(),
                expected: self.n_rows(),
                found: index.len(),
            });
        }
        self.index = Some(index);
        Ok(self)
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.columns
            .first()
            .or(self.index.as_ref())
            .map_or(0, Column::len)
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Rows at `indices`, in that order; all columns and the index are kept.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            index: self.index.as_ref().map(|ix| ix.take(indices)),
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
        }
    }

    /// Rows whose mask entry is `true`.
    pub fn filter_mask(&self, mask: &[bool]) -> Table {
        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter(|(_, keep)| **keep)
            .map(|(i, _)| i)
            .collect();
        self.take_rows(&indices)
    }

    /// Stack tables with identical column names vertically. Dtypes are taken
    /// from the first table.
    pub fn concat(tables: &[Table]) -> Result<Table, ModelError> {
        let Some(first) = tables.first() else {
            return Ok(Table::default());
        };
        let names = first.column_names();
        let mut out = first.clone();
        for table in &tables[1..] {
            if table.column_names() != names || table.index.is_some() != out.index.is_some() {
                return Err(ModelError::SchemaMismatch);
            }
            for (dst, src) in out.columns.iter_mut().zip(&table.columns) {
                dst.values.extend(src.values.iter().cloned());
            }
            if let (Some(dst), Some(src)) = (out.index.as_mut(), table.index.as_ref()) {
                dst.values.extend(src.values.iter().cloned());
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(vals: &[&str]) -> Vec<CellValue> {
        vals.iter().map(|s| CellValue::String(s.to_string())).collect()
    }

    #[test]
    fn dtype_inference_promotes_mixed_numbers() {
        let col = Column::new(
            "eRT",
            vec![CellValue::Integer(1), CellValue::Float(2.5), CellValue::Null],
        );
        assert_eq!(col.dtype, DType::Float);
        assert_eq!(col.values[0], CellValue::Float(1.0));

        let col = Column::new("Player", strings(&["a", "b"]));
        assert_eq!(col.dtype, DType::Text);

        let col = Column::new("empty", vec![CellValue::Null, CellValue::Null]);
        assert_eq!(col.dtype, DType::Text);
        assert!(col.is_all_null());
    }

    #[test]
    fn unique_values_skip_nulls() {
        let col = Column::new(
            "Type",
            vec![
                CellValue::String("RS".into()),
                CellValue::Null,
                CellValue::String("PO".into()),
                CellValue::String("RS".into()),
            ],
        );
        assert_eq!(col.n_unique(), 2);
    }

    #[test]
    fn table_rejects_ragged_columns() {
        let err = Table::new(vec![
            Column::new("a", vec![CellValue::Integer(1)]),
            Column::new("b", vec![]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ModelError::LengthMismatch {
                column: "b".into(),
                expected: 1,
                found: 0
            }
        );
    }

    #[test]
    fn filter_mask_keeps_every_column_and_index() {
        let table = Table::new(vec![
            Column::new("Player", strings(&["x", "y", "z"])),
            Column::new("Age", vec![
                CellValue::Integer(20),
                CellValue::Integer(21),
                CellValue::Integer(22),
            ]),
        ])
        .unwrap()
        .with_index(Column::new("id", strings(&["r0", "r1", "r2"])))
        .unwrap();

        let out = table.filter_mask(&[true, false, true]);
        assert_eq!(out.column_names(), vec!["Player", "Age"]);
        assert_eq!(out.n_rows(), 2);
        assert_eq!(out.index.unwrap().values, strings(&["r0", "r2"]));
    }

    #[test]
    fn concat_requires_matching_columns() {
        let a = Table::new(vec![Column::new("a", strings(&["1"]))]).unwrap();
        let b = Table::new(vec![Column::new("b", strings(&["2"]))]).unwrap();
        assert_eq!(Table::concat(&[a.clone(), b]), Err(ModelError::SchemaMismatch));

        let both = Table::concat(&[a.clone(), a]).unwrap();
        assert_eq!(both.n_rows(), 2);
    }

    #[test]
    fn text_form_of_values() {
        assert_eq!(CellValue::Float(2.0).as_text(), "2.0");
        assert_eq!(CellValue::Float(2.25).as_text(), "2.25");
        assert_eq!(CellValue::Null.as_text(), "");
        assert_eq!(CellValue::Null.to_string(), "<null>");
    }
}
