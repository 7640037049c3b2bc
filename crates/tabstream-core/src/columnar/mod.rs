pub mod build;
pub mod decode;

pub use build::{build_columnar_batch, build_row_batch, slice_row_to_strings, ColumnLayout};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::csv::CsvOptions;

/// Cell type for a typed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Int32,
    Int64,
    Float64,
    Bool,
}

/// Policy applied when a typed cell fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypedFallback {
    /// Failed cells are marked null.
    #[default]
    Null,
    /// Accepted for compatibility; behaves as `Null` — a typed column cannot
    /// widen to string storage mid-batch.
    String,
}

/// Options for the columnar CSV stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnarOptions {
    pub csv: CsvOptions,
    /// Restrict and order the output columns; empty means all, in header
    /// order. Also pushed down into the slice parser once headers resolve.
    pub select: Vec<String>,
    /// Column type per header; unlisted headers decode as strings.
    pub schema: HashMap<String, ColumnType>,
    /// Tokens that become null in typed columns and empty in string columns.
    pub null_values: Vec<String>,
    /// Strip ASCII whitespace around each cell before the null/type checks.
    pub trim: bool,
    pub typed_fallback: TypedFallback,
}

impl Default for ColumnarOptions {
    fn default() -> Self {
        Self {
            csv: CsvOptions::default(),
            select: Vec::new(),
            schema: HashMap::new(),
            null_values: vec![String::new(), "null".to_owned(), "NULL".to_owned()],
            trim: false,
            typed_fallback: TypedFallback::Null,
        }
    }
}

/// One typed column. Non-string variants carry a parallel null mask
/// (`0` = valid, `1` = null) of the same length as the value vector; string
/// columns have no mask — null tokens collapse to the empty string.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    String(Vec<String>),
    Int32 { values: Vec<i32>, null_mask: Vec<u8> },
    Int64 { values: Vec<i64>, null_mask: Vec<u8> },
    Float64 { values: Vec<f64>, null_mask: Vec<u8> },
    Bool { values: Vec<bool>, null_mask: Vec<u8> },
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::String(values) => values.len(),
            Column::Int32 { values, .. } => values.len(),
            Column::Int64 { values, .. } => values.len(),
            Column::Float64 { values, .. } => values.len(),
            Column::Bool { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::String(_) => ColumnType::String,
            Column::Int32 { .. } => ColumnType::Int32,
            Column::Int64 { .. } => ColumnType::Int64,
            Column::Float64 { .. } => ColumnType::Float64,
            Column::Bool { .. } => ColumnType::Bool,
        }
    }

    /// The null mask, absent for string columns.
    pub fn null_mask(&self) -> Option<&[u8]> {
        match self {
            Column::String(_) => None,
            Column::Int32 { null_mask, .. }
            | Column::Int64 { null_mask, .. }
            | Column::Float64 { null_mask, .. }
            | Column::Bool { null_mask, .. } => Some(null_mask),
        }
    }
}

/// One batch in columnar form. Every column has exactly `rows` entries and
/// `columns` is keyed by `headers`, whose order is the emission order.
#[derive(Debug, Clone, Default)]
pub struct ColumnarBatch {
    pub headers: Vec<String>,
    pub columns: HashMap<String, Column>,
    pub rows: usize,
}
