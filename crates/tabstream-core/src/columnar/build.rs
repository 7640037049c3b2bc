use std::collections::HashMap;

use crate::types::{Row, RowBatch, SliceBatch, SliceRow};

use super::decode;
use super::{Column, ColumnType, ColumnarBatch, ColumnarOptions};

/// Maps output columns to their field positions inside incoming rows.
///
/// Selection changes the positional meaning of a row twice: the header batch
/// still carries every column, while later batches carry only the selected
/// ones (in file order) once push-down is active. The layout pins each output
/// header to its source index for whichever shape is being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Output headers in emission order.
    pub headers: Vec<String>,
    /// `source[i]` is the field index of `headers[i]` in each incoming row.
    pub source: Vec<usize>,
}

impl ColumnLayout {
    /// Identity layout: every header, in header order.
    pub fn full(headers: &[String]) -> Self {
        Self {
            headers: headers.to_vec(),
            source: (0..headers.len()).collect(),
        }
    }

    /// Layout for a `select` list over full rows: output follows the select
    /// sequence; names missing from `headers` are dropped, duplicates keep
    /// their first occurrence. An empty `select` is the identity layout.
    pub fn select(headers: &[String], select: &[String]) -> Self {
        if select.is_empty() {
            return Self::full(headers);
        }
        let mut out = Self {
            headers: Vec::with_capacity(select.len()),
            source: Vec::with_capacity(select.len()),
        };
        for name in select {
            if out.headers.iter().any(|h| h == name) {
                continue;
            }
            if let Some(idx) = headers.iter().position(|h| h == name) {
                out.headers.push(name.clone());
                out.source.push(idx);
            }
        }
        out
    }

    /// Rewrites source indices for rows produced under selection push-down,
    /// where only the selected fields remain, in file order.
    pub fn pushed_down(&self) -> Self {
        let mut ordered: Vec<usize> = self.source.clone();
        ordered.sort_unstable();
        let source = self
            .source
            .iter()
            .map(|idx| ordered.binary_search(idx).expect("index is in its own layout"))
            .collect();
        Self {
            headers: self.headers.clone(),
            source,
        }
    }

    /// The 0-based logical column indices to push into the slice parser.
    pub fn selected_indices(&self) -> Vec<usize> {
        self.source.clone()
    }
}

/// Materialises one slice row into strings. Cells are decoded lossily; the
/// slice payload is exactly the unescaped cell bytes.
pub fn slice_row_to_strings(row: &SliceRow, arena: &[u8]) -> Row {
    row.iter()
        .map(|slice| String::from_utf8_lossy(slice.bytes(arena)).into_owned())
        .collect()
}

/// Materialises a slice batch as rows of strings.
pub fn build_row_batch(batch: &SliceBatch) -> RowBatch {
    batch
        .rows
        .iter()
        .map(|row| slice_row_to_strings(row, &batch.arena))
        .collect()
}

/// Converts string rows into typed columns with null masks.
///
/// Cells are trimmed (when configured) before the null-token check; typed
/// parse failures mark the cell null and leave the slot at its zero value.
/// Rows shorter than the layout read missing cells as empty strings.
pub fn build_columnar_batch(
    rows: &[Row],
    layout: &ColumnLayout,
    options: &ColumnarOptions,
) -> ColumnarBatch {
    let row_count = rows.len();
    let mut columns = HashMap::with_capacity(layout.headers.len());

    for (header, &src) in layout.headers.iter().zip(&layout.source) {
        let column_type = options
            .schema
            .get(header)
            .copied()
            .unwrap_or(ColumnType::String);
        let column = match column_type {
            ColumnType::String => build_string_column(rows, src, options),
            ColumnType::Int32 => {
                build_typed_column(rows, src, options, decode::parse_i32, |values, null_mask| {
                    Column::Int32 { values, null_mask }
                })
            }
            ColumnType::Int64 => {
                build_typed_column(rows, src, options, decode::parse_i64, |values, null_mask| {
                    Column::Int64 { values, null_mask }
                })
            }
            ColumnType::Float64 => {
                build_typed_column(rows, src, options, decode::parse_f64, |values, null_mask| {
                    Column::Float64 { values, null_mask }
                })
            }
            ColumnType::Bool => {
                build_typed_column(rows, src, options, decode::parse_bool, |values, null_mask| {
                    Column::Bool { values, null_mask }
                })
            }
        };
        columns.insert(header.clone(), column);
    }

    ColumnarBatch {
        headers: layout.headers.clone(),
        columns,
        rows: row_count,
    }
}

fn cell_at<'a>(rows: &'a [Row], row: usize, src: usize) -> &'a str {
    rows[row].get(src).map(String::as_str).unwrap_or("")
}

fn build_string_column(rows: &[Row], src: usize, options: &ColumnarOptions) -> Column {
    let mut values = Vec::with_capacity(rows.len());
    for row in 0..rows.len() {
        let mut cell = cell_at(rows, row, src).as_bytes();
        if options.trim {
            cell = decode::trim_cell(cell);
        }
        if decode::is_null_token(cell, &options.null_values) {
            values.push(String::new());
        } else {
            values.push(String::from_utf8_lossy(cell).into_owned());
        }
    }
    Column::String(values)
}

fn build_typed_column<T: Default + Copy>(
    rows: &[Row],
    src: usize,
    options: &ColumnarOptions,
    parse: impl Fn(&[u8]) -> Option<T>,
    make: impl FnOnce(Vec<T>, Vec<u8>) -> Column,
) -> Column {
    let mut values = vec![T::default(); rows.len()];
    let mut null_mask = vec![0u8; rows.len()];
    for row in 0..rows.len() {
        let mut cell = cell_at(rows, row, src).as_bytes();
        if options.trim {
            cell = decode::trim_cell(cell);
        }
        if decode::is_null_token(cell, &options.null_values) {
            null_mask[row] = 1;
            continue;
        }
        match parse(cell) {
            Some(value) => values[row] = value,
            // Parse failure is a per-cell null under both fallback policies.
            None => null_mask[row] = 1,
        }
    }
    make(values, null_mask)
}
