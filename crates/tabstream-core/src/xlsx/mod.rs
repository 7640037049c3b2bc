pub mod workbook;
pub mod xml;
pub mod zip;

pub use workbook::{resolve_sheet, SheetLocation};
pub use zip::{ZipArchive, ZipEntry};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::columnar::{build_columnar_batch, ColumnLayout, ColumnType, ColumnarBatch, ColumnarOptions, TypedFallback};
use crate::csv::CsvOptions;
use crate::types::RowBatch;

/// Sheet selection: 1-based index or exact name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(1)
    }
}

/// Options for the XLSX stream. The columnar knobs behave exactly as for
/// columnar CSV; output is columnar whenever a schema or selection is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XlsxOptions {
    pub sheet: SheetSelector,
    pub has_header: bool,
    /// Rows per emitted batch; clamped to [1, 10,000,000].
    pub batch_size: usize,
    pub select: Vec<String>,
    pub schema: HashMap<String, ColumnType>,
    pub null_values: Vec<String>,
    pub trim: bool,
    pub typed_fallback: TypedFallback,
}

impl Default for XlsxOptions {
    fn default() -> Self {
        Self {
            sheet: SheetSelector::default(),
            has_header: true,
            batch_size: 10_000,
            select: Vec::new(),
            schema: HashMap::new(),
            null_values: vec![String::new(), "null".to_owned(), "NULL".to_owned()],
            trim: false,
            typed_fallback: TypedFallback::Null,
        }
    }
}

impl XlsxOptions {
    pub(crate) fn is_columnar(&self) -> bool {
        !self.schema.is_empty() || !self.select.is_empty()
    }

    pub(crate) fn build_options(&self) -> ColumnarOptions {
        ColumnarOptions {
            csv: CsvOptions {
                has_header: self.has_header,
                batch_size: self.batch_size,
                ..CsvOptions::default()
            },
            select: self.select.clone(),
            schema: self.schema.clone(),
            null_values: self.null_values.clone(),
            trim: self.trim,
            typed_fallback: self.typed_fallback,
        }
    }
}

/// One XLSX batch: the resolved sheet headers plus either rows of strings or
/// a columnar payload.
#[derive(Debug, Clone)]
pub struct XlsxBatch {
    pub headers: Vec<String>,
    pub data: XlsxData,
}

#[derive(Debug, Clone)]
pub enum XlsxData {
    Rows(RowBatch),
    Columnar(ColumnarBatch),
}

impl XlsxBatch {
    pub fn is_columnar(&self) -> bool {
        matches!(self.data, XlsxData::Columnar(_))
    }

    pub fn row_count(&self) -> usize {
        match &self.data {
            XlsxData::Rows(rows) => rows.len(),
            XlsxData::Columnar(batch) => batch.rows,
        }
    }
}

/// Assembles one batch from accumulated sheet rows.
pub(crate) fn build_xlsx_batch(
    headers: &[String],
    rows: RowBatch,
    options: &XlsxOptions,
) -> XlsxBatch {
    if options.is_columnar() {
        let layout = ColumnLayout::select(headers, &options.select);
        let batch = build_columnar_batch(&rows, &layout, &options.build_options());
        XlsxBatch {
            headers: headers.to_vec(),
            data: XlsxData::Columnar(batch),
        }
    } else {
        XlsxBatch {
            headers: headers.to_vec(),
            data: XlsxData::Rows(rows),
        }
    }
}
