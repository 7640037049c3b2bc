pub mod arena;
pub mod columnar;
pub mod csv;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod queue;
pub mod scan;
pub mod types;
pub mod xlsx;

pub use arena::Arena;
pub use columnar::{
    build_columnar_batch, build_row_batch, Column, ColumnLayout, ColumnType, ColumnarBatch,
    ColumnarOptions, TypedFallback,
};
pub use csv::{CsvOptions, SliceParser};
pub use error::TabError;
pub use io::{FileReader, ReaderOptions};
pub use pipeline::{
    profile_enabled, ColumnarStream, MetricsSnapshot, PipelineMetrics, RowStream, XlsxStream,
};
pub use queue::BoundedQueue;
pub use types::{BatchResult, FieldSlice, Result, Row, RowBatch, SliceBatch, SliceRow};
pub use xlsx::{SheetSelector, XlsxBatch, XlsxData, XlsxOptions, ZipArchive};
