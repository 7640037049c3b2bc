pub mod columnar_stream;
pub mod metrics;
pub mod row_stream;
pub mod xlsx_stream;

pub use columnar_stream::ColumnarStream;
pub use metrics::{profile_enabled, MetricsSnapshot, PipelineMetrics};
pub use row_stream::RowStream;
pub use xlsx_stream::XlsxStream;
