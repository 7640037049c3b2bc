pub mod slice;

pub use slice::SliceParser;

use serde::{Deserialize, Serialize};

use crate::io::DEFAULT_READ_BUFFER_SIZE;

pub(crate) const MAX_BATCH_SIZE: usize = 10_000_000;
pub(crate) const MAX_QUEUE_BATCHES: usize = 256;

/// Options for CSV streaming (row and columnar modes share these).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field separator byte.
    pub delimiter: u8,
    /// Quote byte.
    pub quote: u8,
    /// Treat the first row as a header.
    pub has_header: bool,
    /// Rows per emitted batch; clamped to [1, 10,000,000].
    pub batch_size: usize,
    /// Queue depth in batches; clamped to [1, 256].
    pub max_queue_batches: usize,
    /// Map the file instead of buffered reads.
    pub use_mmap: bool,
    /// Buffered chunk size; clamped to [4 KiB, 64 MiB].
    pub read_buffer_size: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            has_header: true,
            batch_size: 10_000,
            max_queue_batches: 2,
            use_mmap: false,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl CsvOptions {
    /// Returns a copy with every knob clamped into its documented range.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        out.batch_size = out.batch_size.clamp(1, MAX_BATCH_SIZE);
        out.max_queue_batches = out.max_queue_batches.clamp(1, MAX_QUEUE_BATCHES);
        out
    }
}
