use bytes::Bytes;

use crate::error::TabError;

pub type Result<T> = std::result::Result<T, TabError>;

/// One cell as an `(offset, len)` range into its batch's arena buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldSlice {
    pub offset: usize,
    pub len: usize,
}

impl FieldSlice {
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// Resolves the slice against an arena buffer.
    ///
    /// Out-of-range slices clamp to the buffer instead of panicking; a batch
    /// produced by the slice parser never needs the clamp.
    pub fn bytes<'a>(&self, arena: &'a [u8]) -> &'a [u8] {
        if self.offset >= arena.len() || self.len == 0 {
            return &[];
        }
        let end = (self.offset + self.len).min(arena.len());
        &arena[self.offset..end]
    }
}

/// One row of field slices, all referencing the same arena buffer.
pub type SliceRow = Vec<FieldSlice>;

/// One batch of rows plus the owned bytes every slice points into.
///
/// The arena buffer is copied out of the parser on `take_batch`, so the batch
/// stays valid for its whole lifetime independent of the parser.
#[derive(Debug, Clone, Default)]
pub struct SliceBatch {
    pub arena: Bytes,
    pub rows: Vec<SliceRow>,
}

impl SliceBatch {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// One materialised row of cell strings.
pub type Row = Vec<String>;

/// A batch of materialised rows.
pub type RowBatch = Vec<Row>;

/// Element of the stream queue. The consumer sees `Done` exactly once at
/// normal completion, `Error` once on a terminal failure, or `Cancelled`
/// after a stop.
#[derive(Debug, Clone)]
pub enum BatchResult<T> {
    Batch(T),
    Done,
    Cancelled,
    Error(String),
}

impl<T> BatchResult<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BatchResult::Batch(_))
    }

    pub fn into_batch(self) -> Option<T> {
        match self {
            BatchResult::Batch(batch) => Some(batch),
            _ => None,
        }
    }
}
