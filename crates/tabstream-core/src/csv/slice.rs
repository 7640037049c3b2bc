use std::mem;
use std::sync::Arc;

use bytes::Bytes;

use crate::arena::{Arena, DEFAULT_BLOCK_SIZE};
use crate::pipeline::PipelineMetrics;
use crate::scan::{self, CR, LF};
use crate::types::{FieldSlice, SliceBatch, SliceRow};

use super::CsvOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FieldStart,
    InField,
    InQuoted,
    InQuotedAfterQuote,
}

/// Arena-resident prefix of the field currently being assembled.
///
/// A field that spans a feed boundary (or contains escape sequences) cannot
/// be emitted as one contiguous copy of the input, so its bytes accumulate in
/// the arena and the slice is finished when the field terminates.
#[derive(Debug, Clone, Copy)]
enum Partial {
    None,
    Buffered(FieldSlice),
    /// The in-progress field belongs to an unselected column; nothing is
    /// copied and no slice will be emitted.
    Skipped,
}

/// Two adjacent byte segments addressed as one position space.
///
/// Lets a field or quoted string span the remainder/chunk boundary without
/// splicing the buffers together.
struct SegPair<'a> {
    first: &'a [u8],
    second: &'a [u8],
}

impl SegPair<'_> {
    #[inline]
    fn len(&self) -> usize {
        self.first.len() + self.second.len()
    }

    #[inline]
    fn at(&self, pos: usize) -> u8 {
        if pos < self.first.len() {
            self.first[pos]
        } else {
            self.second[pos - self.first.len()]
        }
    }

    /// Runs `find` from `pos`, continuing into the second segment, and
    /// returns a global position.
    #[inline]
    fn find_from(&self, pos: usize, find: impl Fn(&[u8]) -> Option<usize>) -> Option<usize> {
        if pos < self.first.len() {
            if let Some(i) = find(&self.first[pos..]) {
                return Some(pos + i);
            }
            find(self.second).map(|i| self.first.len() + i)
        } else {
            find(&self.second[pos - self.first.len()..]).map(|i| pos + i)
        }
    }

    /// Copies the global range `[from, to)` into the arena, possibly as two
    /// writes, and returns the logical offset of the first byte.
    fn write_range(&self, arena: &mut Arena, from: usize, to: usize) -> usize {
        debug_assert!(from <= to && to <= self.len());
        let split = self.first.len();
        if to <= split {
            arena.write(&self.first[from..to])
        } else if from >= split {
            arena.write(&self.second[from - split..to - split])
        } else {
            let offset = arena.write(&self.first[from..]);
            arena.write(&self.second[..to - split]);
            offset
        }
    }

    fn extend_tail(&self, pos: usize, out: &mut Vec<u8>) {
        let split = self.first.len();
        if pos < split {
            out.extend_from_slice(&self.first[pos..]);
            out.extend_from_slice(self.second);
        } else {
            out.extend_from_slice(&self.second[pos - split..]);
        }
    }
}

/// CSV state machine over raw byte segments, emitting `(offset, len)` field
/// slices into a per-batch arena.
///
/// `feed` consumes up to two consecutive segments per call and retains no
/// pointers past the call: bytes the parser must remember (an in-progress
/// field, the unconsumed tail after a batch boundary) are copied into the
/// arena or the remainder buffer before returning. Scanning inside fields
/// jumps between structural bytes via [`crate::scan`]; the transition table
/// stays authoritative at every found byte.
pub struct SliceParser {
    delimiter: u8,
    quote: u8,
    batch_size: usize,
    state: State,
    partial: Partial,
    /// A CR was the final byte of the previous feed; an LF opening the next
    /// feed belongs to the same line terminator.
    pending_skip_lf: bool,
    remainder: Vec<u8>,
    arena: Arena,
    current_row: SliceRow,
    current_batch: Vec<SliceRow>,
    batch_ready: bool,
    skip_next_row: bool,
    selected: Vec<usize>,
    logical_col: usize,
}

impl SliceParser {
    pub fn new(options: &CsvOptions) -> Self {
        let options = options.normalized();
        Self {
            delimiter: options.delimiter,
            quote: options.quote,
            batch_size: options.batch_size,
            state: State::FieldStart,
            partial: Partial::None,
            pending_skip_lf: false,
            remainder: Vec::new(),
            arena: Arena::new(DEFAULT_BLOCK_SIZE),
            current_row: SliceRow::new(),
            current_batch: Vec::new(),
            batch_ready: false,
            skip_next_row: false,
            selected: Vec::new(),
            logical_col: 0,
        }
    }

    /// Forwards arena debug counters to a metrics handle.
    pub fn set_metrics(&mut self, metrics: Arc<PipelineMetrics>) {
        self.arena.set_metrics(metrics);
    }

    /// Restricts emission to these 0-based logical column indices. Unselected
    /// columns are still counted but copy no bytes and emit no slices.
    pub fn set_selected_columns(&mut self, mut indices: Vec<usize>) {
        indices.sort_unstable();
        indices.dedup();
        self.selected = indices;
    }

    /// Discards the next emitted row (header skip).
    pub fn skip_one_row(&mut self) {
        self.skip_next_row = true;
    }

    /// True once a full batch is buffered; call [`take_batch`].
    ///
    /// [`take_batch`]: SliceParser::take_batch
    pub fn has_batch(&self) -> bool {
        self.batch_ready
    }

    /// Rows buffered in the current incomplete batch.
    pub fn buffered_rows(&self) -> usize {
        self.current_batch.len()
    }

    /// Unconsumed tail after the last feed; pass it back as the first segment
    /// of the next feed.
    pub fn remainder(&self) -> &[u8] {
        &self.remainder
    }

    pub fn take_remainder(&mut self) -> Vec<u8> {
        mem::take(&mut self.remainder)
    }

    /// Feeds two consecutive segments (either may be empty). If a batch fills
    /// mid-feed, parsing stops at that row boundary and the unconsumed tail
    /// becomes the remainder.
    pub fn feed(&mut self, seg1: &[u8], seg2: &[u8]) {
        self.remainder.clear();
        let feed = SegPair {
            first: seg1,
            second: seg2,
        };
        self.process(&feed);
    }

    /// Call once no more data will be fed. Emits an unterminated final row;
    /// a row cut off inside a quoted field is dropped.
    pub fn flush(&mut self) {
        self.pending_skip_lf = false;
        match self.state {
            State::InQuoted | State::InQuotedAfterQuote => return,
            State::InField => {
                self.close_pending_field();
                self.state = State::FieldStart;
            }
            State::FieldStart => {}
        }
        if !self.current_row.is_empty() {
            self.emit_row();
        }
        if !self.current_batch.is_empty() {
            self.batch_ready = true;
        }
    }

    /// Moves the completed batch out: the arena is linearised into an owned
    /// buffer, the parser's arena resets, and a fresh batch begins.
    pub fn take_batch(&mut self) -> SliceBatch {
        self.batch_ready = false;
        let mut buf = Vec::new();
        self.arena.copy_used_to(&mut buf);
        let rows = mem::take(&mut self.current_batch);
        self.arena.reset();
        SliceBatch {
            arena: Bytes::from(buf),
            rows,
        }
    }

    fn process(&mut self, feed: &SegPair<'_>) {
        let total = feed.len();
        let mut pos = 0;

        if self.pending_skip_lf {
            self.pending_skip_lf = false;
            if total > 0 && feed.at(0) == LF {
                pos = 1;
            }
        }

        // Content start of the in-progress field. Content from previous feeds
        // is already in the arena (`self.partial`), so both markers begin at
        // the current position.
        let mut field_start = pos;
        // Closing-candidate quote position while in `InQuotedAfterQuote`.
        let mut quote_pos = pos;

        while pos < total {
            match self.state {
                State::FieldStart => {
                    let c = feed.at(pos);
                    if c == self.quote {
                        self.state = State::InQuoted;
                        pos += 1;
                        field_start = pos;
                    } else if c == self.delimiter {
                        self.close_field(feed, pos, pos);
                        pos += 1;
                    } else if scan::is_newline(c) {
                        self.close_field(feed, pos, pos);
                        pos = self.consume_newline(feed, pos, total);
                        self.emit_row();
                        if self.batch_ready {
                            feed.extend_tail(pos, &mut self.remainder);
                            return;
                        }
                    } else {
                        self.state = State::InField;
                        field_start = pos;
                        pos += 1;
                    }
                }
                State::InField => {
                    match feed.find_from(pos, |h| scan::find_separator(h, self.delimiter)) {
                        Some(hit) => {
                            let c = feed.at(hit);
                            self.close_field(feed, field_start, hit);
                            self.state = State::FieldStart;
                            if c == self.delimiter {
                                pos = hit + 1;
                            } else {
                                pos = self.consume_newline(feed, hit, total);
                                self.emit_row();
                                if self.batch_ready {
                                    feed.extend_tail(pos, &mut self.remainder);
                                    return;
                                }
                            }
                        }
                        None => pos = total,
                    }
                }
                State::InQuoted => match feed.find_from(pos, |h| scan::find_byte(h, self.quote)) {
                    Some(hit) => {
                        quote_pos = hit;
                        self.state = State::InQuotedAfterQuote;
                        pos = hit + 1;
                    }
                    None => pos = total,
                },
                State::InQuotedAfterQuote => {
                    let c = feed.at(pos);
                    if c == self.quote {
                        // Doubled quote: one literal quote, field continues.
                        self.append_run(feed, field_start, quote_pos);
                        self.append_quote_byte();
                        self.state = State::InQuoted;
                        pos += 1;
                        field_start = pos;
                    } else if c == self.delimiter {
                        self.close_field(feed, field_start, quote_pos);
                        self.state = State::FieldStart;
                        pos += 1;
                    } else if scan::is_newline(c) {
                        self.close_field(feed, field_start, quote_pos);
                        self.state = State::FieldStart;
                        pos = self.consume_newline(feed, pos, total);
                        self.emit_row();
                        if self.batch_ready {
                            feed.extend_tail(pos, &mut self.remainder);
                            return;
                        }
                    } else {
                        // Stray byte after a closing quote: the quoted span
                        // commits and the field continues as raw content.
                        self.append_run(feed, field_start, quote_pos);
                        self.state = State::InField;
                        field_start = pos;
                        pos += 1;
                    }
                }
            }
        }

        // Input exhausted mid-field: stash the open span in the arena so the
        // caller may drop both segments.
        match self.state {
            State::FieldStart => {}
            State::InField | State::InQuoted => self.append_run(feed, field_start, total),
            State::InQuotedAfterQuote => self.append_run(feed, field_start, quote_pos),
        }
    }

    /// Advances past the newline at `nl_pos`, folding an immediately
    /// following LF into a CR.
    fn consume_newline(&mut self, feed: &SegPair<'_>, nl_pos: usize, total: usize) -> usize {
        let mut pos = nl_pos + 1;
        if feed.at(nl_pos) == CR {
            if pos < total {
                if feed.at(pos) == LF {
                    pos += 1;
                }
            } else {
                self.pending_skip_lf = true;
            }
        }
        pos
    }

    fn column_selected(&self, col: usize) -> bool {
        self.selected.is_empty() || self.selected.binary_search(&col).is_ok()
    }

    /// Terminates the current field with the final content run `[from, to)`.
    fn close_field(&mut self, feed: &SegPair<'_>, from: usize, to: usize) {
        let selected = self.column_selected(self.logical_col);
        self.logical_col += 1;
        match mem::replace(&mut self.partial, Partial::None) {
            Partial::None => {
                if !selected {
                    return;
                }
                let len = to - from;
                let offset = if len > 0 {
                    feed.write_range(&mut self.arena, from, to)
                } else {
                    self.arena.used()
                };
                self.current_row.push(FieldSlice::new(offset, len));
            }
            Partial::Buffered(mut slice) => {
                if to > from {
                    feed.write_range(&mut self.arena, from, to);
                    slice.len += to - from;
                }
                self.current_row.push(slice);
            }
            Partial::Skipped => {}
        }
    }

    /// Terminates a field whose content is entirely arena-resident (flush).
    fn close_pending_field(&mut self) {
        let selected = self.column_selected(self.logical_col);
        self.logical_col += 1;
        match mem::replace(&mut self.partial, Partial::None) {
            Partial::None => {
                if selected {
                    self.current_row
                        .push(FieldSlice::new(self.arena.used(), 0));
                }
            }
            Partial::Buffered(slice) => self.current_row.push(slice),
            Partial::Skipped => {}
        }
    }

    /// Appends the content run `[from, to)` to the in-progress field,
    /// starting its arena buffer if this is the first run.
    fn append_run(&mut self, feed: &SegPair<'_>, from: usize, to: usize) {
        match &mut self.partial {
            Partial::Buffered(slice) => {
                if to > from {
                    feed.write_range(&mut self.arena, from, to);
                    slice.len += to - from;
                }
            }
            Partial::Skipped => {}
            Partial::None => {
                if !self.column_selected(self.logical_col) {
                    self.partial = Partial::Skipped;
                    return;
                }
                let offset = self.arena.used();
                if to > from {
                    feed.write_range(&mut self.arena, from, to);
                }
                self.partial = Partial::Buffered(FieldSlice::new(offset, to - from));
            }
        }
    }

    fn append_quote_byte(&mut self) {
        let quote = self.quote;
        match &mut self.partial {
            Partial::Buffered(slice) => {
                self.arena.write(&[quote]);
                slice.len += 1;
            }
            Partial::Skipped => {}
            Partial::None => {
                if !self.column_selected(self.logical_col) {
                    self.partial = Partial::Skipped;
                    return;
                }
                let offset = self.arena.write(&[quote]);
                self.partial = Partial::Buffered(FieldSlice::new(offset, 1));
            }
        }
    }

    fn emit_row(&mut self) {
        self.logical_col = 0;
        if self.skip_next_row {
            self.skip_next_row = false;
            self.current_row.clear();
            return;
        }
        self.current_batch.push(mem::take(&mut self.current_row));
        if self.current_batch.len() >= self.batch_size {
            self.batch_ready = true;
        }
    }
}
