use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, warn};

use crate::columnar::{
    build_columnar_batch, slice_row_to_strings, ColumnLayout, ColumnarBatch, ColumnarOptions,
};
use crate::csv::SliceParser;
use crate::io::reader::clamp_buffer_size;
use crate::io::{FileReader, ReaderOptions};
use crate::queue::BoundedQueue;
use crate::types::{BatchResult, RowBatch, SliceBatch};

use super::metrics::{profile_enabled, record_elapsed_ns, MetricsSnapshot, PipelineMetrics};

/// Columnar CSV stream: the worker resolves headers from the first row,
/// pushes column selection down into the slice parser, and emits typed
/// columns with null masks.
pub struct ColumnarStream {
    queue: Arc<BoundedQueue<BatchResult<ColumnarBatch>>>,
    stop: Arc<AtomicBool>,
    metrics: Arc<PipelineMetrics>,
    worker: Option<JoinHandle<()>>,
}

impl ColumnarStream {
    /// Starts the worker immediately. Open failures surface as the first
    /// queue element, not as a constructor error.
    pub fn open(path: impl Into<PathBuf>, options: ColumnarOptions) -> Self {
        let mut options = options;
        options.csv = options.csv.normalized();
        let path = path.into();
        let queue = Arc::new(BoundedQueue::new(options.csv.max_queue_batches));
        let stop = Arc::new(AtomicBool::new(false));
        let metrics = Arc::new(PipelineMetrics::default());

        let worker = {
            let queue = Arc::clone(&queue);
            let stop = Arc::clone(&stop);
            let metrics = Arc::clone(&metrics);
            thread::Builder::new()
                .name("tabstream-columnar".into())
                .spawn(move || {
                    let outcome = catch_unwind(AssertUnwindSafe(|| {
                        run_columnar_worker(&path, &options, &queue, &stop, &metrics);
                    }));
                    if outcome.is_err() {
                        warn!("columnar stream worker panicked");
                        queue.push(BatchResult::Error(
                            "columnar stream worker panicked".to_owned(),
                        ));
                    }
                })
                .expect("failed to spawn stream worker")
        };

        Self {
            queue,
            stop,
            metrics,
            worker: Some(worker),
        }
    }

    /// Blocks for the next queue element.
    pub fn next_batch(&self) -> BatchResult<ColumnarBatch> {
        self.queue.pop().unwrap_or(BatchResult::Cancelled)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Requests cancellation: poisons the queue; the worker exits at its next
    /// loop boundary or blocked push. Already-popped batches stay valid.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.queue.cancel();
    }
}

impl Drop for ColumnarStream {
    fn drop(&mut self) {
        self.stop();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Header resolution outcome: layouts for both row shapes the builder will
/// see (full rows for the batch the headers came from, selected-only rows
/// once push-down is active).
struct HeaderPlan {
    full: ColumnLayout,
    pushed: ColumnLayout,
}

fn resolve_plan(
    headers: Vec<String>,
    options: &ColumnarOptions,
    parser: &mut SliceParser,
    allow_push_down: bool,
) -> HeaderPlan {
    let full = ColumnLayout::select(&headers, &options.select);
    let push_down = allow_push_down && !options.select.is_empty() && !full.source.is_empty();
    let pushed = if push_down {
        parser.set_selected_columns(full.selected_indices());
        full.pushed_down()
    } else {
        full.clone()
    };
    HeaderPlan { full, pushed }
}

struct ColumnarWorker<'a> {
    options: &'a ColumnarOptions,
    queue: &'a BoundedQueue<BatchResult<ColumnarBatch>>,
    metrics: &'a PipelineMetrics,
    plan: Option<HeaderPlan>,
    batches_seen: usize,
}

impl ColumnarWorker<'_> {
    /// Converts one slice batch and pushes it; false means the worker must
    /// exit (cancelled push).
    fn handle_batch(&mut self, parser: &mut SliceParser, mut slice_batch: SliceBatch) -> bool {
        if profile_enabled() {
            self.metrics.batch_allocations.fetch_add(1, Ordering::Relaxed);
        }

        if self.plan.is_none() {
            if slice_batch.rows.is_empty() {
                return true;
            }
            let headers = slice_row_to_strings(&slice_batch.rows[0], &slice_batch.arena);
            let plan = resolve_plan(headers, self.options, parser, true);
            let header_only = slice_batch.rows.len() == 1;
            slice_batch.rows.remove(0);
            self.plan = Some(plan);
            if header_only {
                // Emit one empty batch so the consumer learns the headers.
                let plan = self.plan.as_ref().expect("plan just resolved");
                let empty = build_columnar_batch(&[], &plan.full, self.options);
                self.batches_seen += 1;
                return self.push_batch(empty);
            }
        }

        let plan = self.plan.as_ref().expect("plan resolved above");
        // The batch the headers came from was parsed before push-down took
        // effect, so it still carries every column.
        let layout = if self.batches_seen == 0 {
            &plan.full
        } else {
            &plan.pushed
        };

        let build_started = Instant::now();
        let rows: RowBatch = slice_batch
            .rows
            .iter()
            .map(|row| slice_row_to_strings(row, &slice_batch.arena))
            .collect();
        let batch = build_columnar_batch(&rows, layout, self.options);
        if profile_enabled() {
            record_elapsed_ns(&self.metrics.build_ns, build_started);
        }

        self.batches_seen += 1;
        self.push_batch(batch)
    }

    fn push_batch(&mut self, batch: ColumnarBatch) -> bool {
        self.metrics
            .rows_parsed
            .fetch_add(batch.rows as u64, Ordering::Relaxed);
        let push_started = Instant::now();
        if !self.queue.push(BatchResult::Batch(batch)) {
            return false;
        }
        record_elapsed_ns(&self.metrics.queue_wait_ns, push_started);
        if profile_enabled() {
            record_elapsed_ns(&self.metrics.emit_ns, push_started);
        }
        self.metrics.batches_emitted.fetch_add(1, Ordering::Relaxed);
        true
    }
}

fn run_columnar_worker(
    path: &Path,
    options: &ColumnarOptions,
    queue: &BoundedQueue<BatchResult<ColumnarBatch>>,
    stop: &AtomicBool,
    metrics: &Arc<PipelineMetrics>,
) {
    let csv = options.csv.normalized();
    let reader_options = ReaderOptions {
        use_mmap: csv.use_mmap,
        buffer_size: csv.read_buffer_size,
    };
    let mut reader = match FileReader::open(path, reader_options) {
        Ok(reader) => reader,
        Err(err) => {
            queue.push(BatchResult::Error(err.to_string()));
            return;
        }
    };

    // The header row is consumed from the first batch, not skipped in the
    // parser, so headers and selection can be resolved from its bytes.
    let mut parser = SliceParser::new(&csv);
    if profile_enabled() {
        parser.set_metrics(Arc::clone(metrics));
    }

    let mut worker = ColumnarWorker {
        options,
        queue,
        metrics: metrics.as_ref(),
        plan: None,
        batches_seen: 0,
    };

    // Without a header row the headers come from the schema (sorted for
    // determinism); selection is not pushed down on this path and rows keep
    // the schema-key positions.
    if !csv.has_header && !options.schema.is_empty() {
        let mut headers: Vec<String> = options.schema.keys().cloned().collect();
        headers.sort();
        worker.plan = Some(resolve_plan(headers, options, &mut parser, false));
    }

    let window = clamp_buffer_size(csv.read_buffer_size);
    let mut remainder: Vec<u8> = Vec::new();

    while !stop.load(Ordering::Acquire) {
        let read_started = Instant::now();
        let chunk = match reader.get_next() {
            Ok(chunk) => chunk,
            Err(err) => {
                queue.push(BatchResult::Error(err.to_string()));
                return;
            }
        };
        if profile_enabled() {
            record_elapsed_ns(&metrics.read_ns, read_started);
        }
        if chunk.is_empty() && remainder.is_empty() {
            break;
        }
        let chunk_len = chunk.len();

        let mut cursor = 0;
        loop {
            let end = (cursor + window).min(chunk_len);
            let parse_started = Instant::now();
            parser.feed(&remainder, &chunk[cursor..end]);
            cursor = end;
            remainder = parser.take_remainder();
            record_elapsed_ns(&metrics.parse_ns, parse_started);
            while parser.has_batch() {
                let slice_batch = parser.take_batch();
                if !worker.handle_batch(&mut parser, slice_batch) {
                    return;
                }
            }
            if cursor >= chunk_len {
                break;
            }
        }
        metrics.bytes_read.fetch_add(chunk_len as u64, Ordering::Relaxed);
    }

    if stop.load(Ordering::Acquire) {
        debug!("columnar stream worker cancelled");
        return;
    }

    parser.flush();
    while parser.has_batch() {
        let slice_batch = parser.take_batch();
        if !worker.handle_batch(&mut parser, slice_batch) {
            return;
        }
    }

    metrics
        .bytes_read
        .store(reader.bytes_read(), Ordering::Relaxed);

    if worker.plan.is_none() && csv.has_header {
        queue.push(BatchResult::Error("could not parse header row".to_owned()));
    } else {
        queue.push(BatchResult::Done);
    }
}
