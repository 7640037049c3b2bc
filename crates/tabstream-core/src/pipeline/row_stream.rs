use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, warn};

use crate::columnar::build_row_batch;
use crate::csv::{CsvOptions, SliceParser};
use crate::io::reader::clamp_buffer_size;
use crate::io::{FileReader, ReaderOptions};
use crate::queue::BoundedQueue;
use crate::types::{BatchResult, RowBatch};

use super::metrics::{profile_enabled, record_elapsed_ns, MetricsSnapshot, PipelineMetrics};

/// Row-oriented CSV stream: a worker thread parses the file into batches of
/// string rows and pushes them through a bounded queue.
pub struct RowStream {
    queue: Arc<BoundedQueue<BatchResult<RowBatch>>>,
    stop: Arc<AtomicBool>,
    metrics: Arc<PipelineMetrics>,
    worker: Option<JoinHandle<()>>,
}

impl RowStream {
    /// Starts the worker immediately. Open failures surface as the first
    /// queue element, not as a constructor error.
    pub fn open(path: impl Into<PathBuf>, options: CsvOptions) -> Self {
        let options = options.normalized();
        let path = path.into();
        let queue = Arc::new(BoundedQueue::new(options.max_queue_batches));
        let stop = Arc::new(AtomicBool::new(false));
        let metrics = Arc::new(PipelineMetrics::default());

        let worker = {
            let queue = Arc::clone(&queue);
            let stop = Arc::clone(&stop);
            let metrics = Arc::clone(&metrics);
            thread::Builder::new()
                .name("tabstream-row".into())
                .spawn(move || {
                    let outcome = catch_unwind(AssertUnwindSafe(|| {
                        run_row_worker(&path, &options, &queue, &stop, &metrics);
                    }));
                    if outcome.is_err() {
                        warn!("row stream worker panicked");
                        queue.push(BatchResult::Error("row stream worker panicked".to_owned()));
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
    pub fn next_batch(&self) -> BatchResult<RowBatch> {
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

impl Drop for RowStream {
    fn drop(&mut self) {
        self.stop();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_row_worker(
    path: &Path,
    options: &CsvOptions,
    queue: &BoundedQueue<BatchResult<RowBatch>>,
    stop: &AtomicBool,
    metrics: &Arc<PipelineMetrics>,
) {
    let reader_options = ReaderOptions {
        use_mmap: options.use_mmap,
        buffer_size: options.read_buffer_size,
    };
    let mut reader = match FileReader::open(path, reader_options) {
        Ok(reader) => reader,
        Err(err) => {
            queue.push(BatchResult::Error(err.to_string()));
            return;
        }
    };

    let mut parser = SliceParser::new(options);
    if profile_enabled() {
        parser.set_metrics(Arc::clone(metrics));
    }
    if options.has_header {
        parser.skip_one_row();
    }

    let window = clamp_buffer_size(options.read_buffer_size);
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

        // Feed bounded windows so the retained remainder stays small even
        // when the reader hands out the whole file at once (mmap).
        let mut cursor = 0;
        loop {
            let end = (cursor + window).min(chunk_len);
            let parse_started = Instant::now();
            parser.feed(&remainder, &chunk[cursor..end]);
            cursor = end;
            remainder = parser.take_remainder();
            record_elapsed_ns(&metrics.parse_ns, parse_started);
            if !drain_batches(&mut parser, queue, metrics) {
                return;
            }
            if cursor >= chunk_len {
                break;
            }
        }
        metrics.bytes_read.fetch_add(chunk_len as u64, Ordering::Relaxed);
    }

    if stop.load(Ordering::Acquire) {
        debug!("row stream worker cancelled");
        return;
    }

    parser.flush();
    if !drain_batches(&mut parser, queue, metrics) {
        return;
    }

    metrics
        .bytes_read
        .store(reader.bytes_read(), Ordering::Relaxed);
    queue.push(BatchResult::Done);
}

/// Builds and pushes every ready batch; false means the push was cancelled
/// and the worker must exit.
fn drain_batches(
    parser: &mut SliceParser,
    queue: &BoundedQueue<BatchResult<RowBatch>>,
    metrics: &PipelineMetrics,
) -> bool {
    while parser.has_batch() {
        let slice_batch = parser.take_batch();
        if profile_enabled() {
            metrics.batch_allocations.fetch_add(1, Ordering::Relaxed);
        }

        let build_started = Instant::now();
        let batch = build_row_batch(&slice_batch);
        if profile_enabled() {
            record_elapsed_ns(&metrics.build_ns, build_started);
        }
        metrics
            .rows_parsed
            .fetch_add(batch.len() as u64, Ordering::Relaxed);

        let push_started = Instant::now();
        if !queue.push(BatchResult::Batch(batch)) {
            return false;
        }
        record_elapsed_ns(&metrics.queue_wait_ns, push_started);
        if profile_enabled() {
            record_elapsed_ns(&metrics.emit_ns, push_started);
        }
        metrics.batches_emitted.fetch_add(1, Ordering::Relaxed);
    }
    true
}
