use std::mem;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, warn};

use crate::csv::MAX_BATCH_SIZE;
use crate::queue::BoundedQueue;
use crate::types::{BatchResult, RowBatch};
use crate::xlsx::workbook::{resolve_sheet, stream_sheet_rows};
use crate::xlsx::{build_xlsx_batch, XlsxBatch, XlsxOptions, ZipArchive};

use super::metrics::{profile_enabled, record_elapsed_ns, MetricsSnapshot, PipelineMetrics};

const XLSX_QUEUE_BATCHES: usize = 2;

/// XLSX stream: the worker resolves the workbook, loads shared strings,
/// walks the sheet XML row by row, and pushes batches through the same
/// bounded-queue design as the CSV streams.
pub struct XlsxStream {
    queue: Arc<BoundedQueue<BatchResult<XlsxBatch>>>,
    stop: Arc<AtomicBool>,
    metrics: Arc<PipelineMetrics>,
    worker: Option<JoinHandle<()>>,
}

impl XlsxStream {
    /// Starts the worker immediately. Open and workbook-structure failures
    /// surface as the first queue element.
    pub fn open(path: impl Into<PathBuf>, options: XlsxOptions) -> Self {
        let path = path.into();
        let queue = Arc::new(BoundedQueue::new(XLSX_QUEUE_BATCHES));
        let stop = Arc::new(AtomicBool::new(false));
        let metrics = Arc::new(PipelineMetrics::default());

        let worker = {
            let queue = Arc::clone(&queue);
            let stop = Arc::clone(&stop);
            let metrics = Arc::clone(&metrics);
            thread::Builder::new()
                .name("tabstream-xlsx".into())
                .spawn(move || {
                    let outcome = catch_unwind(AssertUnwindSafe(|| {
                        run_xlsx_worker(&path, &options, &queue, &stop, &metrics);
                    }));
                    if outcome.is_err() {
                        warn!("xlsx stream worker panicked");
                        queue.push(BatchResult::Error("xlsx stream worker panicked".to_owned()));
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
    pub fn next_batch(&self) -> BatchResult<XlsxBatch> {
        self.queue.pop().unwrap_or(BatchResult::Cancelled)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Requests cancellation: poisons the queue; the worker exits at the next
    /// row boundary or blocked push.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.queue.cancel();
    }
}

impl Drop for XlsxStream {
    fn drop(&mut self) {
        self.stop();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_xlsx_worker(
    path: &Path,
    options: &XlsxOptions,
    queue: &BoundedQueue<BatchResult<XlsxBatch>>,
    stop: &AtomicBool,
    metrics: &PipelineMetrics,
) {
    let mut zip = match ZipArchive::open(path) {
        Ok(zip) => zip,
        Err(err) => {
            let err = err.with_context(format!("failed to open xlsx {}", path.display()));
            queue.push(BatchResult::Error(err.to_string()));
            return;
        }
    };

    let location = match resolve_sheet(&mut zip, &options.sheet) {
        Ok(location) => location,
        Err(err) => {
            queue.push(BatchResult::Error(err.to_string()));
            return;
        }
    };

    let sheet_xml = match zip.read_file(&location.sheet_path) {
        Ok(xml) => xml,
        Err(err) => {
            queue.push(BatchResult::Error(err.to_string()));
            return;
        }
    };
    metrics
        .bytes_read
        .store(sheet_xml.len() as u64, Ordering::Relaxed);

    let batch_size = options.batch_size.clamp(1, MAX_BATCH_SIZE);
    let mut headers: Vec<String> = Vec::new();
    let mut headers_set = false;
    let mut rows: RowBatch = Vec::new();
    let mut cancelled = false;

    let parse_started = Instant::now();
    stream_sheet_rows(&sheet_xml, &location.shared_strings, |row| {
        if stop.load(Ordering::Acquire) {
            cancelled = true;
            return false;
        }
        if !headers_set {
            headers_set = true;
            if options.has_header {
                headers = row;
                return true;
            }
            headers = if !options.schema.is_empty() {
                let mut keys: Vec<String> = options.schema.keys().cloned().collect();
                keys.sort();
                keys
            } else {
                (1..=row.len()).map(|i| format!("Column{i}")).collect()
            };
            // The first row is data on this path; fall through.
        }
        rows.push(row);
        if rows.len() >= batch_size {
            if !emit_batch(&headers, mem::take(&mut rows), options, queue, metrics) {
                cancelled = true;
                return false;
            }
        }
        true
    });
    record_elapsed_ns(&metrics.parse_ns, parse_started);

    if cancelled {
        debug!("xlsx stream worker cancelled");
        return;
    }

    if !rows.is_empty() && !emit_batch(&headers, rows, options, queue, metrics) {
        return;
    }

    queue.push(BatchResult::Done);
}

/// Builds and pushes one batch; false means the push was cancelled.
fn emit_batch(
    headers: &[String],
    rows: RowBatch,
    options: &XlsxOptions,
    queue: &BoundedQueue<BatchResult<XlsxBatch>>,
    metrics: &PipelineMetrics,
) -> bool {
    let build_started = Instant::now();
    let batch = build_xlsx_batch(headers, rows, options);
    if profile_enabled() {
        record_elapsed_ns(&metrics.build_ns, build_started);
    }
    metrics
        .rows_parsed
        .fetch_add(batch.row_count() as u64, Ordering::Relaxed);

    let push_started = Instant::now();
    if !queue.push(BatchResult::Batch(batch)) {
        return false;
    }
    record_elapsed_ns(&metrics.queue_wait_ns, push_started);
    metrics.batches_emitted.fetch_add(1, Ordering::Relaxed);
    true
}
