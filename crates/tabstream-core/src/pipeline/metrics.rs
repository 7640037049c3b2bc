use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Returns true when `TABSTREAM_PROFILE` enables per-stage timing capture.
/// Cached after the first read.
pub fn profile_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| {
        std::env::var("TABSTREAM_PROFILE")
            .map(|v| matches!(v.as_bytes().first(), Some(b'1' | b't' | b'T')))
            .unwrap_or(false)
    })
}

/// Per-stream pipeline counters.
///
/// Every field is an additive atomic written only by the worker thread; the
/// consumer reads lazily through [`snapshot`]. No snapshot barrier exists, so
/// cross-counter values observed mid-stream may be mutually inconsistent —
/// that is intentional. The `*_ns` stage timings and `batch_allocations` are
/// populated only when [`profile_enabled`] is set; the arena counters are fed
/// by the parser's arena through a shared handle.
///
/// [`snapshot`]: PipelineMetrics::snapshot
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    pub bytes_read: AtomicU64,
    pub rows_parsed: AtomicU64,
    pub batches_emitted: AtomicU64,
    pub queue_wait_ns: AtomicU64,
    pub parse_ns: AtomicU64,
    pub read_ns: AtomicU64,
    pub build_ns: AtomicU64,
    pub emit_ns: AtomicU64,
    pub batch_allocations: AtomicU64,
    pub arena_bytes_allocated: AtomicU64,
    pub arena_blocks: AtomicU64,
    pub arena_resets: AtomicU64,
    pub arena_peak_usage: AtomicU64,
}

impl PipelineMetrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            rows_parsed: self.rows_parsed.load(Ordering::Relaxed),
            batches_emitted: self.batches_emitted.load(Ordering::Relaxed),
            queue_wait_ns: self.queue_wait_ns.load(Ordering::Relaxed),
            parse_ns: self.parse_ns.load(Ordering::Relaxed),
            read_ns: self.read_ns.load(Ordering::Relaxed),
            build_ns: self.build_ns.load(Ordering::Relaxed),
            emit_ns: self.emit_ns.load(Ordering::Relaxed),
            batch_allocations: self.batch_allocations.load(Ordering::Relaxed),
            arena_bytes_allocated: self.arena_bytes_allocated.load(Ordering::Relaxed),
            arena_blocks: self.arena_blocks.load(Ordering::Relaxed),
            arena_resets: self.arena_resets.load(Ordering::Relaxed),
            arena_peak_usage: self.arena_peak_usage.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.bytes_read.store(0, Ordering::Relaxed);
        self.rows_parsed.store(0, Ordering::Relaxed);
        self.batches_emitted.store(0, Ordering::Relaxed);
        self.queue_wait_ns.store(0, Ordering::Relaxed);
        self.parse_ns.store(0, Ordering::Relaxed);
        self.read_ns.store(0, Ordering::Relaxed);
        self.build_ns.store(0, Ordering::Relaxed);
        self.emit_ns.store(0, Ordering::Relaxed);
        self.batch_allocations.store(0, Ordering::Relaxed);
        self.arena_bytes_allocated.store(0, Ordering::Relaxed);
        self.arena_blocks.store(0, Ordering::Relaxed);
        self.arena_resets.store(0, Ordering::Relaxed);
        self.arena_peak_usage.store(0, Ordering::Relaxed);
    }
}

/// Adds the elapsed nanoseconds since `started_at` to `counter`.
pub(crate) fn record_elapsed_ns(counter: &AtomicU64, started_at: Instant) {
    let elapsed = started_at.elapsed().as_nanos().min(u64::MAX as u128) as u64;
    counter.fetch_add(elapsed, Ordering::Relaxed);
}

/// Point-in-time copy of [`PipelineMetrics`], relaxed-loaded field by field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub bytes_read: u64,
    pub rows_parsed: u64,
    pub batches_emitted: u64,
    pub queue_wait_ns: u64,
    pub parse_ns: u64,
    pub read_ns: u64,
    pub build_ns: u64,
    pub emit_ns: u64,
    pub batch_allocations: u64,
    pub arena_bytes_allocated: u64,
    pub arena_blocks: u64,
    pub arena_resets: u64,
    pub arena_peak_usage: u64,
}
