//! Import progress reporting
//!
//! Workers report processed records in batches; every report is forwarded to
//! the optional progress sink and logged at 10% steps. Pure observability: no
//! import decision depends on these counters.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Callback receiving the running number of processed records
pub type ProgressSink = Arc<dyn Fn(u64) + Send + Sync>;

/// Shared progress counter for one import
pub struct ImportProgress {
    processed: AtomicU64,
    total: u64,
    logged_decile: AtomicU64,
    sink: Option<ProgressSink>,
}

impl ImportProgress {
    /// Create a progress tracker expecting `total` records
    pub fn new(total: u64, sink: Option<ProgressSink>) -> Self {
        Self {
            processed: AtomicU64::new(0),
            total,
            logged_decile: AtomicU64::new(0),
            sink,
        }
    }

    /// Number of records reported so far
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Number of records expected
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Report `count` more processed records
    pub fn records_imported(&self, count: u64) {
        if count == 0 {
            return;
        }
        let processed = self.processed.fetch_add(count, Ordering::Relaxed) + count;
        if let Some(sink) = &self.sink {
            sink(processed);
        }

        if self.total > 0 {
            let decile = (processed.min(self.total) * 10 / self.total).min(10);
            let previous = self.logged_decile.fetch_max(decile, Ordering::Relaxed);
            if decile > previous {
                tracing::info!(
                    "Imported {}/{} nodes ({}%)",
                    processed,
                    self.total,
                    decile * 10
                );
            }
        }
    }
}

impl fmt::Debug for ImportProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportProgress")
            .field("processed", &self.processed())
            .field("total", &self.total)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}
