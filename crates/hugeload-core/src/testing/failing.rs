//! Store wrapper with an injected read failure

use crate::store::{KeyId, LabelId, Record, RecordStore};
use crate::{Error, Result};
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};

/// Delegates to an inner store but fails reading one page.
///
/// The first `healthy_reads` reads of the page succeed, which lets the
/// sizing pass through and makes the scan fail.
#[derive(Debug)]
pub struct FailingStore<S> {
    inner: S,
    failing_page: usize,
    healthy_reads: u64,
    reads: AtomicU64,
}

impl<S: RecordStore> FailingStore<S> {
    /// Fail every read of `failing_page`
    pub fn new(inner: S, failing_page: usize) -> Self {
        Self {
            inner,
            failing_page,
            healthy_reads: 0,
            reads: AtomicU64::new(0),
        }
    }

    /// Let the first `reads` reads of the failing page succeed
    pub fn healthy_reads(mut self, reads: u64) -> Self {
        self.healthy_reads = reads;
        self
    }

    /// Number of times the failing page was requested
    pub fn failing_page_reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

impl<S: RecordStore> RecordStore for FailingStore<S> {
    fn page_count(&self) -> usize {
        self.inner.page_count()
    }

    fn read_page(&self, page: usize) -> Result<Cow<'_, [Record]>> {
        if page == self.failing_page {
            let previous = self.reads.fetch_add(1, Ordering::Relaxed);
            if previous >= self.healthy_reads {
                return Err(Error::store(format!(
                    "injected failure reading page {}",
                    page
                )));
            }
        }
        self.inner.read_page(page)
    }

    fn resolve_property_key(&self, name: &str) -> Option<KeyId> {
        self.inner.resolve_property_key(name)
    }

    fn resolve_label(&self, name: &str) -> Option<LabelId> {
        self.inner.resolve_label(name)
    }
}
