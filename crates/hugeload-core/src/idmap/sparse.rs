//! Sparse original → dense id mapping
//!
//! Original ids may be sparse and huge, so the mapping is a lazily paged
//! array indexed by original id. A page is only instantiated when some id in
//! its range gets mapped, which bounds memory by the number of populated
//! pages instead of the highest original id.

use crate::Result;
use crate::memory::AllocationTracker;
use crate::paged::{HugeArray, HugeArrayBuilder};
use std::sync::Arc;

/// Cell value of an original id without a dense mapping
pub const NOT_FOUND: u64 = u64::MAX;

/// Writable sparse mapping, shared by all scanner workers
#[derive(Debug)]
pub struct SparseNodeMappingBuilder {
    array: HugeArrayBuilder<u64>,
}

impl SparseNodeMappingBuilder {
    /// Create a mapping able to hold original ids in `[0, capacity)`.
    ///
    /// Allocates the page directory, one slot per `PAGE_SIZE` original ids.
    pub fn new(capacity: u64, tracker: Arc<AllocationTracker>) -> Result<Self> {
        Ok(Self {
            array: HugeArrayBuilder::lazy(capacity, NOT_FOUND, tracker)?,
        })
    }

    /// Exclusive upper bound on mappable original ids
    pub fn capacity(&self) -> u64 {
        self.array.capacity()
    }

    /// Instantiate the page covering page index `page`
    pub fn allocate_page(&self, page: usize) -> Result<()> {
        self.array.allocate_page(page).map(|_| ())
    }

    /// Map `original_id` to `dense_id` unless it is already mapped.
    ///
    /// Returns the existing dense id when the key was taken, also when
    /// another worker mapped it concurrently.
    #[inline]
    pub fn set_if_absent(&self, original_id: u64, dense_id: u64) -> Result<Option<u64>> {
        self.array.compare_and_set(original_id, NOT_FOUND, dense_id)
    }

    /// Current mapping of `original_id`, if any
    #[inline]
    pub fn get(&self, original_id: u64) -> Option<u64> {
        if original_id >= self.array.capacity() {
            return None;
        }
        match self.array.get(original_id) {
            NOT_FOUND => None,
            dense => Some(dense),
        }
    }

    /// Number of instantiated pages
    pub fn allocated_pages(&self) -> usize {
        self.array.allocated_pages()
    }

    /// Freeze into the read-only mapping
    pub fn build(self) -> SparseNodeMapping {
        SparseNodeMapping {
            array: self.array.build(),
        }
    }
}

/// Read-only original → dense mapping
#[derive(Debug)]
pub struct SparseNodeMapping {
    array: HugeArray<u64>,
}

impl SparseNodeMapping {
    /// Dense id of `original_id`, or `None` when it was never mapped
    #[inline]
    pub fn get(&self, original_id: u64) -> Option<u64> {
        if original_id >= self.array.size() {
            return None;
        }
        match self.array.get(original_id) {
            NOT_FOUND => None,
            dense => Some(dense),
        }
    }

    /// Whether `original_id` has a dense mapping
    pub fn contains(&self, original_id: u64) -> bool {
        self.get(original_id).is_some()
    }

    /// Exclusive upper bound on mappable original ids
    pub fn capacity(&self) -> u64 {
        self.array.size()
    }

    /// Number of instantiated pages
    pub fn allocated_pages(&self) -> usize {
        self.array.allocated_pages()
    }

    /// Bytes held by instantiated pages
    pub fn memory_bytes(&self) -> u64 {
        self.array.memory_bytes()
    }
}
