use super::{
    BYTES_PER_CELL, HugeValue, PAGE_SIZE, bytes_for, index_in_page, num_pages, page_index,
    page_len,
};
use crate::memory::AllocationTracker;
use crate::{Error, Result};
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

type Page = Box<[AtomicU64]>;
type PageSlot = OnceLock<Page>;

/// Bytes of the page directory of an array with `capacity` elements.
///
/// The directory holds one slot per page whether or not the page is ever
/// instantiated, so it grows with the capacity of lazily paged arrays.
pub fn directory_bytes(capacity: u64) -> u64 {
    (num_pages(capacity) as u64).saturating_mul(size_of::<PageSlot>() as u64)
}

/// Builder-mode paged array, writable through a shared reference.
///
/// Pages are either allocated up front ([`HugeArrayBuilder::new`]) or on the
/// first write into their range ([`HugeArrayBuilder::lazy`]). Every slot that
/// is never written reads back as the fill value.
///
/// Concurrent writers of [`HugeArrayBuilder::set`] must target disjoint
/// indices. [`HugeArrayBuilder::compare_and_set`] arbitrates writers racing
/// for the same slot.
///
/// All bytes charged to the tracker (directory and pages) are given back when
/// the builder is dropped without being frozen.
pub struct HugeArrayBuilder<T: HugeValue> {
    pages: Box<[PageSlot]>,
    capacity: u64,
    fill: u64,
    tracker: Arc<AllocationTracker>,
    _marker: PhantomData<T>,
}

impl<T: HugeValue> HugeArrayBuilder<T> {
    /// Create a builder with every page allocated and pre-filled with `fill`
    pub fn new(capacity: u64, fill: T, tracker: Arc<AllocationTracker>) -> Result<Self> {
        let builder = Self::lazy(capacity, fill, tracker)?;
        for page in 0..builder.pages.len() {
            builder.allocate_page(page)?;
        }
        Ok(builder)
    }

    /// Create a builder whose pages are allocated on first write.
    ///
    /// Only the page directory is allocated here. It is charged to `tracker`
    /// and fails with [`Error::AllocationFailed`] when the allocator refuses it.
    pub fn lazy(capacity: u64, fill: T, tracker: Arc<AllocationTracker>) -> Result<Self> {
        let page_count = num_pages(capacity);
        let bytes = directory_bytes(capacity);
        tracker.try_add(bytes)?;

        let mut pages = Vec::new();
        if pages.try_reserve_exact(page_count).is_err() {
            tracker.remove(bytes);
            return Err(Error::AllocationFailed {
                requested: bytes,
                tracked: tracker.tracked(),
            });
        }
        pages.extend((0..page_count).map(|_| PageSlot::new()));

        Ok(Self {
            pages: pages.into_boxed_slice(),
            capacity,
            fill: fill.to_bits(),
            tracker,
            _marker: PhantomData,
        })
    }

    /// Number of addressable slots
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Number of pages instantiated so far
    pub fn allocated_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.get().is_some()).count()
    }

    /// Instantiate page `page` if absent.
    ///
    /// Idempotent and safe to race: when two threads allocate the same page,
    /// one page wins, the other is dropped and its bytes are given back to the
    /// tracker.
    pub fn allocate_page(&self, page: usize) -> Result<&[AtomicU64]> {
        let slot = self.pages.get(page).ok_or_else(|| {
            Error::internal(format!(
                "page {} out of range for huge array of {} pages",
                page,
                self.pages.len()
            ))
        })?;
        if let Some(existing) = slot.get() {
            return Ok(&existing[..]);
        }

        let len = page_len(self.capacity, page);
        let bytes = len as u64 * BYTES_PER_CELL;
        self.tracker.try_add(bytes)?;
        let fresh = match allocate_cells(len, self.fill, &self.tracker) {
            Ok(fresh) => fresh,
            Err(e) => {
                self.tracker.remove(bytes);
                return Err(e);
            }
        };

        let mut installed = false;
        let cells = slot.get_or_init(|| {
            installed = true;
            fresh
        });
        if !installed {
            self.tracker.remove(bytes);
        }
        Ok(&cells[..])
    }

    /// Cell holding `index`, allocating its page if needed
    #[inline]
    fn cell(&self, index: u64) -> Result<&AtomicU64> {
        if index >= self.capacity {
            return Err(Error::internal(format!(
                "index {} out of bounds for huge array of size {}",
                index, self.capacity
            )));
        }
        let page = match self.pages[page_index(index)].get() {
            Some(page) => &page[..],
            None => self.allocate_page(page_index(index))?,
        };
        Ok(&page[index_in_page(index)])
    }

    /// Write `value` at `index`, allocating its page if needed
    #[inline]
    pub fn set(&self, index: u64, value: T) -> Result<()> {
        self.cell(index)?.store(value.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    /// Write `value` at `index` only if the slot still holds `expected`.
    ///
    /// Returns `None` when the write happened and `Some(current)` with the
    /// value found in the slot when it did not. Exactly one of several
    /// writers racing from the same `expected` value succeeds.
    #[inline]
    pub fn compare_and_set(&self, index: u64, expected: T, value: T) -> Result<Option<T>> {
        match self.cell(index)?.compare_exchange(
            expected.to_bits(),
            value.to_bits(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(None),
            Err(current) => Ok(Some(T::from_bits(current))),
        }
    }

    /// Read the value at `index`; unallocated pages read as the fill value
    ///
    /// # Panics
    ///
    /// Panics if `index >= capacity`.
    #[inline]
    pub fn get(&self, index: u64) -> T {
        assert!(
            index < self.capacity,
            "index {} out of bounds for huge array of size {}",
            index,
            self.capacity
        );
        match self.pages[page_index(index)].get() {
            Some(page) => T::from_bits(page[index_in_page(index)].load(Ordering::Relaxed)),
            None => T::from_bits(self.fill),
        }
    }

    /// Freeze into a read-only array. Pages and directory move over without
    /// copying, and so does their share of the tracked bytes.
    pub fn build(mut self) -> HugeArray<T> {
        HugeArray {
            pages: std::mem::take(&mut self.pages),
            capacity: self.capacity,
            fill: self.fill,
            tracker: self.tracker.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: HugeValue> Drop for HugeArrayBuilder<T> {
    fn drop(&mut self) {
        self.tracker.remove(charged_bytes(&self.pages));
    }
}

impl<T: HugeValue> fmt::Debug for HugeArrayBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HugeArrayBuilder")
            .field("capacity", &self.capacity)
            .field("pages", &self.pages.len())
            .field("allocated_pages", &self.allocated_pages())
            .finish()
    }
}

/// Frozen paged array: read-only, immutable for the rest of its lifetime.
///
/// Its bytes stay charged to the tracker until the array is dropped.
pub struct HugeArray<T: HugeValue> {
    pages: Box<[PageSlot]>,
    capacity: u64,
    fill: u64,
    tracker: Arc<AllocationTracker>,
    _marker: PhantomData<T>,
}

impl<T: HugeValue> HugeArray<T> {
    /// Build a fully allocated array from a plain vector
    pub fn from_vec(values: Vec<T>, fill: T, tracker: Arc<AllocationTracker>) -> Result<Self> {
        let builder = HugeArrayBuilder::new(values.len() as u64, fill, tracker)?;
        for (index, value) in values.into_iter().enumerate() {
            builder.set(index as u64, value)?;
        }
        Ok(builder.build())
    }

    /// Number of addressable slots
    pub fn size(&self) -> u64 {
        self.capacity
    }

    /// Whether the array has no slots
    pub fn is_empty(&self) -> bool {
        self.capacity == 0
    }

    /// Value every unwritten slot reads as
    pub fn fill_value(&self) -> T {
        T::from_bits(self.fill)
    }

    /// Read the value at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index >= size()`.
    #[inline]
    pub fn get(&self, index: u64) -> T {
        assert!(
            index < self.capacity,
            "index {} out of bounds for huge array of size {}",
            index,
            self.capacity
        );
        match self.pages[page_index(index)].get() {
            Some(page) => T::from_bits(page[index_in_page(index)].load(Ordering::Relaxed)),
            None => T::from_bits(self.fill),
        }
    }

    /// Number of instantiated pages
    pub fn allocated_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.get().is_some()).count()
    }

    /// Bytes held by the page directory and the instantiated pages
    pub fn memory_bytes(&self) -> u64 {
        charged_bytes(&self.pages)
    }

    /// Bytes a fully allocated array of this size would hold
    pub fn dense_memory_bytes(&self) -> u64 {
        bytes_for(self.capacity).saturating_add(directory_bytes(self.capacity))
    }

    /// Iterate over all values in index order
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.capacity).map(move |index| self.get(index))
    }

    /// Copy all values into a plain vector
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<T: HugeValue> Drop for HugeArray<T> {
    fn drop(&mut self) {
        self.tracker.remove(charged_bytes(&self.pages));
    }
}

impl<T: HugeValue + fmt::Debug> fmt::Debug for HugeArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HugeArray")
            .field("size", &self.capacity)
            .field("pages", &self.pages.len())
            .field("allocated_pages", &self.allocated_pages())
            .finish()
    }
}

/// Bytes charged to the tracker for `pages`: one directory slot per page plus
/// every instantiated page
fn charged_bytes(pages: &[PageSlot]) -> u64 {
    let directory = pages.len() as u64 * size_of::<PageSlot>() as u64;
    let cells: u64 = pages
        .iter()
        .filter_map(OnceLock::get)
        .map(|page| page.len() as u64 * BYTES_PER_CELL)
        .sum();
    directory + cells
}

fn allocate_cells(len: usize, fill: u64, tracker: &AllocationTracker) -> Result<Page> {
    debug_assert!(len <= PAGE_SIZE);
    let mut cells = Vec::new();
    cells
        .try_reserve_exact(len)
        .map_err(|_| Error::AllocationFailed {
            requested: len as u64 * BYTES_PER_CELL,
            tracked: tracker.tracked(),
        })?;
    cells.extend((0..len).map(|_| AtomicU64::new(fill)));
    Ok(cells.into_boxed_slice())
}
