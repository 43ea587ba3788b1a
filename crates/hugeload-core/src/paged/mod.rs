//! Paged arrays - huge, fixed-capacity arrays split into power-of-two pages
//!
//! A single contiguous allocation cannot address billions of slots on every
//! platform, so every huge array in the loader is an array of pages. The page
//! size is `2^PAGE_SHIFT` elements; an absolute index decomposes into a page
//! index (shift) and an in-page offset (mask).
//!
//! Values are stored as 64-bit cells behind relaxed atomics. Workers write
//! disjoint indices during the scan, so the atomics never contend; they only
//! make the shared-reference writes sound.

mod huge_array;

pub use huge_array::{HugeArray, HugeArrayBuilder, directory_bytes};

/// log2 of the number of elements per page
pub const PAGE_SHIFT: u32 = 14;

/// Number of elements per page
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;

/// Mask extracting the in-page offset from an absolute index
pub const PAGE_MASK: u64 = (PAGE_SIZE as u64) - 1;

/// Bytes occupied by one cell
pub const BYTES_PER_CELL: u64 = 8;

/// Page holding `index`
#[inline(always)]
pub fn page_index(index: u64) -> usize {
    (index >> PAGE_SHIFT) as usize
}

/// Offset of `index` inside its page
#[inline(always)]
pub fn index_in_page(index: u64) -> usize {
    (index & PAGE_MASK) as usize
}

/// Number of pages needed for `capacity` elements
pub fn num_pages(capacity: u64) -> usize {
    capacity.div_ceil(PAGE_SIZE as u64) as usize
}

/// Number of elements in page `page` of an array with `capacity` elements.
/// Only the last page may be shorter than `PAGE_SIZE`.
pub fn page_len(capacity: u64, page: usize) -> usize {
    let start = (page as u64) << PAGE_SHIFT;
    capacity.saturating_sub(start).min(PAGE_SIZE as u64) as usize
}

/// Bytes needed to hold `capacity` elements with every page allocated.
/// Saturates at `u64::MAX` for sizes no address space can hold.
pub fn bytes_for(capacity: u64) -> u64 {
    capacity.saturating_mul(BYTES_PER_CELL)
}

/// A primitive that can live in a paged array cell
pub trait HugeValue: Copy + Send + Sync + 'static {
    /// Encode into the 64-bit cell representation
    fn to_bits(self) -> u64;
    /// Decode from the 64-bit cell representation
    fn from_bits(bits: u64) -> Self;
}

impl HugeValue for u64 {
    #[inline(always)]
    fn to_bits(self) -> u64 {
        self
    }

    #[inline(always)]
    fn from_bits(bits: u64) -> Self {
        bits
    }
}

impl HugeValue for i64 {
    #[inline(always)]
    fn to_bits(self) -> u64 {
        self as u64
    }

    #[inline(always)]
    fn from_bits(bits: u64) -> Self {
        bits as i64
    }
}

impl HugeValue for f64 {
    #[inline(always)]
    fn to_bits(self) -> u64 {
        f64::to_bits(self)
    }

    #[inline(always)]
    fn from_bits(bits: u64) -> Self {
        f64::from_bits(bits)
    }
}
