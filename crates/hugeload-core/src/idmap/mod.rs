//! Identifier map - bijection between original and dense node ids
//!
//! Dense → original is a fully allocated paged array; original → dense is the
//! lazily paged [`SparseNodeMapping`].

pub mod sparse;

pub use sparse::{NOT_FOUND, SparseNodeMapping, SparseNodeMappingBuilder};

use crate::memory::AllocationTracker;
use crate::paged::{HugeArray, HugeArrayBuilder};
use crate::{Error, Result};
use std::sync::Arc;

/// Writable id map shared by the scanner workers
#[derive(Debug)]
pub struct IdMapBuilder {
    to_original: HugeArrayBuilder<u64>,
    to_dense: SparseNodeMappingBuilder,
    node_count: u64,
}

impl IdMapBuilder {
    /// Allocate an id map for `node_count` nodes whose original ids are at
    /// most `highest_original_id`
    pub fn new(
        node_count: u64,
        highest_original_id: Option<u64>,
        tracker: Arc<AllocationTracker>,
    ) -> Result<Self> {
        let id_capacity = match highest_original_id {
            Some(highest) => highest.checked_add(1).ok_or_else(|| {
                Error::invariant(highest, "original id u64::MAX is reserved as not-found marker")
            })?,
            None => 0,
        };
        Ok(Self {
            to_original: HugeArrayBuilder::new(node_count, NOT_FOUND, tracker.clone())?,
            to_dense: SparseNodeMappingBuilder::new(id_capacity, tracker)?,
            node_count,
        })
    }

    /// Number of dense ids this map was sized for
    pub fn node_count(&self) -> u64 {
        self.node_count
    }

    /// Record the pair `original_id ↔ dense_id`.
    ///
    /// Fails with a diagnostic naming `original_id` when the pair falls outside
    /// the sized dimensions or the original id is already mapped.
    #[inline]
    pub fn add(&self, original_id: u64, dense_id: u64) -> Result<()> {
        if dense_id >= self.node_count {
            return Err(Error::invariant(
                original_id,
                format!(
                    "dense id {} is beyond the sized node count {}",
                    dense_id, self.node_count
                ),
            ));
        }
        if original_id >= self.to_dense.capacity() {
            return Err(Error::invariant(
                original_id,
                "original id is beyond the highest id seen while sizing",
            ));
        }
        if let Some(existing) = self.to_dense.set_if_absent(original_id, dense_id)? {
            return Err(Error::DuplicateOriginalId {
                original_id,
                existing,
            });
        }
        self.to_original.set(dense_id, original_id)
    }

    /// Current dense id of `original_id`
    pub fn to_dense_id(&self, original_id: u64) -> Option<u64> {
        self.to_dense.get(original_id)
    }

    /// Freeze into the immutable [`IdMap`]
    pub fn build(self) -> IdMap {
        IdMap {
            to_original: self.to_original.build(),
            to_dense: self.to_dense.build(),
        }
    }
}

/// Immutable bijection between dense ids `[0, node_count)` and original ids
#[derive(Debug)]
pub struct IdMap {
    to_original: HugeArray<u64>,
    to_dense: SparseNodeMapping,
}

impl IdMap {
    /// Number of nodes
    pub fn node_count(&self) -> u64 {
        self.to_original.size()
    }

    /// Dense id of `original_id`, `None` when the node was not imported
    #[inline]
    pub fn to_dense_id(&self, original_id: u64) -> Option<u64> {
        self.to_dense.get(original_id)
    }

    /// Original id of `dense_id`
    ///
    /// # Panics
    ///
    /// Panics if `dense_id >= node_count()`.
    #[inline]
    pub fn to_original_id(&self, dense_id: u64) -> u64 {
        self.to_original.get(dense_id)
    }

    /// Whether the node with `original_id` was imported
    pub fn contains(&self, original_id: u64) -> bool {
        self.to_dense.contains(original_id)
    }

    /// Highest original id the map can answer for
    pub fn highest_original_id(&self) -> Option<u64> {
        self.to_dense.capacity().checked_sub(1)
    }

    /// Iterate `(dense, original)` pairs in dense order
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.to_original.iter().enumerate().map(|(d, o)| (d as u64, o))
    }

    /// Bytes held by both directions of the map
    pub fn memory_bytes(&self) -> u64 {
        self.to_original.memory_bytes() + self.to_dense.memory_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(node_count: u64, highest: Option<u64>) -> IdMapBuilder {
        IdMapBuilder::new(node_count, highest, Arc::new(AllocationTracker::new())).unwrap()
    }

    #[test]
    fn test_id_map_bijection() {
        let builder = builder(3, Some(10));
        builder.add(0, 0).unwrap();
        builder.add(5, 1).unwrap();
        builder.add(10, 2).unwrap();

        let map = builder.build();
        assert_eq!(map.node_count(), 3);
        assert_eq!(map.highest_original_id(), Some(10));
        for dense in 0..map.node_count() {
            assert_eq!(map.to_dense_id(map.to_original_id(dense)), Some(dense));
        }
        assert_eq!(map.to_original_id(1), 5);
        assert!(map.contains(10));
        assert!(!map.contains(7));
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![(0, 0), (1, 5), (2, 10)]);
    }

    #[test]
    fn test_duplicate_original_id_fails_fast() {
        let builder = builder(2, Some(4));
        builder.add(4, 0).unwrap();
        let err = builder.add(4, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateOriginalId {
                original_id: 4,
                existing: 0
            }
        ));
    }

    #[test]
    fn test_out_of_dimension_ids_fail() {
        let builder = builder(1, Some(4));
        assert!(matches!(
            builder.add(5, 0),
            Err(Error::InvariantViolation { original_id: 5, .. })
        ));
        assert!(matches!(
            builder.add(2, 1),
            Err(Error::InvariantViolation { original_id: 2, .. })
        ));
    }

    #[test]
    fn test_empty_id_map() {
        let map = builder(0, None).build();
        assert_eq!(map.node_count(), 0);
        assert_eq!(map.highest_original_id(), None);
        assert_eq!(map.to_dense_id(0), None);
    }

    #[test]
    fn test_reserved_original_id_rejected() {
        let err = IdMapBuilder::new(1, Some(u64::MAX), Arc::new(AllocationTracker::new()))
            .unwrap_err();
        assert!(matches!(err, Error::InvariantViolation { .. }));
    }

    #[test]
    fn test_racing_duplicate_has_one_winner() {
        for _ in 0..200 {
            let builder = builder(8, Some(7));
            let results: Vec<Result<()>> = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..8u64)
                    .map(|dense| {
                        let builder = &builder;
                        scope.spawn(move || builder.add(7, dense))
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });
            assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
            assert!(results.iter().filter(|r| r.is_err()).all(|r| matches!(
                r,
                Err(Error::DuplicateOriginalId { original_id: 7, .. })
            )));
        }
    }
}
