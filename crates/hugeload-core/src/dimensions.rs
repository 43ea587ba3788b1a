//! Dimension sizing pass
//!
//! One read-only pass over the store that fixes everything the builders need
//! to be allocated exactly once: node count, highest original id, the number
//! of qualifying records in every partition and the store key of every
//! requested property.

use crate::config::PropertyMapping;
use crate::memory::MemoryEstimate;
use crate::store::{KeyId, NodeFilter, RecordStore};
use crate::{Error, Result};
use rayon::prelude::*;
use std::ops::Range;

/// A contiguous range of store pages scanned by one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Position of the partition in store order
    pub index: usize,
    /// Store pages owned by the partition
    pub pages: Range<usize>,
}

impl Partition {
    /// Number of pages in the partition
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Split `page_count` pages into `concurrency` disjoint, contiguous,
/// store-ordered partitions. Partitions may be empty when there are fewer
/// pages than workers.
pub fn partitions(page_count: usize, concurrency: usize) -> Vec<Partition> {
    let k = concurrency.max(1);
    (0..k)
        .map(|index| Partition {
            index,
            pages: index * page_count / k..(index + 1) * page_count / k,
        })
        .collect()
}

/// A requested property after key resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProperty {
    /// Property name as requested
    pub name: String,
    /// Value used for nodes without the property
    pub default_value: f64,
    /// Store key, `None` when the store never saw the name
    pub key_id: Option<KeyId>,
}

/// Sizes fixed by the sizing pass
#[derive(Debug, Clone, PartialEq)]
pub struct GraphDimensions {
    /// Number of qualifying records
    pub node_count: u64,
    /// Highest original id among qualifying records
    pub highest_original_id: Option<u64>,
    /// Qualifying records per partition, in partition order
    pub partition_counts: Vec<u64>,
    /// Requested properties, in request order
    pub properties: Vec<ResolvedProperty>,
}

impl GraphDimensions {
    /// First dense id of every partition (prefix sums of the counts)
    pub fn partition_offsets(&self) -> Vec<u64> {
        self.partition_counts
            .iter()
            .scan(0u64, |next, count| {
                let start = *next;
                *next += count;
                Some(start)
            })
            .collect()
    }

    /// Number of properties the store knows a key for
    pub fn resolved_property_count(&self) -> usize {
        self.properties.iter().filter(|p| p.key_id.is_some()).count()
    }

    /// Bytes the builders for these dimensions will allocate
    pub fn memory_estimate(&self) -> MemoryEstimate {
        MemoryEstimate::for_dimensions(
            self.node_count,
            self.highest_original_id,
            self.resolved_property_count(),
        )
    }
}

/// Resolve property names against `store`; unknown names stay unresolved
pub fn resolve_properties<S: RecordStore + ?Sized>(
    store: &S,
    mappings: &[PropertyMapping],
) -> Vec<ResolvedProperty> {
    mappings
        .iter()
        .map(|mapping| {
            let key_id = store.resolve_property_key(&mapping.name);
            if key_id.is_none() {
                tracing::warn!(
                    "Property '{}' is not known to the store, every node gets the default {}",
                    mapping.name,
                    mapping.default_value
                );
            }
            ResolvedProperty {
                name: mapping.name.clone(),
                default_value: mapping.default_value,
                key_id,
            }
        })
        .collect()
}

/// Run the sizing pass, one rayon task per partition.
///
/// Call inside the importer's thread pool to bound its parallelism.
pub fn compute_dimensions<S: RecordStore + ?Sized>(
    store: &S,
    filter: &NodeFilter,
    mappings: &[PropertyMapping],
    partitions: &[Partition],
) -> Result<GraphDimensions> {
    let per_partition = partitions
        .par_iter()
        .map(|partition| size_partition(store, filter, partition))
        .collect::<Result<Vec<_>>>()?;

    let node_count = per_partition.iter().map(|(count, _)| count).sum();
    let highest_original_id = per_partition.iter().filter_map(|(_, h)| *h).max();
    let partition_counts = per_partition.into_iter().map(|(count, _)| count).collect();

    Ok(GraphDimensions {
        node_count,
        highest_original_id,
        partition_counts,
        properties: resolve_properties(store, mappings),
    })
}

fn size_partition<S: RecordStore + ?Sized>(
    store: &S,
    filter: &NodeFilter,
    partition: &Partition,
) -> Result<(u64, Option<u64>)> {
    let mut count = 0u64;
    let mut highest: Option<u64> = None;
    for page in partition.pages.clone() {
        let records = store.read_page(page)?;
        for record in records.iter().filter(|r| r.qualifies(filter)) {
            if record.original_id == u64::MAX {
                return Err(Error::invariant(
                    record.original_id,
                    "original id u64::MAX is reserved as not-found marker",
                ));
            }
            count += 1;
            highest = highest.max(Some(record.original_id));
        }
    }
    tracing::debug!(
        "Sized partition {} (pages {:?}): {} qualifying records",
        partition.index,
        partition.pages,
        count
    );
    Ok((count, highest))
}
