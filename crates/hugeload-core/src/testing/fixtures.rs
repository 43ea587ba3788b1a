//! Store and configuration fixtures

use crate::config::LoaderConfig;
use crate::store::{MemoryStore, PropertyValue};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Ids `{0, 5, 10}`, one record per page; only node 5 carries `weight = 7.5`
pub fn literal_store() -> MemoryStore {
    let mut builder = MemoryStore::builder().records_per_page(1);
    builder
        .add_node(0, &["Node"], &[])
        .add_node(5, &["Node"], &[("weight", PropertyValue::Float64(7.5))])
        .add_node(10, &["Node"], &[]);
    builder.build()
}

/// Configuration loading `weight` with default `1.0`
pub fn literal_config(concurrency: usize) -> LoaderConfig {
    LoaderConfig::new()
        .with_concurrency(concurrency)
        .with_property("weight", 1.0)
}

/// Shape of a generated store
#[derive(Debug, Clone)]
pub struct SparseStoreSpec {
    /// Number of records
    pub node_count: u64,
    /// Largest gap between consecutive original ids (at least 1)
    pub max_gap: u64,
    /// Records per store page
    pub records_per_page: usize,
    /// Probability that a record carries `weight`
    pub weight_ratio: f64,
    /// RNG seed
    pub seed: u64,
}

impl Default for SparseStoreSpec {
    fn default() -> Self {
        Self {
            node_count: 1_000,
            max_gap: 16,
            records_per_page: 64,
            weight_ratio: 0.5,
            seed: 42,
        }
    }
}

/// Generate a store with strictly increasing, gapped original ids.
///
/// Records alternate randomly between labels `A` and `B`. A record's
/// `weight`, when present, is its original id divided by two, and every
/// record carries an integer `rank` equal to its position.
pub fn sparse_store(spec: &SparseStoreSpec) -> MemoryStore {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let mut builder = MemoryStore::builder().records_per_page(spec.records_per_page);
    builder.label("A");
    builder.label("B");
    builder.property_key("weight");
    builder.property_key("rank");

    let mut original_id = 0u64;
    for position in 0..spec.node_count {
        original_id += rng.gen_range(1..=spec.max_gap.max(1));
        let label = if rng.gen_bool(0.5) { "A" } else { "B" };
        let rank = ("rank", PropertyValue::Int64(position as i64));
        if rng.gen_bool(spec.weight_ratio.clamp(0.0, 1.0)) {
            let weight = ("weight", PropertyValue::Float64(original_id as f64 / 2.0));
            builder.add_node(original_id, &[label], &[weight, rank]);
        } else {
            builder.add_node(original_id, &[label], &[rank]);
        }
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordStore;

    #[test]
    fn test_sparse_store_is_reproducible() {
        let spec = SparseStoreSpec {
            node_count: 100,
            records_per_page: 10,
            ..Default::default()
        };
        let first = sparse_store(&spec);
        let second = sparse_store(&spec);
        assert_eq!(first.page_count(), 10);
        assert_eq!(first.record_count(), 100);
        assert_eq!(
            first.read_page(3).unwrap().as_ref(),
            second.read_page(3).unwrap().as_ref()
        );
    }

    #[test]
    fn test_sparse_store_ids_increase() {
        let store = sparse_store(&SparseStoreSpec::default());
        let mut previous = None;
        for page in 0..store.page_count() {
            for record in store.read_page(page).unwrap().iter() {
                assert!(previous < Some(record.original_id));
                previous = Some(record.original_id);
            }
        }
    }
}
