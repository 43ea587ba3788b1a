//! Property-based tests for the id map produced by an import

use hugeload_core::store::{MemoryStore, PropertyValue};
use hugeload_core::{GraphLoader, IdAssignment, LoaderConfig, NodePropertyValues};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Distinct original ids with an optional weight each
fn sparse_nodes() -> impl Strategy<Value = BTreeMap<u64, Option<f64>>> {
    prop::collection::btree_map(
        0u64..1_000_000,
        prop::option::of(-1_000.0f64..1_000.0),
        0..300,
    )
}

fn build_store(nodes: &BTreeMap<u64, Option<f64>>, records_per_page: usize) -> MemoryStore {
    let mut builder = MemoryStore::builder().records_per_page(records_per_page);
    for (&id, weight) in nodes {
        match weight {
            Some(w) => builder.add_node(id, &["N"], &[("weight", PropertyValue::Float64(*w))]),
            None => builder.add_node(id, &["N"], &[]),
        };
    }
    builder.build()
}

fn id_assignment() -> impl Strategy<Value = IdAssignment> {
    prop_oneof![
        Just(IdAssignment::Reserved),
        Just(IdAssignment::SharedCounter)
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_import_is_a_complete_bijection(
        nodes in sparse_nodes(),
        records_per_page in 1usize..40,
        concurrency in 1usize..=8,
        strategy in id_assignment(),
    ) {
        let store = build_store(&nodes, records_per_page);
        let config = LoaderConfig::new()
            .with_concurrency(concurrency)
            .with_id_assignment(strategy)
            .with_property("weight", f64::NAN);
        let result = GraphLoader::new(config).load(&store).unwrap();

        prop_assert_eq!(result.node_count(), nodes.len() as u64);
        let weight = result.property("weight").unwrap();
        for dense in 0..result.node_count() {
            let original = result.id_map.to_original_id(dense);
            prop_assert_eq!(result.id_map.to_dense_id(original), Some(dense));
            match nodes.get(&original) {
                Some(Some(w)) => prop_assert_eq!(weight.value_at(dense), *w),
                Some(None) => prop_assert!(weight.value_at(dense).is_nan()),
                None => prop_assert!(false, "original id {} was never in the store", original),
            }
        }
        for &original in nodes.keys() {
            prop_assert!(result.id_map.contains(original));
        }
    }

    #[test]
    fn prop_reserved_relation_is_concurrency_invariant(
        nodes in sparse_nodes(),
        records_per_page in 1usize..40,
        concurrency in 2usize..=8,
    ) {
        let store = build_store(&nodes, records_per_page);
        let load = |concurrency: usize| {
            GraphLoader::new(LoaderConfig::new().with_concurrency(concurrency))
                .load(&store)
                .unwrap()
                .id_map
                .iter()
                .collect::<Vec<_>>()
        };
        let single = load(1);
        // Reserved ids follow store order, which is ascending original id
        prop_assert!(single.windows(2).all(|w| w[0].1 < w[1].1));
        prop_assert_eq!(load(concurrency), single);
    }
}
