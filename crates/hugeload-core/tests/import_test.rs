//! Integration tests for the bulk import
//!
//! These tests drive the loader end to end through the public API.

use hugeload_core::store::{MemoryStore, NodeFilter, PropertyValue, RecordStore};
use hugeload_core::testing::{
    FailingStore, SparseStoreSpec, literal_config, literal_store, sparse_store,
};
use hugeload_core::{
    AllocationTracker, Error, GraphLoader, IdAssignment, ImportState, LoaderConfig,
    NodePropertyValues, ProgressSink,
};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

fn qualifying_ids(store: &MemoryStore, labels: &[String]) -> BTreeSet<u64> {
    let filter = NodeFilter::resolve(store, labels);
    (0..store.page_count())
        .flat_map(|page| store.read_page(page).unwrap().into_owned())
        .filter(|record| record.qualifies(&filter))
        .map(|record| record.original_id)
        .collect()
}

#[test]
fn test_literal_scenario_two_workers() {
    let result = GraphLoader::new(literal_config(2))
        .load(&literal_store())
        .unwrap();

    assert_eq!(result.node_count(), 3);
    // Reserved ranges keep store order even when partitions finish out of order
    assert_eq!(
        result.id_map.iter().collect::<Vec<_>>(),
        vec![(0, 0), (1, 5), (2, 10)]
    );
    let weight = result.property("weight").unwrap();
    assert_eq!(weight.value_at(result.id_map.to_dense_id(5).unwrap()), 7.5);
    assert_eq!(weight.value_at(result.id_map.to_dense_id(0).unwrap()), 1.0);
    assert_eq!(weight.value_at(result.id_map.to_dense_id(10).unwrap()), 1.0);
    assert_eq!(result.stats.partitions, 2);
}

#[test]
fn test_literal_scenario_shared_counter() {
    let config = literal_config(3).with_id_assignment(IdAssignment::SharedCounter);
    let result = GraphLoader::new(config).load(&literal_store()).unwrap();

    let originals: BTreeSet<u64> = result.id_map.iter().map(|(_, o)| o).collect();
    assert_eq!(originals, BTreeSet::from([0, 5, 10]));
    let weight = result.property("weight").unwrap();
    for (dense, original) in result.id_map.iter() {
        let expected = if original == 5 { 7.5 } else { 1.0 };
        assert_eq!(weight.value_at(dense), expected);
    }
}

#[test]
fn test_reserved_relation_is_partition_invariant() {
    let store = sparse_store(&SparseStoreSpec {
        node_count: 5_000,
        records_per_page: 100,
        ..Default::default()
    });
    let baseline = GraphLoader::new(LoaderConfig::new().with_concurrency(1))
        .load(&store)
        .unwrap();
    let expected: Vec<(u64, u64)> = baseline.id_map.iter().collect();

    for concurrency in [2, 3, 7, 16, 64] {
        let result = GraphLoader::new(LoaderConfig::new().with_concurrency(concurrency))
            .load(&store)
            .unwrap();
        assert_eq!(
            result.id_map.iter().collect::<Vec<_>>(),
            expected,
            "concurrency {}",
            concurrency
        );
    }
}

#[test]
fn test_label_filter_completeness() {
    let store = sparse_store(&SparseStoreSpec::default());
    let labels = vec!["A".to_string()];
    let result = GraphLoader::new(LoaderConfig::new().with_concurrency(4).with_labels(labels.clone()))
        .load(&store)
        .unwrap();

    let expected = qualifying_ids(&store, &labels);
    let mapped: BTreeSet<u64> = result.id_map.iter().map(|(_, o)| o).collect();
    assert_eq!(mapped, expected);
    assert!((result.node_count() as usize) < store.record_count());
    assert!(result.schema.node_labels.contains("A"));
}

#[test]
fn test_unknown_label_selects_nothing() {
    let result = GraphLoader::new(literal_config(2).with_labels(["Missing"]))
        .load(&literal_store())
        .unwrap();
    assert_eq!(result.node_count(), 0);
    assert_eq!(result.id_map.highest_original_id(), None);
    assert_eq!(result.property("weight").unwrap().value_at(0), 1.0);
}

#[test]
fn test_absent_properties_read_default() {
    let store = sparse_store(&SparseStoreSpec {
        node_count: 2_000,
        weight_ratio: 0.3,
        ..Default::default()
    });
    let config = LoaderConfig::new()
        .with_concurrency(4)
        .with_property("weight", -1.0)
        .with_property("rank", 0.0);
    let result = GraphLoader::new(config).load(&store).unwrap();

    let weight = result.property("weight").unwrap();
    let rank = result.property("rank").unwrap();
    let mut defaults = 0;
    for (dense, original) in result.id_map.iter() {
        let value = weight.value_at(dense);
        if value == -1.0 {
            defaults += 1;
        } else {
            assert_eq!(value, original as f64 / 2.0);
        }
        // Ranks follow store order, and reserved ids do too
        assert_eq!(rank.value_at(dense), dense as f64);
    }
    assert!(defaults > 0);
}

#[test]
fn test_unresolved_key_allocates_nothing() {
    let config = literal_config(1).with_property("height", 1.75);
    let loader = GraphLoader::new(config);
    let result = loader.load(&literal_store()).unwrap();

    let height = result.property("height").unwrap();
    assert!(height.is_constant());
    assert_eq!(height.memory_bytes(), 0);
    assert_eq!(height.value_at(2), 1.75);
    assert_eq!(height.default_value(), 1.75);
    assert!(!result.schema.property("height").unwrap().resolved);

    // Order of the columns follows the configuration
    assert_eq!(
        result.properties.names().collect::<Vec<_>>(),
        vec!["weight", "height"]
    );
    // Only the id map and the weight column were allocated
    assert_eq!(result.stats.bytes_allocated, loader.tracker().tracked());
    assert_eq!(result.memory_bytes(), loader.tracker().tracked());
}

#[test]
fn test_fail_fast_single_error() {
    let store = FailingStore::new(
        sparse_store(&SparseStoreSpec {
            node_count: 10_000,
            records_per_page: 50,
            ..Default::default()
        }),
        120,
    )
    .healthy_reads(1);
    let loader = GraphLoader::new(LoaderConfig::new().with_concurrency(8));
    let err = loader.load(&store).unwrap_err();

    assert!(matches!(err, Error::Store(ref msg) if msg.contains("page 120")));
    assert_eq!(loader.state(), ImportState::Failed);
    assert_eq!(store.failing_page_reads(), 2);
}

#[test]
fn test_sizing_failure_fails_import() {
    let store = FailingStore::new(literal_store(), 0);
    let loader = GraphLoader::new(literal_config(2));
    assert!(matches!(loader.load(&store), Err(Error::Store(_))));
    assert_eq!(loader.state(), ImportState::Failed);
}

#[test]
fn test_non_numeric_property_names_the_node() {
    let mut builder = MemoryStore::builder().records_per_page(2);
    builder
        .add_node(1, &[], &[("flag", PropertyValue::Int64(1))])
        .add_node(2, &[], &[("flag", PropertyValue::Null)])
        .add_node(3, &[], &[("flag", PropertyValue::Bool(true))]);
    let config = LoaderConfig::new().with_concurrency(2).with_property("flag", 0.0);
    let err = GraphLoader::new(config).load(&builder.build()).unwrap_err();
    match err {
        Error::Decode {
            original_id,
            property,
            ..
        } => {
            assert_eq!(original_id, 3);
            assert_eq!(property, "flag");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_progress_reaches_node_count() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = seen.clone();
    let sink: ProgressSink = Arc::new(move |processed| sink_seen.lock().push(processed));

    let store = sparse_store(&SparseStoreSpec {
        node_count: 1_000,
        records_per_page: 10,
        ..Default::default()
    });
    let config = LoaderConfig::new()
        .with_concurrency(4)
        .with_progress_batch_size(25);
    GraphLoader::new(config)
        .with_progress(sink)
        .load(&store)
        .unwrap();

    let seen = seen.lock();
    assert_eq!(seen.iter().copied().max(), Some(1_000));
    assert!(seen.len() >= 1_000 / 25);
}

#[test]
fn test_empty_store() {
    let store = MemoryStore::builder().build();
    let result = GraphLoader::new(literal_config(4)).load(&store).unwrap();
    assert_eq!(result.node_count(), 0);
    assert_eq!(result.stats.bytes_allocated, 0);
    assert_eq!(result.property("weight").unwrap().default_value(), 1.0);
}

#[test]
fn test_duplicate_ids_across_partitions_always_fail() {
    let mut builder = MemoryStore::builder().records_per_page(1);
    builder.add_node(7, &[], &[]).add_node(7, &[], &[]);
    let store = builder.build();

    for _ in 0..500 {
        let loader = GraphLoader::new(LoaderConfig::new().with_concurrency(2));
        match loader.load(&store) {
            Err(Error::DuplicateOriginalId { original_id, .. }) => assert_eq!(original_id, 7),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(result) => panic!(
                "duplicate id imported as {} nodes",
                result.node_count()
            ),
        }
        assert_eq!(loader.state(), ImportState::Failed);
    }
}

#[test]
fn test_huge_original_id_is_an_allocation_error() {
    let mut builder = MemoryStore::builder();
    builder.add_node(1 << 61, &[], &[]);
    let store = builder.build();

    let loader = GraphLoader::new(LoaderConfig::new().with_concurrency(1));
    let err = loader.load(&store).unwrap_err();
    assert!(matches!(err, Error::AllocationFailed { .. }));
    assert_eq!(loader.state(), ImportState::Failed);
    assert_eq!(loader.tracker().tracked(), 0);

    // With a limit the sizing estimate refuses before anything is allocated
    let loader = GraphLoader::new(
        LoaderConfig::new()
            .with_concurrency(1)
            .with_memory_limit(1 << 30),
    );
    let err = loader.load(&store).unwrap_err();
    assert!(matches!(err, Error::AllocationExhausted { tracked: 0, .. }));
}

#[test]
fn test_failed_import_releases_shared_tracker() {
    let tracker = Arc::new(AllocationTracker::with_limit(1 << 20));
    let failing = FailingStore::new(literal_store(), 2).healthy_reads(1);

    let loader = GraphLoader::new(literal_config(2)).with_tracker(tracker.clone());
    assert!(matches!(loader.load(&failing), Err(Error::Store(_))));
    assert_eq!(tracker.tracked(), 0);

    // The next import on the same tracker sees the full budget
    let result = GraphLoader::new(literal_config(2))
        .with_tracker(tracker.clone())
        .load(&literal_store())
        .unwrap();
    assert_eq!(tracker.tracked(), result.memory_bytes());
    drop(result);
    assert_eq!(tracker.tracked(), 0);
}
