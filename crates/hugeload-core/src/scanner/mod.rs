//! Partitioned scanner pool
//!
//! One rayon task per partition. Every task scans its pages in store order
//! and writes into the shared builders; partitions are disjoint, so no two
//! tasks ever write the same dense index or the same original id.
//!
//! The first failing partition records its error and raises the cancellation
//! flag; the others stop before their next record. Their `Cancelled` echoes
//! are never reported in place of the error that caused them.

mod worker;

use crate::config::IdAssignment;
use crate::dimensions::{GraphDimensions, Partition};
use crate::idmap::IdMapBuilder;
use crate::progress::ImportProgress;
use crate::properties::NodePropertiesBuilder;
use crate::store::{NodeFilter, RecordStore};
use crate::{Error, Result};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use worker::PartitionScanner;

/// A resolved property column being filled by the scan
#[derive(Debug)]
pub struct PropertyColumn {
    /// Property name as requested
    pub name: String,
    /// Column builder
    pub builder: NodePropertiesBuilder,
}

/// Scans partitions concurrently into shared builders
pub struct ScannerPool<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    filter: &'a NodeFilter,
    dimensions: &'a GraphDimensions,
    offsets: Vec<u64>,
    id_map: &'a IdMapBuilder,
    properties: &'a [PropertyColumn],
    id_assignment: IdAssignment,
    progress: Option<&'a ImportProgress>,
    progress_batch_size: u64,
    cancelled: Option<&'a AtomicBool>,
}

impl<'a, S: RecordStore + ?Sized> ScannerPool<'a, S> {
    /// Create a pool writing into `id_map`, sized by `dimensions`
    pub fn new(
        store: &'a S,
        filter: &'a NodeFilter,
        dimensions: &'a GraphDimensions,
        id_map: &'a IdMapBuilder,
    ) -> Self {
        Self {
            store,
            filter,
            dimensions,
            offsets: dimensions.partition_offsets(),
            id_map,
            properties: &[],
            id_assignment: IdAssignment::default(),
            progress: None,
            progress_batch_size: 10_000,
            cancelled: None,
        }
    }

    /// Property columns to fill
    pub fn properties(mut self, properties: &'a [PropertyColumn]) -> Self {
        self.properties = properties;
        self
    }

    /// Dense id assignment strategy
    pub fn id_assignment(mut self, id_assignment: IdAssignment) -> Self {
        self.id_assignment = id_assignment;
        self
    }

    /// Report processed records to `progress` every `batch_size` records
    pub fn progress(mut self, progress: &'a ImportProgress, batch_size: u64) -> Self {
        self.progress = Some(progress);
        self.progress_batch_size = batch_size.max(1);
        self
    }

    /// Share a cancellation flag with the caller
    pub fn cancel_flag(mut self, cancelled: &'a AtomicBool) -> Self {
        self.cancelled = Some(cancelled);
        self
    }

    /// Scan every partition; returns the number of imported records.
    ///
    /// Runs on the current rayon pool. Under the reserved strategy the
    /// partitions must be the ones the dimensions were sized with.
    pub fn run(&self, partitions: &[Partition]) -> Result<u64> {
        if self.id_assignment == IdAssignment::Reserved
            && partitions.len() != self.dimensions.partition_counts.len()
        {
            return Err(Error::internal(format!(
                "{} partitions scanned but {} were sized",
                partitions.len(),
                self.dimensions.partition_counts.len()
            )));
        }

        let local_flag = AtomicBool::new(false);
        let cancelled = self.cancelled.unwrap_or(&local_flag);
        let shared_counter = AtomicU64::new(0);
        let imported = AtomicU64::new(0);
        let first_error: Mutex<Option<Error>> = Mutex::new(None);

        partitions.par_iter().for_each(|partition| {
            let result = PartitionScanner::new(self, partition, &shared_counter, cancelled)
                .and_then(PartitionScanner::scan);
            match result {
                Ok(count) => {
                    imported.fetch_add(count, Ordering::Relaxed);
                }
                Err(e) => {
                    if !e.is_cancelled() {
                        let mut slot = first_error.lock();
                        if slot.is_none() {
                            tracing::debug!("Partition {} failed: {}", partition.index, e);
                            *slot = Some(e);
                        }
                    }
                    cancelled.store(true, Ordering::Relaxed);
                }
            }
        });

        if let Some(e) = first_error.into_inner() {
            return Err(e);
        }
        if cancelled.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }

        let imported = imported.into_inner();
        let node_count = self.dimensions.node_count;
        let highest = self.dimensions.highest_original_id.unwrap_or_default();
        if imported != node_count {
            return Err(Error::invariant(
                highest,
                format!(
                    "scan imported {} records but {} were sized",
                    imported, node_count
                ),
            ));
        }
        if self.id_assignment == IdAssignment::SharedCounter {
            let assigned = shared_counter.into_inner();
            if assigned != node_count {
                return Err(Error::invariant(
                    highest,
                    format!(
                        "shared counter handed out {} ids for {} nodes",
                        assigned, node_count
                    ),
                ));
            }
        }
        Ok(imported)
    }
}
