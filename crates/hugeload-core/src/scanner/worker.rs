use super::{PropertyColumn, ScannerPool};
use crate::config::IdAssignment;
use crate::dimensions::Partition;
use crate::store::{Record, RecordStore};
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Source of dense ids for one partition
enum DenseIds<'a> {
    /// Sequential ids inside the range reserved while sizing
    Reserved { next: u64, end: u64 },
    /// Ids drawn from the counter shared by all partitions
    Shared(&'a AtomicU64),
}

impl DenseIds<'_> {
    #[inline]
    fn next(&mut self, original_id: u64, node_count: u64) -> Result<u64> {
        match self {
            DenseIds::Reserved { next, end } => {
                if *next >= *end {
                    return Err(Error::invariant(
                        original_id,
                        "partition produced more records than were reserved while sizing",
                    ));
                }
                let dense = *next;
                *next += 1;
                Ok(dense)
            }
            DenseIds::Shared(counter) => {
                let dense = counter.fetch_add(1, Ordering::Relaxed);
                if dense >= node_count {
                    return Err(Error::invariant(
                        original_id,
                        format!(
                            "dense id {} is beyond the sized node count {}",
                            dense, node_count
                        ),
                    ));
                }
                Ok(dense)
            }
        }
    }
}

/// Scans one partition sequentially, writing into the shared builders
pub(super) struct PartitionScanner<'a, 'c, S: RecordStore + ?Sized> {
    ctx: &'c ScannerPool<'a, S>,
    partition: &'c Partition,
    cancelled: &'c AtomicBool,
    ids: DenseIds<'c>,
    reserved: Option<u64>,
    produced: u64,
    unreported: u64,
    last_original_id: Option<u64>,
}

impl<'a, 'c, S: RecordStore + ?Sized> PartitionScanner<'a, 'c, S> {
    pub(super) fn new(
        ctx: &'c ScannerPool<'a, S>,
        partition: &'c Partition,
        shared_counter: &'c AtomicU64,
        cancelled: &'c AtomicBool,
    ) -> Result<Self> {
        let (ids, reserved) = match ctx.id_assignment {
            IdAssignment::Reserved => {
                let (start, count) = ctx
                    .offsets
                    .get(partition.index)
                    .zip(ctx.dimensions.partition_counts.get(partition.index))
                    .map(|(start, count)| (*start, *count))
                    .ok_or_else(|| {
                        Error::internal(format!("partition {} was never sized", partition.index))
                    })?;
                (
                    DenseIds::Reserved {
                        next: start,
                        end: start + count,
                    },
                    Some(count),
                )
            }
            IdAssignment::SharedCounter => (DenseIds::Shared(shared_counter), None),
        };
        Ok(Self {
            ctx,
            partition,
            cancelled,
            ids,
            reserved,
            produced: 0,
            unreported: 0,
            last_original_id: None,
        })
    }

    /// Scan every page of the partition; stops early once cancelled
    pub(super) fn scan(mut self) -> Result<u64> {
        for page in self.partition.pages.clone() {
            self.check_cancelled()?;
            let records = self.ctx.store.read_page(page)?;
            for record in records.iter() {
                self.check_cancelled()?;
                if record.qualifies(self.ctx.filter) {
                    self.import(record)?;
                }
            }
        }
        self.report_progress();

        if let Some(reserved) = self.reserved.filter(|r| *r != self.produced) {
            return Err(Error::invariant(
                self.last_original_id.unwrap_or_default(),
                format!(
                    "partition {} produced {} records but {} were reserved while sizing",
                    self.partition.index, self.produced, reserved
                ),
            ));
        }
        tracing::debug!(
            "Scanned partition {} (pages {:?}): {} records",
            self.partition.index,
            self.partition.pages,
            self.produced
        );
        Ok(self.produced)
    }

    #[inline]
    fn check_cancelled(&self) -> Result<()> {
        if self.cancelled.load(Ordering::Relaxed) {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    #[inline]
    fn import(&mut self, record: &Record) -> Result<()> {
        let original_id = record.original_id;
        self.last_original_id = Some(original_id);
        let dense_id = self.ids.next(original_id, self.ctx.id_map.node_count())?;
        self.ctx.id_map.add(original_id, dense_id)?;

        for column in self.ctx.properties {
            write_property(column, record, dense_id)?;
        }

        self.produced += 1;
        self.unreported += 1;
        if self.unreported >= self.ctx.progress_batch_size {
            self.report_progress();
        }
        Ok(())
    }

    fn report_progress(&mut self) {
        if let Some(progress) = self.ctx.progress {
            progress.records_imported(self.unreported);
        }
        self.unreported = 0;
    }
}

#[inline]
fn write_property(column: &PropertyColumn, record: &Record, dense_id: u64) -> Result<()> {
    let Some(value) = record.property(column.builder.key_id()) else {
        return Ok(());
    };
    match value.as_f64() {
        Ok(Some(number)) => column.builder.set(dense_id, number),
        Ok(None) => Ok(()),
        Err(kind) => Err(Error::decode(
            record.original_id,
            column.name.as_str(),
            format!("{} values cannot be loaded as numbers", kind),
        )),
    }
}
