//! Import orchestrator
//!
//! Drives one import through its phases:
//!
//! ```text
//! NotStarted → Sizing → Scanning → Merging → Done
//!                 ╰──────────┴──→ Failed
//! ```
//!
//! Sizing fixes the dimensions, the builders are allocated once, the scanner
//! pool fills them in parallel and merging freezes them into the immutable
//! [`IdsAndProperties`] bundle. A failure in any phase drops every builder;
//! no partial result escapes.

use crate::config::LoaderConfig;
use crate::dimensions::{compute_dimensions, partitions};
use crate::idmap::{IdMap, IdMapBuilder};
use crate::memory::AllocationTracker;
use crate::progress::{ImportProgress, ProgressSink};
use crate::properties::{
    ArrayPropertyMap, ConstantPropertyMap, NodePropertiesBuilder, PropertyMap, PropertyMaps,
};
use crate::scanner::{PropertyColumn, ScannerPool};
use crate::schema::GraphSchema;
use crate::store::{NodeFilter, RecordStore};
use crate::{Error, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Phase of an import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImportState {
    /// `load` has not been called
    NotStarted,
    /// Counting qualifying records
    Sizing,
    /// Workers are filling the builders
    Scanning,
    /// Builders are being frozen
    Merging,
    /// The result was handed out
    Done,
    /// The import failed; no result exists
    Failed,
}

impl ImportState {
    /// Whether `next` may follow this state
    pub fn can_transition_to(self, next: ImportState) -> bool {
        use ImportState::*;
        matches!(
            (self, next),
            (NotStarted, Sizing)
                | (Sizing, Scanning)
                | (Scanning, Merging)
                | (Merging, Done)
                | (Sizing, Failed)
                | (Scanning, Failed)
        )
    }

    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, ImportState::Done | ImportState::Failed)
    }
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportState::NotStarted => "not started",
            ImportState::Sizing => "sizing",
            ImportState::Scanning => "scanning",
            ImportState::Merging => "merging",
            ImportState::Done => "done",
            ImportState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Statistics of a finished import
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportStats {
    /// Number of imported nodes
    pub node_count: u64,
    /// Highest original id among imported nodes
    pub highest_original_id: Option<u64>,
    /// Number of partitions scanned in parallel
    pub partitions: usize,
    /// Bytes allocated by the builders of this import
    pub bytes_allocated: u64,
    /// Wall-clock time of the whole import
    pub duration: Duration,
}

/// Result of an import: the id map and one column per requested property
#[derive(Debug)]
pub struct IdsAndProperties {
    /// Bijection between dense and original ids
    pub id_map: IdMap,
    /// Property columns in request order
    pub properties: PropertyMaps,
    /// Labels and columns of the loaded graph
    pub schema: GraphSchema,
    /// Import statistics
    pub stats: ImportStats,
}

impl IdsAndProperties {
    /// Number of imported nodes
    pub fn node_count(&self) -> u64 {
        self.id_map.node_count()
    }

    /// Property column `name`
    pub fn property(&self, name: &str) -> Option<&PropertyMap> {
        self.properties.get(name)
    }

    /// Bytes held by the id map and all columns
    pub fn memory_bytes(&self) -> u64 {
        self.id_map.memory_bytes() + self.properties.memory_bytes()
    }
}

/// Loads nodes from a [`RecordStore`] into an [`IdsAndProperties`] bundle.
///
/// A loader runs a single import; create a new one for every load.
pub struct GraphLoader {
    config: LoaderConfig,
    tracker: Arc<AllocationTracker>,
    progress_sink: Option<ProgressSink>,
    state: RwLock<ImportState>,
    cancelled: AtomicBool,
}

impl GraphLoader {
    /// Create a loader; the tracker honours `config.memory_limit_bytes`
    pub fn new(config: LoaderConfig) -> Self {
        let tracker = match config.memory_limit_bytes {
            Some(limit) => AllocationTracker::with_limit(limit),
            None => AllocationTracker::new(),
        };
        Self {
            config,
            tracker: Arc::new(tracker),
            progress_sink: None,
            state: RwLock::new(ImportState::NotStarted),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Forward the running number of processed records to `sink`
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress_sink = Some(sink);
        self
    }

    /// Account allocations in `tracker` instead of a private one
    pub fn with_tracker(mut self, tracker: Arc<AllocationTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// Loader configuration
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Allocation tracker used by the builders
    pub fn tracker(&self) -> &Arc<AllocationTracker> {
        &self.tracker
    }

    /// Current phase
    pub fn state(&self) -> ImportState {
        *self.state.read()
    }

    /// Ask a running import to stop; it fails with [`Error::Cancelled`]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Run the import
    pub fn load<S: RecordStore + ?Sized>(&self, store: &S) -> Result<IdsAndProperties> {
        self.config.validate()?;
        self.transition(ImportState::Sizing)?;
        match self.run(store) {
            Ok(result) => {
                self.transition(ImportState::Done)?;
                Ok(result)
            }
            Err(e) => {
                let phase = self.state();
                if phase.can_transition_to(ImportState::Failed) {
                    *self.state.write() = ImportState::Failed;
                }
                tracing::error!("Import failed while {}: {}", phase, e);
                Err(e)
            }
        }
    }

    fn transition(&self, next: ImportState) -> Result<()> {
        let mut state = self.state.write();
        if !state.can_transition_to(next) {
            return Err(Error::internal(format!(
                "illegal import transition from {} to {}",
                *state, next
            )));
        }
        tracing::debug!("Import state {} -> {}", *state, next);
        *state = next;
        Ok(())
    }

    fn run<S: RecordStore + ?Sized>(&self, store: &S) -> Result<IdsAndProperties> {
        let config = &self.config;
        let started = Instant::now();
        let tracked_before = self.tracker.tracked();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.concurrency)
            .thread_name(|i| format!("hugeload-worker-{}", i))
            .build()
            .map_err(|e| Error::internal(format!("failed to build worker pool: {}", e)))?;

        // Sizing
        let filter = NodeFilter::resolve(store, &config.node_labels);
        let parts = partitions(store.page_count(), config.concurrency);
        tracing::info!(
            "Sizing {} store pages in {} partitions",
            store.page_count(),
            parts.len()
        );
        let phase_start = Instant::now();
        let dims = pool.install(|| {
            compute_dimensions(store, &filter, &config.property_mappings, &parts)
        })?;
        let estimate = dims.memory_estimate();
        tracing::info!(
            "Sized graph: {} nodes, highest original id {:?}, estimated memory {} ({:?})",
            dims.node_count,
            dims.highest_original_id,
            estimate,
            phase_start.elapsed()
        );
        let required = estimate.total();
        if required == u64::MAX {
            return Err(Error::AllocationFailed {
                requested: required,
                tracked: self.tracker.tracked(),
            });
        }
        self.tracker.check_headroom(required)?;

        // Scanning
        self.transition(ImportState::Scanning)?;
        let phase_start = Instant::now();
        let id_map = IdMapBuilder::new(
            dims.node_count,
            dims.highest_original_id,
            self.tracker.clone(),
        )?;
        let columns = dims
            .properties
            .iter()
            .filter_map(|p| p.key_id.map(|key_id| (p, key_id)))
            .map(|(p, key_id)| {
                Ok(PropertyColumn {
                    name: p.name.clone(),
                    builder: NodePropertiesBuilder::of(
                        dims.node_count,
                        p.default_value,
                        key_id,
                        self.tracker.clone(),
                    )?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let progress = ImportProgress::new(dims.node_count, self.progress_sink.clone());
        let imported = {
            let scanner = ScannerPool::new(store, &filter, &dims, &id_map)
                .properties(&columns)
                .id_assignment(config.id_assignment)
                .progress(&progress, config.progress_batch_size)
                .cancel_flag(&self.cancelled);
            pool.install(|| scanner.run(&parts))?
        };
        tracing::info!(
            "Scanned {} nodes with {} workers ({:?})",
            imported,
            config.concurrency,
            phase_start.elapsed()
        );

        // Merging
        self.transition(ImportState::Merging)?;
        let id_map = id_map.build();
        let mut built: HashMap<String, ArrayPropertyMap> = columns
            .into_iter()
            .map(|column| (column.name, column.builder.build()))
            .collect();
        let mut properties = PropertyMaps::new();
        for property in &dims.properties {
            match built.remove(&property.name) {
                Some(map) => properties.insert(property.name.clone(), map),
                None => properties.insert(
                    property.name.clone(),
                    ConstantPropertyMap::new(property.default_value),
                ),
            }
        }

        let stats = ImportStats {
            node_count: dims.node_count,
            highest_original_id: dims.highest_original_id,
            partitions: parts.len(),
            bytes_allocated: self.tracker.tracked().saturating_sub(tracked_before),
            duration: started.elapsed(),
        };
        tracing::info!(
            "Import finished: {} nodes, {} properties, {} bytes allocated ({:?})",
            stats.node_count,
            properties.len(),
            stats.bytes_allocated,
            stats.duration
        );

        Ok(IdsAndProperties {
            id_map,
            properties,
            schema: GraphSchema::from_import(&config.node_labels, &dims.properties),
            stats,
        })
    }
}

impl fmt::Debug for GraphLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphLoader")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("tracked_bytes", &self.tracker.tracked())
            .finish()
    }
}
