//! Hugeload Core - Parallel Bulk Loading of Huge In-Memory Graphs
//!
//! This crate materializes the nodes of a read-only, paged record store into
//! a compact, immutable in-memory graph:
//! - Dense node ids `[0, node_count)` in bijection with the original ids
//! - Paged arrays addressing billions of slots without a single allocation
//! - One `f64` column per requested property, with default fallback
//! - A sizing pass followed by a partitioned, parallel scan
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            Import Orchestrator               │
//! │  (state machine, memory check, merging)     │
//! └──────────────┬──────────────────────────────┘
//!                │
//! ┌──────────────┴──────────────────────────────┐
//! │   Dimension Sizing  →  Scanner Pool          │
//! │   (counts, offsets)    (rayon, per partition)│
//! └──────────────┬──────────────────────────────┘
//!                │
//! ┌──────────────┴──────────────────────────────┐
//! │              Builders                        │
//! │  (IdMapBuilder, NodePropertiesBuilder)      │
//! └──────────────┬──────────────────────────────┘
//!                │
//! ┌──────────────┴──────────────────────────────┐
//! │      Paged Arrays + Allocation Tracker       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use hugeload_core::store::{MemoryStore, PropertyValue};
//! use hugeload_core::{GraphLoader, LoaderConfig, NodePropertyValues};
//!
//! let mut builder = MemoryStore::builder();
//! builder
//!     .add_node(0, &["City"], &[])
//!     .add_node(5, &["City"], &[("population", PropertyValue::Int64(1200))]);
//! let store = builder.build();
//!
//! let config = LoaderConfig::new().with_property("population", 0.0);
//! let graph = GraphLoader::new(config).load(&store).unwrap();
//!
//! let dense = graph.id_map.to_dense_id(5).unwrap();
//! assert_eq!(graph.property("population").unwrap().value_at(dense), 1200.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod config;
pub mod dimensions;
pub mod error;
pub mod idmap;
pub mod importer;
pub mod memory;
pub mod paged;
pub mod progress;
pub mod properties;
pub mod scanner;
pub mod schema;
pub mod store;
pub mod testing;

pub use config::{IdAssignment, LoaderConfig, PropertyMapping};
pub use error::{Error, Result};
pub use idmap::IdMap;
pub use importer::{GraphLoader, IdsAndProperties, ImportState, ImportStats};
pub use memory::{AllocationTracker, MemoryEstimate};
pub use progress::ProgressSink;
pub use properties::{NodePropertyValues, PropertyMap, PropertyMaps};
pub use schema::GraphSchema;
pub use store::RecordStore;
