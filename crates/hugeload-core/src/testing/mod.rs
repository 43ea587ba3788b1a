//! Testing infrastructure for Hugeload Core
//!
//! Shared fixtures for unit tests, integration tests and benchmarks.
//!
//! # Key Features
//!
//! - **Literal scenario**: three nodes with a single `weight` property
//! - **Generated stores**: seeded, sparse-id stores of any size
//! - **Failure injection**: a store wrapper that fails reading one page
//!
//! # Usage
//!
//! ```rust
//! use hugeload_core::testing::{literal_config, literal_store};
//! use hugeload_core::GraphLoader;
//!
//! let result = GraphLoader::new(literal_config(1)).load(&literal_store()).unwrap();
//! assert_eq!(result.id_map.node_count(), 3);
//! ```

mod failing;
mod fixtures;

pub use failing::FailingStore;
pub use fixtures::{SparseStoreSpec, literal_config, literal_store, sparse_store};
