//! Node algorithms running on an imported graph
//!
//! An algorithm reads the id map and property columns and produces one
//! `f64` per node, keyed by dense id. Results can be attached back to the
//! graph as a property column.

use crate::importer::IdsAndProperties;
use crate::memory::AllocationTracker;
use crate::paged::{HugeArray, HugeArrayBuilder};
use crate::properties::{ArrayPropertyMap, NodePropertyValues};
use crate::{Error, Result};
use rayon::prelude::*;
use std::sync::Arc;

/// Trait for algorithms producing one value per node
pub trait NodeAlgorithm: Send + Sync {
    /// Algorithm name (e.g., "scale.minMax")
    fn name(&self) -> &str;

    /// Compute one value per dense id
    fn compute(
        &self,
        graph: &IdsAndProperties,
        tracker: Arc<AllocationTracker>,
    ) -> Result<HugeArray<f64>>;

    /// Compute and wrap the result as a property column
    fn compute_property(
        &self,
        graph: &IdsAndProperties,
        tracker: Arc<AllocationTracker>,
        default_value: f64,
    ) -> Result<ArrayPropertyMap> {
        Ok(ArrayPropertyMap::new(
            self.compute(graph, tracker)?,
            default_value,
        ))
    }
}

/// Rescales a property column linearly into `[0, 1]`.
///
/// When every node has the same value, every node scales to `0`.
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    property: String,
}

impl MinMaxScaler {
    /// Scale column `property`
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
        }
    }
}

impl NodeAlgorithm for MinMaxScaler {
    fn name(&self) -> &str {
        "scale.minMax"
    }

    fn compute(
        &self,
        graph: &IdsAndProperties,
        tracker: Arc<AllocationTracker>,
    ) -> Result<HugeArray<f64>> {
        let column = graph.property(&self.property).ok_or_else(|| {
            Error::config(format!(
                "property '{}' was not loaded; {} needs it",
                self.property,
                self.name()
            ))
        })?;
        let node_count = graph.node_count();

        let (min, max) = (0..node_count)
            .into_par_iter()
            .map(|dense| column.value_at(dense))
            .fold(
                || (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), v| (lo.min(v), hi.max(v)),
            )
            .reduce(
                || (f64::INFINITY, f64::NEG_INFINITY),
                |(a, b), (c, d)| (a.min(c), b.max(d)),
            );
        let range = max - min;

        let scaled = HugeArrayBuilder::new(node_count, 0.0, tracker)?;
        if range > 0.0 {
            (0..node_count).into_par_iter().try_for_each(|dense| {
                scaled.set(dense, (column.value_at(dense) - min) / range)
            })?;
        }
        tracing::debug!(
            "Scaled '{}' for {} nodes (min {}, max {})",
            self.property,
            node_count,
            min,
            max
        );
        Ok(scaled.build())
    }
}
