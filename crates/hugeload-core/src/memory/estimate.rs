//! Up-front memory estimation for sized dimensions

use crate::paged::{BYTES_PER_CELL, PAGE_SIZE, bytes_for, directory_bytes, num_pages};
use serde::Serialize;
use std::fmt;

/// Bytes the importer will allocate for a given set of dimensions.
///
/// Every component includes the page directory of its arrays. Components
/// saturate at `u64::MAX` when the dimensions cannot be addressed at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryEstimate {
    /// Dense → original array, always fully allocated
    pub dense_to_original: u64,
    /// Original → dense sparse map, worst case over the touched pages
    pub original_to_dense: u64,
    /// All resolved property arrays together
    pub properties: u64,
}

impl MemoryEstimate {
    /// Estimate for `node_count` nodes with ids up to `highest_original_id`
    /// and `resolved_properties` materialized property arrays
    pub fn for_dimensions(
        node_count: u64,
        highest_original_id: Option<u64>,
        resolved_properties: usize,
    ) -> Self {
        let id_capacity = highest_original_id.map_or(0, |h| h.saturating_add(1));
        // Each node touches at most one sparse page
        let touched_pages = (num_pages(id_capacity) as u64).min(node_count);
        let touched_bytes = touched_pages
            .saturating_mul(PAGE_SIZE as u64 * BYTES_PER_CELL)
            .min(bytes_for(id_capacity));
        let dense_array = bytes_for(node_count).saturating_add(directory_bytes(node_count));

        Self {
            dense_to_original: dense_array,
            original_to_dense: touched_bytes.saturating_add(directory_bytes(id_capacity)),
            properties: dense_array.saturating_mul(resolved_properties as u64),
        }
    }

    /// Sum of every component
    pub fn total(&self) -> u64 {
        self.dense_to_original
            .saturating_add(self.original_to_dense)
            .saturating_add(self.properties)
    }
}

impl fmt::Display for MemoryEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (id map {} + {}, properties {})",
            human_readable(self.total()),
            human_readable(self.dense_to_original),
            human_readable(self.original_to_dense),
            human_readable(self.properties)
        )
    }
}

/// Format a byte count with a binary unit, e.g. `1.50 MiB`
pub fn human_readable(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
