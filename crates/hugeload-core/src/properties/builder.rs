use super::ArrayPropertyMap;
use crate::Result;
use crate::memory::AllocationTracker;
use crate::paged::HugeArrayBuilder;
use crate::store::KeyId;
use std::sync::Arc;

/// Writable property column shared by the scanner workers.
///
/// Pages are pre-filled with the default, so a node whose record lacks the
/// property reads back as the default without ever being written.
#[derive(Debug)]
pub struct NodePropertiesBuilder {
    values: HugeArrayBuilder<f64>,
    default_value: f64,
    key_id: KeyId,
}

impl NodePropertiesBuilder {
    /// Allocate a column for `node_count` nodes reading property `key_id`
    pub fn of(
        node_count: u64,
        default_value: f64,
        key_id: KeyId,
        tracker: Arc<AllocationTracker>,
    ) -> Result<Self> {
        Ok(Self {
            values: HugeArrayBuilder::new(node_count, default_value, tracker)?,
            default_value,
            key_id,
        })
    }

    /// Store key the column reads
    pub fn key_id(&self) -> KeyId {
        self.key_id
    }

    /// Value reported for nodes without the property
    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    /// Write the value of node `dense_id`
    #[inline]
    pub fn set(&self, dense_id: u64, value: f64) -> Result<()> {
        self.values.set(dense_id, value)
    }

    /// Freeze into a read-only column
    pub fn build(self) -> ArrayPropertyMap {
        ArrayPropertyMap::new(self.values.build(), self.default_value)
    }
}
