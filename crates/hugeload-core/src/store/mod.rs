//! Record store contract
//!
//! The loader reads from an external, read-only, paged store. Pages are
//! random-access by index, so disjoint page ranges can be scanned by
//! different workers without coordination.

mod memory;

pub use memory::{MemoryStore, MemoryStoreBuilder, NodeData};

use crate::Result;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Label ID type
pub type LabelId = u32;

/// Property key ID
pub type KeyId = u32;

/// Property value as stored in the external store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// Null value, treated as absent
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit integer value
    Int64(i64),
    /// 64-bit floating point value
    Float64(f64),
    /// String value
    String(String),
}

impl PropertyValue {
    /// Numeric view of this value.
    ///
    /// `Ok(None)` for null, `Err` with the type name for non-numeric values.
    pub fn as_f64(&self) -> std::result::Result<Option<f64>, &'static str> {
        match self {
            PropertyValue::Null => Ok(None),
            PropertyValue::Int64(v) => Ok(Some(*v as f64)),
            PropertyValue::Float64(v) => Ok(Some(*v)),
            PropertyValue::Bool(_) => Err("boolean"),
            PropertyValue::String(_) => Err("string"),
        }
    }
}

/// A node record as read from the store
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Identifier assigned by the store
    pub original_id: u64,
    /// Labels carried by the node
    pub labels: Vec<LabelId>,
    /// Property values keyed by property key id
    pub properties: Vec<(KeyId, PropertyValue)>,
}

impl Record {
    /// Whether this record passes `filter`
    #[inline]
    pub fn qualifies(&self, filter: &NodeFilter) -> bool {
        match filter {
            NodeFilter::All => true,
            NodeFilter::AnyLabel(wanted) => self.labels.iter().any(|l| wanted.contains(l)),
            NodeFilter::Nothing => false,
        }
    }

    /// Value of property `key`, if the record carries it
    #[inline]
    pub fn property(&self, key: KeyId) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

/// Which records take part in the import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeFilter {
    /// Every record qualifies
    #[default]
    All,
    /// Records carrying at least one of the labels qualify
    AnyLabel(Vec<LabelId>),
    /// No record qualifies (the requested labels are unknown to the store)
    Nothing,
}

impl NodeFilter {
    /// Resolve label names against `store`.
    ///
    /// An empty list selects every record. Unknown names are dropped; when
    /// none of the names resolve, nothing qualifies.
    pub fn resolve<S: RecordStore + ?Sized>(store: &S, label_names: &[String]) -> Self {
        if label_names.is_empty() {
            return NodeFilter::All;
        }
        let mut labels = Vec::with_capacity(label_names.len());
        for name in label_names {
            match store.resolve_label(name) {
                Some(id) => labels.push(id),
                None => tracing::warn!("Label '{}' is not known to the store, ignoring it", name),
            }
        }
        if labels.is_empty() {
            NodeFilter::Nothing
        } else {
            NodeFilter::AnyLabel(labels)
        }
    }
}

/// Read-only, paged source of node records
pub trait RecordStore: Sync {
    /// Number of pages in the store
    fn page_count(&self) -> usize;

    /// Records stored in page `page`, in store order
    fn read_page(&self, page: usize) -> Result<Cow<'_, [Record]>>;

    /// Key id of property `name`, `None` when the store never saw it
    fn resolve_property_key(&self, name: &str) -> Option<KeyId>;

    /// Label id of `name`, `None` when the store never saw it
    fn resolve_label(&self, name: &str) -> Option<LabelId>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(labels: Vec<LabelId>) -> Record {
        Record {
            original_id: 1,
            labels,
            properties: vec![(0, PropertyValue::Float64(2.5)), (3, PropertyValue::Null)],
        }
    }

    #[test]
    fn test_record_filters() {
        let r = record(vec![1, 2]);
        assert!(r.qualifies(&NodeFilter::All));
        assert!(r.qualifies(&NodeFilter::AnyLabel(vec![2])));
        assert!(!r.qualifies(&NodeFilter::AnyLabel(vec![3])));
        assert!(!r.qualifies(&NodeFilter::Nothing));
    }

    #[test]
    fn test_record_property_lookup() {
        let r = record(vec![]);
        assert_eq!(r.property(0), Some(&PropertyValue::Float64(2.5)));
        assert_eq!(r.property(1), None);
    }

    #[test]
    fn test_numeric_conversion() {
        assert_eq!(PropertyValue::Int64(3).as_f64(), Ok(Some(3.0)));
        assert_eq!(PropertyValue::Float64(0.5).as_f64(), Ok(Some(0.5)));
        assert_eq!(PropertyValue::Null.as_f64(), Ok(None));
        assert_eq!(PropertyValue::Bool(true).as_f64(), Err("boolean"));
        assert_eq!(PropertyValue::String("x".into()).as_f64(), Err("string"));
    }
}
