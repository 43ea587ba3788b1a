//! In-memory record store
//!
//! Holds records sorted by original id and cut into fixed-size pages, the way
//! a node store lays records out by id. Used by tests, benchmarks and the CLI.

use super::{KeyId, LabelId, NodeFilter, PropertyValue, Record, RecordStore};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

/// Default number of records per store page
pub const DEFAULT_RECORDS_PER_PAGE: usize = 8192;

/// Node data in the JSON input format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    /// Node ID (optional, generated after the highest explicit id if absent)
    #[serde(default)]
    pub id: Option<u64>,
    /// Node labels
    #[serde(default)]
    pub labels: Vec<String>,
    /// Node properties
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

/// Builder for [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryStoreBuilder {
    records_per_page: usize,
    labels: HashMap<String, LabelId>,
    keys: HashMap<String, KeyId>,
    records: Vec<Record>,
}

impl Default for MemoryStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self {
            records_per_page: DEFAULT_RECORDS_PER_PAGE,
            labels: HashMap::new(),
            keys: HashMap::new(),
            records: Vec::new(),
        }
    }

    /// Number of records per page (at least 1)
    pub fn records_per_page(mut self, records_per_page: usize) -> Self {
        self.records_per_page = records_per_page.max(1);
        self
    }

    /// Intern a label name
    pub fn label(&mut self, name: &str) -> LabelId {
        let next = self.labels.len() as LabelId;
        *self.labels.entry(name.to_string()).or_insert(next)
    }

    /// Intern a property key name
    pub fn property_key(&mut self, name: &str) -> KeyId {
        let next = self.keys.len() as KeyId;
        *self.keys.entry(name.to_string()).or_insert(next)
    }

    /// Add a node with the given labels and properties
    pub fn add_node(
        &mut self,
        original_id: u64,
        labels: &[&str],
        properties: &[(&str, PropertyValue)],
    ) -> &mut Self {
        let labels = labels.iter().map(|l| self.label(l)).collect();
        let properties = properties
            .iter()
            .map(|(name, value)| (self.property_key(name), value.clone()))
            .collect();
        self.records.push(Record {
            original_id,
            labels,
            properties,
        });
        self
    }

    /// Finish the store; records are ordered by original id
    pub fn build(mut self) -> MemoryStore {
        self.records.sort_by_key(|r| r.original_id);
        let pages = self
            .records
            .chunks(self.records_per_page)
            .map(|chunk| chunk.to_vec())
            .collect();
        MemoryStore {
            pages,
            labels: self.labels,
            keys: self.keys,
        }
    }
}

/// Read-only store backed by vectors of records
#[derive(Debug, Clone)]
pub struct MemoryStore {
    pages: Vec<Vec<Record>>,
    labels: HashMap<String, LabelId>,
    keys: HashMap<String, KeyId>,
}

impl MemoryStore {
    /// Start building a store
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::new()
    }

    /// Total number of records
    pub fn record_count(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    /// Number of records carrying at least one of `label_names`, or all
    /// records when the list is empty. Unknown labels match nothing.
    pub fn qualifying_count(&self, label_names: &[String]) -> usize {
        if label_names.is_empty() {
            return self.record_count();
        }
        let filter = NodeFilter::AnyLabel(
            label_names
                .iter()
                .filter_map(|name| self.labels.get(name).copied())
                .collect(),
        );
        self.pages
            .iter()
            .flatten()
            .filter(|record| record.qualifies(&filter))
            .count()
    }

    /// Build a store from JSON text: either an array of nodes or an object
    /// with a `nodes` array
    pub fn from_json_nodes(json: &str, records_per_page: usize) -> Result<Self> {
        let data: serde_json::Value = serde_json::from_str(json)?;
        let nodes = match data {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(mut map) => match map.remove("nodes") {
                Some(serde_json::Value::Array(items)) => items,
                _ => return Err(Error::store("JSON input has no 'nodes' array")),
            },
            _ => return Err(Error::store("JSON input must be an array or an object")),
        };
        let nodes = nodes
            .into_iter()
            .map(serde_json::from_value::<NodeData>)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Self::from_nodes(nodes, records_per_page)
    }

    /// Build a store from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>, records_per_page: usize) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_nodes(&content, records_per_page)
    }

    /// Build a store from parsed node data
    pub fn from_nodes(nodes: Vec<NodeData>, records_per_page: usize) -> Result<Self> {
        let mut builder = MemoryStoreBuilder::new().records_per_page(records_per_page);
        let mut next_id = nodes
            .iter()
            .filter_map(|n| n.id)
            .max()
            .map_or(0, |highest| highest + 1);

        for node in nodes {
            let original_id = match node.id {
                Some(id) => id,
                None => {
                    let id = next_id;
                    next_id += 1;
                    id
                }
            };
            let labels: Vec<&str> = node.labels.iter().map(String::as_str).collect();
            let mut properties = Vec::with_capacity(node.properties.len());
            for (name, value) in &node.properties {
                properties.push((name.as_str(), json_to_property(original_id, name, value)?));
            }
            builder.add_node(original_id, &labels, &properties);
        }
        Ok(builder.build())
    }
}

fn json_to_property(original_id: u64, name: &str, value: &serde_json::Value) -> Result<PropertyValue> {
    Ok(match value {
        serde_json::Value::Null => PropertyValue::Null,
        serde_json::Value::Bool(b) => PropertyValue::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                PropertyValue::Int64(i)
            } else if let Some(f) = n.as_f64() {
                PropertyValue::Float64(f)
            } else {
                return Err(Error::decode(original_id, name, format!("number {} out of range", n)));
            }
        }
        serde_json::Value::String(s) => PropertyValue::String(s.clone()),
        other => PropertyValue::String(other.to_string()),
    })
}

impl RecordStore for MemoryStore {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn read_page(&self, page: usize) -> Result<Cow<'_, [Record]>> {
        self.pages
            .get(page)
            .map(|records| Cow::Borrowed(records.as_slice()))
            .ok_or_else(|| {
                Error::store(format!(
                    "page {} out of range ({} pages)",
                    page,
                    self.pages.len()
                ))
            })
    }

    fn resolve_property_key(&self, name: &str) -> Option<KeyId> {
        self.keys.get(name).copied()
    }

    fn resolve_label(&self, name: &str) -> Option<LabelId> {
        self.labels.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NodeFilter;

    #[test]
    fn test_builder_pages_records_by_id() {
        let mut builder = MemoryStore::builder().records_per_page(2);
        builder
            .add_node(10, &["Person"], &[])
            .add_node(0, &["Person"], &[])
            .add_node(5, &["Person"], &[("weight", PropertyValue::Float64(7.5))]);
        let store = builder.build();

        assert_eq!(store.page_count(), 2);
        assert_eq!(store.record_count(), 3);
        let first = store.read_page(0).unwrap();
        assert_eq!(first.iter().map(|r| r.original_id).collect::<Vec<_>>(), vec![0, 5]);
        assert_eq!(store.read_page(1).unwrap()[0].original_id, 10);
        assert!(store.read_page(2).is_err());
        assert_eq!(store.resolve_property_key("weight"), Some(0));
        assert_eq!(store.resolve_property_key("age"), None);
    }

    #[test]
    fn test_from_json_nodes() {
        let json = r#"{
            "nodes": [
                {"id": 3, "labels": ["City"], "properties": {"population": 1200}},
                {"labels": ["City"], "properties": {"population": 2.5, "name": "x"}},
                {"id": 1, "labels": ["Road"]}
            ]
        }"#;
        let store = MemoryStore::from_json_nodes(json, 16).unwrap();
        assert_eq!(store.record_count(), 3);

        let page = store.read_page(0).unwrap();
        let ids: Vec<u64> = page.iter().map(|r| r.original_id).collect();
        assert_eq!(ids, vec![1, 3, 4]);

        let key = store.resolve_property_key("population").unwrap();
        assert_eq!(page[1].property(key), Some(&PropertyValue::Int64(1200)));
        assert_eq!(page[2].property(key), Some(&PropertyValue::Float64(2.5)));

        let filter = NodeFilter::resolve(&store, &["Road".to_string()]);
        assert!(page[0].qualifies(&filter));
        assert!(!page[1].qualifies(&filter));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(MemoryStore::from_json_nodes("42", 4).is_err());
        assert!(MemoryStore::from_json_nodes("{\"edges\": []}", 4).is_err());
        assert!(MemoryStore::from_json_nodes("not json", 4).is_err());
    }

    #[test]
    fn test_unknown_labels_select_nothing() {
        let mut builder = MemoryStore::builder();
        builder.add_node(1, &["A"], &[]);
        let store = builder.build();
        assert_eq!(NodeFilter::resolve(&store, &[]), NodeFilter::All);
        assert_eq!(
            NodeFilter::resolve(&store, &["B".to_string()]),
            NodeFilter::Nothing
        );
        assert_eq!(
            NodeFilter::resolve(&store, &["B".to_string(), "A".to_string()]),
            NodeFilter::AnyLabel(vec![0])
        );
    }

    #[test]
    fn test_qualifying_count() {
        let mut builder = MemoryStore::builder();
        builder
            .add_node(1, &["A"], &[])
            .add_node(2, &["B"], &[])
            .add_node(3, &["A", "B"], &[]);
        let store = builder.build();
        assert_eq!(store.qualifying_count(&[]), 3);
        assert_eq!(store.qualifying_count(&["A".to_string()]), 2);
        assert_eq!(store.qualifying_count(&["C".to_string()]), 0);
    }
}
