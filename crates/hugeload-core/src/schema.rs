//! Graph schema - labels and property columns of a loaded graph

use crate::Result;
use crate::dimensions::ResolvedProperty;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Value type of a property column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// 64-bit floating point
    Double,
}

/// Description of one property column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Type of the stored values
    pub value_type: ValueType,
    /// Value of nodes without the property
    pub default_value: f64,
    /// Whether the store knew the property key
    pub resolved: bool,
}

/// Schema of an imported graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSchema {
    /// Labels used to select the nodes; empty when every node was selected
    pub node_labels: BTreeSet<String>,
    /// Property columns by name
    pub node_properties: BTreeMap<String, PropertySchema>,
}

impl GraphSchema {
    /// Schema of an import selecting `labels` and loading `properties`
    pub fn from_import(labels: &[String], properties: &[ResolvedProperty]) -> Self {
        Self {
            node_labels: labels.iter().cloned().collect(),
            node_properties: properties
                .iter()
                .map(|p| {
                    (
                        p.name.clone(),
                        PropertySchema {
                            value_type: ValueType::Double,
                            default_value: p.default_value,
                            resolved: p.key_id.is_some(),
                        },
                    )
                })
                .collect(),
        }
    }

    /// Column `name`
    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        self.node_properties.get(name)
    }

    /// Combine two schemas; entries of `other` win on conflicting names
    pub fn union(&self, other: &GraphSchema) -> GraphSchema {
        let mut merged = self.clone();
        merged.node_labels.extend(other.node_labels.iter().cloned());
        merged.node_properties.extend(
            other
                .node_properties
                .iter()
                .map(|(name, schema)| (name.clone(), schema.clone())),
        );
        merged
    }

    /// Keep only the columns named in `names`
    pub fn filter_properties(&self, names: &[&str]) -> GraphSchema {
        GraphSchema {
            node_labels: self.node_labels.clone(),
            node_properties: self
                .node_properties
                .iter()
                .filter(|(name, _)| names.contains(&name.as_str()))
                .map(|(name, schema)| (name.clone(), schema.clone()))
                .collect(),
        }
    }

    /// Pretty-printed JSON form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(name: &str, default_value: f64, key_id: Option<u32>) -> ResolvedProperty {
        ResolvedProperty {
            name: name.to_string(),
            default_value,
            key_id,
        }
    }

    #[test]
    fn test_schema_from_import() {
        let schema = GraphSchema::from_import(
            &["Person".to_string()],
            &[resolved("weight", 1.0, Some(0)), resolved("age", 0.0, None)],
        );
        assert!(schema.node_labels.contains("Person"));
        assert!(schema.property("weight").unwrap().resolved);
        assert!(!schema.property("age").unwrap().resolved);
    }

    #[test]
    fn test_union_and_filter() {
        let a = GraphSchema::from_import(&["A".to_string()], &[resolved("x", 1.0, Some(0))]);
        let b = GraphSchema::from_import(
            &["B".to_string()],
            &[resolved("x", 2.0, Some(1)), resolved("y", 3.0, None)],
        );
        let merged = a.union(&b);
        assert_eq!(merged.node_labels.len(), 2);
        assert_eq!(merged.property("x").unwrap().default_value, 2.0);
        assert_eq!(merged.node_properties.len(), 2);

        let only_y = merged.filter_properties(&["y", "z"]);
        assert_eq!(only_y.node_properties.len(), 1);
        assert!(only_y.property("y").is_some());
    }

    #[test]
    fn test_schema_json() {
        let schema = GraphSchema::from_import(&[], &[resolved("weight", 1.5, Some(0))]);
        let json = schema.to_json().unwrap();
        assert!(json.contains("\"value_type\": \"double\""));
        let parsed: GraphSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, schema);
    }
}
