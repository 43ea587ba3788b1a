//! Node property maps - one column of `f64` values per requested property
//!
//! Values are keyed by dense id. A property whose key the store never saw
//! gets a [`ConstantPropertyMap`] that allocates nothing.

mod builder;

pub use builder::NodePropertiesBuilder;

use crate::paged::HugeArray;

/// Read access to one node property column
pub trait NodePropertyValues: Send + Sync {
    /// Value for `dense_id`; the default where the node has no value
    fn value_at(&self, dense_id: u64) -> f64;

    /// Value reported for nodes without the property
    fn default_value(&self) -> f64;
}

/// Property column backed by a paged array
#[derive(Debug)]
pub struct ArrayPropertyMap {
    values: HugeArray<f64>,
    default_value: f64,
}

impl ArrayPropertyMap {
    /// Wrap `values` as a property column
    pub fn new(values: HugeArray<f64>, default_value: f64) -> Self {
        Self {
            values,
            default_value,
        }
    }

    /// Number of nodes covered
    pub fn size(&self) -> u64 {
        self.values.size()
    }

    /// Underlying values
    pub fn values(&self) -> &HugeArray<f64> {
        &self.values
    }
}

impl NodePropertyValues for ArrayPropertyMap {
    /// Ids past the end read as the default
    #[inline]
    fn value_at(&self, dense_id: u64) -> f64 {
        if dense_id < self.values.size() {
            self.values.get(dense_id)
        } else {
            self.default_value
        }
    }

    fn default_value(&self) -> f64 {
        self.default_value
    }
}

/// Property column returning the default for every node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantPropertyMap {
    default_value: f64,
}

impl ConstantPropertyMap {
    /// Create a constant column
    pub fn new(default_value: f64) -> Self {
        Self { default_value }
    }
}

impl NodePropertyValues for ConstantPropertyMap {
    #[inline]
    fn value_at(&self, _dense_id: u64) -> f64 {
        self.default_value
    }

    fn default_value(&self) -> f64 {
        self.default_value
    }
}

/// A materialized or constant property column
#[derive(Debug)]
pub enum PropertyMap {
    /// Values read from the store
    Array(ArrayPropertyMap),
    /// Unresolved key: every node reads the default
    Constant(ConstantPropertyMap),
}

impl PropertyMap {
    /// Whether no values were materialized for this column
    pub fn is_constant(&self) -> bool {
        matches!(self, PropertyMap::Constant(_))
    }

    /// Bytes held by the column
    pub fn memory_bytes(&self) -> u64 {
        match self {
            PropertyMap::Array(map) => map.values.memory_bytes(),
            PropertyMap::Constant(_) => 0,
        }
    }
}

impl NodePropertyValues for PropertyMap {
    #[inline]
    fn value_at(&self, dense_id: u64) -> f64 {
        match self {
            PropertyMap::Array(map) => map.value_at(dense_id),
            PropertyMap::Constant(map) => map.value_at(dense_id),
        }
    }

    fn default_value(&self) -> f64 {
        match self {
            PropertyMap::Array(map) => map.default_value(),
            PropertyMap::Constant(map) => map.default_value(),
        }
    }
}

impl From<ArrayPropertyMap> for PropertyMap {
    fn from(map: ArrayPropertyMap) -> Self {
        PropertyMap::Array(map)
    }
}

impl From<ConstantPropertyMap> for PropertyMap {
    fn from(map: ConstantPropertyMap) -> Self {
        PropertyMap::Constant(map)
    }
}

/// Property columns by name, in the order they were requested
#[derive(Debug, Default)]
pub struct PropertyMaps {
    entries: Vec<(String, PropertyMap)>,
}

impl PropertyMaps {
    /// Create an empty set of columns
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the column `name`
    pub fn insert(&mut self, name: impl Into<String>, map: impl Into<PropertyMap>) {
        let name = name.into();
        let map = map.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = map,
            None => self.entries.push((name, map)),
        }
    }

    /// Column `name`
    pub fn get(&self, name: &str) -> Option<&PropertyMap> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, map)| map)
    }

    /// Column names in request order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// `(name, column)` pairs in request order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyMap)> {
        self.entries.iter().map(|(n, m)| (n.as_str(), m))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no columns
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes held by all columns
    pub fn memory_bytes(&self) -> u64 {
        self.entries.iter().map(|(_, m)| m.memory_bytes()).sum()
    }
}
