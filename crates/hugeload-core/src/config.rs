//! Loader configuration
//!
//! Priority: environment variables > config file > defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

/// Environment variable overriding [`LoaderConfig::concurrency`]
pub const ENV_CONCURRENCY: &str = "HUGELOAD_CONCURRENCY";
/// Environment variable overriding [`LoaderConfig::memory_limit_bytes`]
pub const ENV_MEMORY_LIMIT: &str = "HUGELOAD_MEMORY_LIMIT";
/// Environment variable overriding [`LoaderConfig::id_assignment`]
pub const ENV_ID_ASSIGNMENT: &str = "HUGELOAD_ID_ASSIGNMENT";

/// A node property to materialize, with the value used where it is absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMapping {
    /// Property name in the store
    pub name: String,
    /// Value reported for nodes without the property
    #[serde(default)]
    pub default_value: f64,
}

impl PropertyMapping {
    /// Create a property mapping
    pub fn new(name: impl Into<String>, default_value: f64) -> Self {
        Self {
            name: name.into(),
            default_value,
        }
    }
}

impl FromStr for PropertyMapping {
    type Err = Error;

    /// Parse `name` or `name=default`
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('=') {
            None if !s.trim().is_empty() => Ok(Self::new(s.trim(), 0.0)),
            Some((name, default)) if !name.trim().is_empty() => {
                let default_value = default.trim().parse::<f64>().map_err(|e| {
                    Error::config(format!("invalid default for property '{}': {}", name, e))
                })?;
                Ok(Self::new(name.trim(), default_value))
            }
            _ => Err(Error::config(format!("invalid property mapping '{}'", s))),
        }
    }
}

/// How dense ids are handed out during the scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdAssignment {
    /// Each partition owns a contiguous dense range computed while sizing.
    /// Deterministic for a fixed partitioning.
    #[default]
    Reserved,
    /// One shared atomic counter. Only the bijection is guaranteed, not the
    /// order of dense ids.
    SharedCounter,
}

impl FromStr for IdAssignment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reserved" => Ok(Self::Reserved),
            "shared-counter" | "shared_counter" | "counter" => Ok(Self::SharedCounter),
            other => Err(Error::config(format!("unknown id assignment '{}'", other))),
        }
    }
}

/// Bulk import configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Number of partitions scanned in parallel
    pub concurrency: usize,
    /// Labels selecting qualifying nodes; empty selects every node
    pub node_labels: Vec<String>,
    /// Properties to materialize, in output order
    pub property_mappings: Vec<PropertyMapping>,
    /// Dense id assignment strategy
    pub id_assignment: IdAssignment,
    /// Records a worker processes between progress reports
    pub progress_batch_size: u64,
    /// Upper bound on bytes allocated by builders
    pub memory_limit_bytes: Option<u64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            node_labels: Vec::new(),
            property_mappings: Vec::new(),
            id_assignment: IdAssignment::Reserved,
            progress_batch_size: 10_000,
            memory_limit_bytes: None,
        }
    }
}

impl LoaderConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the partition count
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Restrict the import to nodes carrying one of `labels`
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Add a property to materialize
    pub fn with_property(mut self, name: impl Into<String>, default_value: f64) -> Self {
        self.property_mappings
            .push(PropertyMapping::new(name, default_value));
        self
    }

    /// Set the dense id assignment strategy
    pub fn with_id_assignment(mut self, id_assignment: IdAssignment) -> Self {
        self.id_assignment = id_assignment;
        self
    }

    /// Set the progress batch size
    pub fn with_progress_batch_size(mut self, batch: u64) -> Self {
        self.progress_batch_size = batch;
        self
    }

    /// Cap the bytes builders may allocate
    pub fn with_memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit_bytes = Some(bytes);
        self
    }

    /// Check the invariants the importer relies on
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::config("concurrency must be at least 1"));
        }
        if self.progress_batch_size == 0 {
            return Err(Error::config("progress_batch_size must be at least 1"));
        }
        let mut seen = HashSet::new();
        for mapping in &self.property_mappings {
            if mapping.name.is_empty() {
                return Err(Error::config("property name must not be empty"));
            }
            if !seen.insert(mapping.name.as_str()) {
                return Err(Error::config(format!(
                    "property '{}' is mapped more than once",
                    mapping.name
                )));
            }
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LoaderConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!("Loaded loader configuration from {:?}", path);
        Ok(config)
    }

    /// Apply overrides from `lookup`, typically the process environment
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup(ENV_CONCURRENCY) {
            self.concurrency = value.trim().parse().map_err(|e| {
                Error::config(format!("invalid {}='{}': {}", ENV_CONCURRENCY, value, e))
            })?;
        }
        if let Some(value) = lookup(ENV_MEMORY_LIMIT) {
            let bytes = value.trim().parse().map_err(|e| {
                Error::config(format!("invalid {}='{}': {}", ENV_MEMORY_LIMIT, value, e))
            })?;
            self.memory_limit_bytes = Some(bytes);
        }
        if let Some(value) = lookup(ENV_ID_ASSIGNMENT) {
            self.id_assignment = value.parse()?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Load configuration from an optional file, then environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }
}
