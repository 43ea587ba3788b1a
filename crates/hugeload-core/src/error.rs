//! Error types for Hugeload Core

use thiserror::Error;

/// Result type alias using Hugeload Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the bulk loading pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors from reading configuration or input files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record store failed to deliver a page
    #[error("Store error: {0}")]
    Store(String),

    /// A record value could not be decoded into the requested representation
    #[error("Decode error for node {original_id}, property '{property}': {reason}")]
    Decode {
        /// Original id of the offending record
        original_id: u64,
        /// Property name being decoded
        property: String,
        /// What went wrong
        reason: String,
    },

    /// Invalid or unparseable loader configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The same original id was mapped twice
    #[error("Duplicate original id {original_id}: already mapped to dense id {existing}")]
    DuplicateOriginalId {
        /// Original id seen twice
        original_id: u64,
        /// Dense id assigned on the first sighting
        existing: u64,
    },

    /// Partitioning or sizing produced ids outside the sized dimensions
    #[error("Invariant violation at node {original_id}: {message}")]
    InvariantViolation {
        /// Original id of the record being imported when the check failed
        original_id: u64,
        /// Description of the broken invariant
        message: String,
    },

    /// Allocation would exceed the configured memory limit
    #[error(
        "Allocation of {requested} bytes exceeds memory limit of {limit} bytes ({tracked} bytes already tracked)"
    )]
    AllocationExhausted {
        /// Bytes requested by the failing allocation
        requested: u64,
        /// Configured limit
        limit: u64,
        /// Bytes tracked before the request
        tracked: u64,
    },

    /// The allocator refused a reservation, or its size cannot be addressed
    #[error("Failed to allocate {requested} bytes ({tracked} bytes already tracked)")]
    AllocationFailed {
        /// Bytes requested by the failing allocation
        requested: u64,
        /// Bytes tracked before the request
        tracked: u64,
    },

    /// The import was cancelled because a sibling partition failed
    #[error("Import cancelled")]
    Cancelled,

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a decode error
    pub fn decode(original_id: u64, property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            original_id,
            property: property.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invariant violation error
    pub fn invariant(original_id: u64, msg: impl Into<String>) -> Self {
        Self::InvariantViolation {
            original_id,
            message: msg.into(),
        }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is the cancellation echo of another failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(format!("invalid JSON input: {}", err))
    }
}
