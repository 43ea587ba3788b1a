//! Memory accounting for the import
//!
//! This module provides:
//! - A lock-free allocation tracker shared by every builder
//! - Up-front memory estimation for sized dimensions

pub mod estimate;
pub mod tracker;

pub use estimate::{MemoryEstimate, human_readable};
pub use tracker::AllocationTracker;
