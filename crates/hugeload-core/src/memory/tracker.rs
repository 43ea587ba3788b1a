//! Allocation tracking
//!
//! Every page allocated by a paged array is reported here. The counter is a
//! relaxed atomic: it only feeds diagnostics and the optional memory limit,
//! never the correctness of the import.

use crate::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};

/// Running total of bytes allocated by builders
#[derive(Debug, Default)]
pub struct AllocationTracker {
    allocated: AtomicU64,
    limit: Option<u64>,
}

impl AllocationTracker {
    /// Create a tracker without a limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker that refuses allocations beyond `limit` bytes
    pub fn with_limit(limit: u64) -> Self {
        Self {
            allocated: AtomicU64::new(0),
            limit: Some(limit),
        }
    }

    /// Configured limit, if any
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Bytes tracked so far
    pub fn tracked(&self) -> u64 {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Reserve `bytes`, failing if the limit would be exceeded
    pub fn try_add(&self, bytes: u64) -> Result<()> {
        let Some(limit) = self.limit else {
            self.allocated.fetch_add(bytes, Ordering::Relaxed);
            return Ok(());
        };

        let mut current = self.allocated.load(Ordering::Relaxed);
        loop {
            let next = current.saturating_add(bytes);
            if next > limit {
                return Err(Error::AllocationExhausted {
                    requested: bytes,
                    limit,
                    tracked: current,
                });
            }
            match self.allocated.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    /// Give back `bytes` previously reserved
    pub fn remove(&self, bytes: u64) {
        self.allocated.fetch_sub(bytes, Ordering::Relaxed);
    }

    /// Check that `bytes` more would fit without reserving them
    pub fn check_headroom(&self, bytes: u64) -> Result<()> {
        if let Some(limit) = self.limit {
            let tracked = self.tracked();
            if tracked.saturating_add(bytes) > limit {
                return Err(Error::AllocationExhausted {
                    requested: bytes,
                    limit,
                    tracked,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_tracker_accumulates() {
        let tracker = AllocationTracker::new();
        tracker.try_add(100).unwrap();
        tracker.try_add(28).unwrap();
        assert_eq!(tracker.tracked(), 128);
        tracker.remove(28);
        assert_eq!(tracker.tracked(), 100);
    }

    #[test]
    fn test_tracker_limit() {
        let tracker = AllocationTracker::with_limit(1000);
        tracker.try_add(900).unwrap();

        let err = tracker.try_add(200).unwrap_err();
        match err {
            Error::AllocationExhausted {
                requested,
                limit,
                tracked,
            } => {
                assert_eq!(requested, 200);
                assert_eq!(limit, 1000);
                assert_eq!(tracked, 900);
            }
            other => panic!("unexpected error: {other}"),
        }
        // A refused request leaves the total untouched
        assert_eq!(tracker.tracked(), 900);
        assert!(tracker.check_headroom(100).is_ok());
        assert!(tracker.check_headroom(101).is_err());
    }

    #[test]
    fn test_tracker_concurrent_adds() {
        let tracker = Arc::new(AllocationTracker::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tracker = tracker.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        tracker.try_add(8).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tracker.tracked(), 4 * 1000 * 8);
    }
}
