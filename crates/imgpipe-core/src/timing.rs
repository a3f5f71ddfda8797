//! Estimates of how long the backend needs before variants are worth asking for.
//!
//! The backend exposes no progress signal, so the first poll waits a blind,
//! size-based interval. The estimate sits behind [`DelayEstimator`] so it can
//! be swapped out if a real status endpoint appears.

use std::time::Duration;

const MIB: u64 = 1024 * 1024;

/// Picks the wait before the first processed-images query.
pub trait DelayEstimator: Send + Sync {
    fn initial_delay(&self, file_size: u64) -> Duration;
}

/// Three tiers observed against the production backend:
/// under 1 MiB, under 10 MiB, and everything larger.
#[derive(Debug, Clone)]
pub struct SizeTieredDelay {
    pub small: Duration,
    pub medium: Duration,
    pub large: Duration,
}

impl Default for SizeTieredDelay {
    fn default() -> Self {
        Self {
            small: Duration::from_millis(2000),
            medium: Duration::from_millis(4000),
            large: Duration::from_millis(6000),
        }
    }
}

impl DelayEstimator for SizeTieredDelay {
    fn initial_delay(&self, file_size: u64) -> Duration {
        if file_size < MIB {
            self.small
        } else if file_size < 10 * MIB {
            self.medium
        } else {
            self.large
        }
    }
}
