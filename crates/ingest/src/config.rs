use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning for one ingestion run, passed into each pipeline component
/// instead of read from ambient state so tests stay deterministic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestConfig {
    /// Recent posts kept in each snapshot.
    pub post_limit: usize,

    /// Over-fetch multiplier for the view-count sample. Very recent posts
    /// often carry no view count yet, so the average is computed over a
    /// larger window than the snapshot keeps.
    pub post_sample_factor: usize,

    /// Base pause between job submissions (ms).
    pub pace_base_ms: u64,

    /// Upper bound of the random pacing jitter added to the base (ms).
    pub pace_jitter_ms: u64,

    /// Jitter window added to platform-mandated flood waits (ms).
    pub flood_jitter_min_ms: u64,
    pub flood_jitter_max_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            post_limit: 10,
            post_sample_factor: 3,
            pace_base_ms: 15_000,
            pace_jitter_ms: 5_000,
            flood_jitter_min_ms: 1_000,
            flood_jitter_max_ms: 2_000,
        }
    }
}

impl IngestConfig {
    /// Size of the post sample the view-count average is computed over.
    #[must_use]
    pub fn sample_size(&self) -> usize {
        self.post_limit * self.post_sample_factor
    }

    #[must_use]
    pub fn pace_base(&self) -> Duration {
        Duration::from_millis(self.pace_base_ms)
    }

    #[must_use]
    pub fn pace_jitter(&self) -> Duration {
        Duration::from_millis(self.pace_jitter_ms)
    }

    #[must_use]
    pub fn flood_jitter_min(&self) -> Duration {
        Duration::from_millis(self.flood_jitter_min_ms)
    }

    #[must_use]
    pub fn flood_jitter_max(&self) -> Duration {
        Duration::from_millis(self.flood_jitter_max_ms)
    }
}
