//! Persistence for channel records and growth stats.
//!
//! The ingestion pipeline touches storage through exactly three operations
//! ([`StatsStore`]); the tracked-channel set is a separate concern
//! ([`ChannelSet`]) so the pipeline never grows ad hoc queries.

pub mod memory;
pub mod sqlite;
pub mod types;

use {anyhow::Result, async_trait::async_trait};

use statgram_client::ChannelHandle;

pub use {
    memory::InMemoryStatsStore,
    sqlite::SqliteStatsStore,
    types::{ChannelRecord, ChannelStats, PinnedPost, StoredPost},
};

/// Snapshot and growth persistence.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Replace the channel's latest record (insert on first sight).
    async fn upsert_record(&self, record: &ChannelRecord) -> Result<()>;

    /// Append one growth sample.
    async fn append_stats(&self, stats: &ChannelStats) -> Result<()>;

    /// The most recent growth sample for a channel, if any.
    async fn last_stats_for(&self, channel_id: i64) -> Result<Option<ChannelStats>>;
}

/// The set of channels handed to a batch run.
#[async_trait]
pub trait ChannelSet: Send + Sync {
    async fn add(&self, handle: &ChannelHandle) -> Result<()>;

    async fn remove(&self, handle: &ChannelHandle) -> Result<()>;

    /// Tracked handles in the order they were added.
    async fn tracked(&self) -> Result<Vec<ChannelHandle>>;
}
