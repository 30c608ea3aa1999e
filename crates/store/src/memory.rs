//! In-memory store backed by `HashMap`. No persistence — for tests.

use std::{
    collections::HashMap,
    sync::Mutex,
};

use {
    anyhow::{Result, bail},
    async_trait::async_trait,
};

use statgram_client::ChannelHandle;

use crate::{
    ChannelSet, StatsStore,
    types::{ChannelRecord, ChannelStats},
};

#[derive(Default)]
pub struct InMemoryStatsStore {
    records: Mutex<HashMap<i64, ChannelRecord>>,
    stats: Mutex<HashMap<i64, Vec<ChannelStats>>>,
    tracked: Mutex<Vec<ChannelHandle>>,
}

impl InMemoryStatsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored record for a channel, if any.
    #[must_use]
    pub fn record(&self, channel_id: i64) -> Option<ChannelRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&channel_id)
            .cloned()
    }

    /// All stats rows appended for a channel, oldest first.
    #[must_use]
    pub fn stats_history(&self, channel_id: i64) -> Vec<ChannelStats> {
        self.stats
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&channel_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of persisted writes, across both tables.
    #[must_use]
    pub fn write_count(&self) -> usize {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner()).len();
        let stats: usize = self
            .stats
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(Vec::len)
            .sum();
        records + stats
    }
}

#[async_trait]
impl StatsStore for InMemoryStatsStore {
    async fn upsert_record(&self, record: &ChannelRecord) -> Result<()> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(record.channel_id, record.clone());
        Ok(())
    }

    async fn append_stats(&self, stats: &ChannelStats) -> Result<()> {
        let mut all = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        all.entry(stats.channel_id).or_default().push(stats.clone());
        Ok(())
    }

    async fn last_stats_for(&self, channel_id: i64) -> Result<Option<ChannelStats>> {
        let all = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        Ok(all
            .get(&channel_id)
            .and_then(|rows| rows.iter().max_by_key(|s| s.recorded_at))
            .cloned())
    }
}

#[async_trait]
impl ChannelSet for InMemoryStatsStore {
    async fn add(&self, handle: &ChannelHandle) -> Result<()> {
        let mut tracked = self.tracked.lock().unwrap_or_else(|e| e.into_inner());
        if !tracked.contains(handle) {
            tracked.push(handle.clone());
        }
        Ok(())
    }

    async fn remove(&self, handle: &ChannelHandle) -> Result<()> {
        let mut tracked = self.tracked.lock().unwrap_or_else(|e| e.into_inner());
        let before = tracked.len();
        tracked.retain(|h| h != handle);
        if tracked.len() == before {
            bail!("channel not tracked: {handle}");
        }
        Ok(())
    }

    async fn tracked(&self) -> Result<Vec<ChannelHandle>> {
        Ok(self
            .tracked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }
}
