//! Daily-growth computation and the snapshot write path.

use std::sync::Arc;

use {
    chrono::{DateTime, Utc},
    tracing::info,
};

use statgram_store::{ChannelStats, StatsStore};

use crate::{error::Result, snapshot::ChannelSnapshot};

/// Derives the growth sample for a fresh snapshot and persists both the
/// updated channel record and the appended stats row.
///
/// Growth is recomputed at most once per calendar day: a second run on the
/// same date republishes the morning's growth value instead of deriving a
/// misleading partial-day delta. The comparison is on calendar dates, not a
/// rolling 24 h window, so a run just after midnight treats the previous
/// run as yesterday.
pub struct StatsAggregator {
    store: Arc<dyn StatsStore>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn StatsStore>) -> Self {
        Self { store }
    }

    pub async fn apply(&self, snapshot: &ChannelSnapshot) -> Result<ChannelStats> {
        self.apply_at(snapshot, Utc::now()).await
    }

    /// `apply` with an explicit clock, the unit tests' entry point.
    pub async fn apply_at(
        &self,
        snapshot: &ChannelSnapshot,
        now: DateTime<Utc>,
    ) -> Result<ChannelStats> {
        let last = self.store.last_stats_for(snapshot.channel_id).await?;
        let participants = snapshot.participants.unwrap_or(0);
        let stats = ChannelStats {
            channel_id: snapshot.channel_id,
            participants,
            daily_growth: daily_growth(participants, last.as_ref(), now),
            recorded_at: now,
        };

        // Record first: a stats row must never exist without its record
        // update. A failure here fails the job and the next run redoes both.
        let record = snapshot.clone().into_record(now);
        self.store.upsert_record(&record).await?;
        self.store.append_stats(&stats).await?;

        info!(
            channel = %record.title,
            channel_id = stats.channel_id,
            participants = stats.participants,
            daily_growth = stats.daily_growth,
            "channel stats recorded"
        );
        Ok(stats)
    }
}

fn daily_growth(current: i64, last: Option<&ChannelStats>, now: DateTime<Utc>) -> i64 {
    match last {
        None => 0,
        Some(last) if last.recorded_at.date_naive() != now.date_naive() => {
            current - last.participants
        },
        Some(last) => last.daily_growth,
    }
}
