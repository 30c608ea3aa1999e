//! SQLite-backed persistence using sqlx.

use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions},
};

use statgram_client::ChannelHandle;

use crate::{
    ChannelSet, StatsStore,
    types::{ChannelRecord, ChannelStats},
};

/// SQLite store for channel records, growth stats and the tracked set.
///
/// The latest record is kept as a JSON blob beside its key columns; stats
/// rows are relational so `last_stats_for` stays an indexed lookup.
pub struct SqliteStatsStore {
    pool: SqlitePool,
}

impl SqliteStatsStore {
    /// Connect with a dedicated pool and create the schema.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("failed to connect to SQLite")?;
        Self::init(&pool).await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool ([`SqliteStatsStore::init`] must have run).
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes. Idempotent.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS channels (
                channel_id INTEGER PRIMARY KEY,
                data       TEXT    NOT NULL,
                fetched_at INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS channel_stats (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                channel_id   INTEGER NOT NULL,
                participants INTEGER NOT NULL,
                daily_growth INTEGER NOT NULL,
                recorded_at  INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_channel_stats_channel_time
             ON channel_stats (channel_id, recorded_at)",
        )
        .execute(pool)
        .await?;
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS tracked_channels (
                handle   TEXT    PRIMARY KEY,
                added_at INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

fn from_timestamp_ms(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .with_context(|| format!("timestamp out of range: {ms}"))
}

#[async_trait]
impl StatsStore for SqliteStatsStore {
    async fn upsert_record(&self, record: &ChannelRecord) -> Result<()> {
        let data = serde_json::to_string(record)?;
        sqlx::query(
            "INSERT INTO channels (channel_id, data, fetched_at) VALUES (?, ?, ?)
             ON CONFLICT(channel_id) DO UPDATE SET
               data = excluded.data,
               fetched_at = excluded.fetched_at",
        )
        .bind(record.channel_id)
        .bind(&data)
        .bind(record.fetched_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_stats(&self, stats: &ChannelStats) -> Result<()> {
        sqlx::query(
            "INSERT INTO channel_stats (channel_id, participants, daily_growth, recorded_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(stats.channel_id)
        .bind(stats.participants)
        .bind(stats.daily_growth)
        .bind(stats.recorded_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn last_stats_for(&self, channel_id: i64) -> Result<Option<ChannelStats>> {
        let row = sqlx::query(
            "SELECT channel_id, participants, daily_growth, recorded_at
             FROM channel_stats
             WHERE channel_id = ?
             ORDER BY recorded_at DESC, id DESC
             LIMIT 1",
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(ChannelStats {
                channel_id: row.get("channel_id"),
                participants: row.get("participants"),
                daily_growth: row.get("daily_growth"),
                recorded_at: from_timestamp_ms(row.get("recorded_at"))?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl ChannelSet for SqliteStatsStore {
    async fn add(&self, handle: &ChannelHandle) -> Result<()> {
        sqlx::query(
            "INSERT INTO tracked_channels (handle, added_at) VALUES (?, ?)
             ON CONFLICT(handle) DO NOTHING",
        )
        .bind(handle.as_str())
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, handle: &ChannelHandle) -> Result<()> {
        let result = sqlx::query("DELETE FROM tracked_channels WHERE handle = ?")
            .bind(handle.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("channel not tracked: {handle}");
        }
        Ok(())
    }

    async fn tracked(&self) -> Result<Vec<ChannelHandle>> {
        let rows = sqlx::query("SELECT handle FROM tracked_channels ORDER BY added_at, handle")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| ChannelHandle::parse(row.get::<String, _>("handle").as_str()))
            .collect())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    async fn make_store() -> SqliteStatsStore {
        SqliteStatsStore::connect("sqlite::memory:").await.unwrap()
    }

    fn record(channel_id: i64, title: &str) -> ChannelRecord {
        ChannelRecord {
            channel_id,
            title: title.into(),
            username: Some(format!("user{channel_id}")),
            verified: false,
            created_at: None,
            description: Some("about".into()),
            participants: Some(500),
            pinned: None,
            recent_posts: Vec::new(),
            average_views: 0,
            fetched_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn stats(channel_id: i64, participants: i64, growth: i64, hour: u32) -> ChannelStats {
        ChannelStats {
            channel_id,
            participants,
            daily_growth: growth,
            recorded_at: Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn upsert_replaces_the_record() {
        let store = make_store().await;
        store.upsert_record(&record(1, "first")).await.unwrap();
        store.upsert_record(&record(1, "renamed")).await.unwrap();

        // one row, carrying the latest snapshot
        let row = sqlx::query("SELECT data FROM channels")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        let stored: ChannelRecord =
            serde_json::from_str(&row.get::<String, _>("data")).unwrap();
        assert_eq!(stored.title, "renamed");
    }

    #[tokio::test]
    async fn last_stats_returns_most_recent_row() {
        let store = make_store().await;
        store.append_stats(&stats(1, 100, 0, 8)).await.unwrap();
        store.append_stats(&stats(1, 130, 30, 20)).await.unwrap();
        store.append_stats(&stats(2, 9000, 0, 21)).await.unwrap();

        let last = store.last_stats_for(1).await.unwrap().unwrap();
        assert_eq!(last.participants, 130);
        assert_eq!(last.daily_growth, 30);
    }

    #[tokio::test]
    async fn last_stats_missing_channel_is_none() {
        let store = make_store().await;
        assert!(store.last_stats_for(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tracked_set_roundtrip() {
        let store = make_store().await;
        store.add(&ChannelHandle::parse("alpha")).await.unwrap();
        store.add(&ChannelHandle::parse("beta")).await.unwrap();
        // duplicate add is a no-op
        store.add(&ChannelHandle::parse("alpha")).await.unwrap();

        let tracked = store.tracked().await.unwrap();
        assert_eq!(tracked.len(), 2);

        store.remove(&ChannelHandle::parse("alpha")).await.unwrap();
        let tracked = store.tracked().await.unwrap();
        assert_eq!(tracked, vec![ChannelHandle::parse("beta")]);
    }

    #[tokio::test]
    async fn remove_untracked_fails() {
        let store = make_store().await;
        assert!(store.remove(&ChannelHandle::parse("nope")).await.is_err());
    }
}
