//! Persisted channel data.

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// One post kept inside a channel record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPost {
    pub id: i64,
    pub text: String,
    #[serde(default)]
    pub views: Option<i64>,
}

/// The channel's pinned post. Absent when the channel has none or the
/// fetch could not read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinnedPost {
    pub id: i64,
    pub text: String,
}

/// Latest known state of a tracked channel. One row per channel id,
/// replaced wholesale on every successful fetch — fields are never merged
/// with a previous record.
///
/// `participants`, `description` and `pinned` are `None` when the
/// full-metadata fetch was not permitted for this channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub channel_id: i64,
    pub title: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub participants: Option<i64>,
    #[serde(default)]
    pub pinned: Option<PinnedPost>,
    pub recent_posts: Vec<StoredPost>,
    pub average_views: i64,
    pub fetched_at: DateTime<Utc>,
}

/// Append-only growth sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub channel_id: i64,
    pub participants: i64,
    pub daily_growth: i64,
    pub recorded_at: DateTime<Utc>,
}
