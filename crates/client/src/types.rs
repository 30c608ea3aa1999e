//! Wire types for the remote channel surface.

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// A channel identifier as supplied by an operator: numeric id, username
/// with or without `@`, or a `t.me` URL. Normalized on construction.
///
/// Usernames are not stable across renames; the numeric [`Entity::id`],
/// once resolved, is the durable key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelHandle(String);

impl ChannelHandle {
    /// Normalize any accepted input form down to a bare username or a
    /// numeric id string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut handle = raw.trim();
        for prefix in ["https://", "http://"] {
            if let Some(rest) = handle.strip_prefix(prefix) {
                handle = rest;
            }
        }
        for prefix in ["t.me/", "telegram.me/"] {
            if let Some(rest) = handle.strip_prefix(prefix) {
                handle = rest;
            }
        }
        // t.me/s/<name> is the public preview form of the same channel.
        if let Some(rest) = handle.strip_prefix("s/") {
            handle = rest;
        }
        handle = handle.strip_prefix('@').unwrap_or(handle);
        handle = handle.trim_end_matches('/');
        // drop anything after the channel segment, e.g. a post path
        let handle = handle.split('/').next().unwrap_or(handle);
        Self(handle.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for ChannelHandle {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// Basic channel identity, available to anyone who can see the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub verified: bool,
    /// Channel creation timestamp, when the platform exposes it.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One channel post. `views` is frequently absent on very recent posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub views: Option<i64>,
}

/// The restricted-visibility half of a channel's profile. Any of these may
/// be withheld for private channels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FullMetadata {
    #[serde(default)]
    pub participants: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pinned_post_id: Option<i64>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_normalization() {
        for raw in [
            "example",
            "@example",
            "t.me/example",
            "t.me/s/example",
            "https://t.me/example",
            "https://t.me/example/",
            "http://telegram.me/example",
            "  @example  ",
            "t.me/example/123",
        ] {
            assert_eq!(ChannelHandle::parse(raw).as_str(), "example", "input: {raw}");
        }
    }

    #[test]
    fn numeric_handle_passes_through() {
        assert_eq!(ChannelHandle::parse("123456").as_str(), "123456");
        assert_eq!(ChannelHandle::from(123456).as_str(), "123456");
    }

    #[test]
    fn entity_deserializes_with_defaults() {
        let entity: Entity =
            serde_json::from_str(r#"{"id": 42, "title": "News"}"#).unwrap();
        assert_eq!(entity.id, 42);
        assert_eq!(entity.username, None);
        assert!(!entity.verified);
        assert!(entity.created_at.is_none());
    }

    #[test]
    fn post_views_may_be_absent() {
        let post: Post = serde_json::from_str(r#"{"id": 7, "text": "hi"}"#).unwrap();
        assert_eq!(post.views, None);
    }
}
