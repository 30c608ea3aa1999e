//! The transient result of one channel fetch.

use chrono::{DateTime, Utc};

use {
    statgram_client::{Entity, Post},
    statgram_store::{ChannelRecord, PinnedPost, StoredPost},
};

/// Everything one fetch learned about a channel. Produced fresh every run;
/// never merged with a previous snapshot.
///
/// `participants`, `description` and `pinned` stay `None` when the
/// full-metadata call was not permitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSnapshot {
    pub channel_id: i64,
    pub title: String,
    pub username: Option<String>,
    pub verified: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub participants: Option<i64>,
    pub pinned: Option<PinnedPost>,
    pub recent_posts: Vec<StoredPost>,
    pub average_views: i64,
}

impl ChannelSnapshot {
    /// Entity-only snapshot; post and metadata fields filled in later steps.
    #[must_use]
    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            channel_id: entity.id,
            title: entity.title.clone(),
            username: entity.username.clone(),
            verified: entity.verified,
            created_at: entity.created_at,
            description: None,
            participants: None,
            pinned: None,
            recent_posts: Vec::new(),
            average_views: 0,
        }
    }

    #[must_use]
    pub fn into_record(self, fetched_at: DateTime<Utc>) -> ChannelRecord {
        ChannelRecord {
            channel_id: self.channel_id,
            title: self.title,
            username: self.username,
            verified: self.verified,
            created_at: self.created_at,
            description: self.description,
            participants: self.participants,
            pinned: self.pinned,
            recent_posts: self.recent_posts,
            average_views: self.average_views,
            fetched_at,
        }
    }
}

/// Integer average of the view counts that are actually present. Posts
/// without a view count stay out of both numerator and denominator; an
/// all-absent sample averages to 0 rather than erroring.
#[must_use]
pub fn average_views(posts: &[Post]) -> i64 {
    let mut total = 0i64;
    let mut counted = 0i64;
    for post in posts {
        if let Some(views) = post.views {
            total += views;
            counted += 1;
        }
    }
    if counted == 0 { 0 } else { total / counted }
}

/// The first `limit` posts of the sample, kept regardless of whether they
/// carry a view count.
#[must_use]
pub fn keep_recent(posts: Vec<Post>, limit: usize) -> Vec<StoredPost> {
    posts
        .into_iter()
        .take(limit)
        .map(|post| StoredPost {
            id: post.id,
            text: post.text,
            views: post.views,
        })
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn post(id: i64, views: Option<i64>) -> Post {
        Post {
            id,
            text: format!("post {id}"),
            views,
        }
    }

    #[rstest]
    #[case::plain(vec![Some(100), Some(200)], 150)]
    #[case::absent_views_excluded(vec![Some(90), None, Some(30)], 60)]
    #[case::all_absent(vec![None, None, None], 0)]
    #[case::empty(vec![], 0)]
    #[case::integer_division(vec![Some(5), Some(4)], 4)]
    fn average_view_cases(#[case] views: Vec<Option<i64>>, #[case] expected: i64) {
        let posts: Vec<Post> = views
            .into_iter()
            .enumerate()
            .map(|(i, v)| post(i as i64, v))
            .collect();
        assert_eq!(average_views(&posts), expected);
    }

    #[test]
    fn average_spans_the_whole_sample() {
        // 30 posts, 12 without views: the 18 with views all count.
        let posts: Vec<Post> = (0..30)
            .map(|i| post(i, if i % 5 < 2 { None } else { Some(100 + i) }))
            .collect();
        let with_views: Vec<i64> = posts.iter().filter_map(|p| p.views).collect();
        assert_eq!(with_views.len(), 18);
        let expected = with_views.iter().sum::<i64>() / 18;
        assert_eq!(average_views(&posts), expected);
    }

    #[test]
    fn keep_recent_truncates_without_filtering() {
        let posts: Vec<Post> = (0..30).map(|i| post(i, None)).collect();
        let kept = keep_recent(posts, 10);
        assert_eq!(kept.len(), 10);
        let ids: Vec<i64> = kept.iter().map(|p| p.id).collect();
        assert_eq!(ids, (0..10).collect::<Vec<i64>>());
        // view-less posts are kept in the snapshot
        assert!(kept.iter().all(|p| p.views.is_none()));
    }

    #[test]
    fn keep_recent_short_sample() {
        let posts = vec![post(1, Some(5))];
        assert_eq!(keep_recent(posts, 10).len(), 1);
    }
}
