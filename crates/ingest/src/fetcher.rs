//! One channel's data pull, step by step.
//!
//! A fetch moves through resolve → recent posts → full metadata → pinned
//! post. A flood wait at any step pauses the whole fetch and resumes at the
//! step that failed; entity resolution failures skip the channel; a
//! forbidden metadata call degrades to a partial snapshot instead of
//! aborting.

use std::{future::Future, sync::Arc};

use {
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

use {
    statgram_client::{ChannelHandle, Error as ClientError, RemoteClient},
    statgram_store::PinnedPost,
};

use crate::{
    config::IngestConfig,
    error::{Error, Result},
    jitter::JitterSource,
    snapshot::{ChannelSnapshot, average_views, keep_recent},
};

/// Why a channel produced no snapshot this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The handle resolves to nothing — deleted or renamed.
    NotFound,
    /// The channel is private or restricted.
    Forbidden,
}

impl SkipReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
        }
    }
}

/// Result of one channel fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fetched(ChannelSnapshot),
    /// Permanent failure for this identifier; nothing is written.
    Skipped { reason: SkipReason },
}

/// Pulls one channel's snapshot over an open connection.
pub struct ChannelFetcher {
    client: Arc<dyn RemoteClient>,
    config: IngestConfig,
    jitter: Arc<dyn JitterSource>,
    cancel: CancellationToken,
}

impl ChannelFetcher {
    pub fn new(
        client: Arc<dyn RemoteClient>,
        config: IngestConfig,
        jitter: Arc<dyn JitterSource>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            config,
            jitter,
            cancel,
        }
    }

    pub async fn fetch(&self, handle: &ChannelHandle) -> Result<FetchOutcome> {
        let entity = match self
            .with_flood_backoff(handle, "resolve entity", || self.client.resolve_entity(handle))
            .await
        {
            Ok(entity) => entity,
            Err(Error::Client(ClientError::NotFound { .. })) => {
                warn!(channel = %handle, "channel does not exist, skipping");
                return Ok(FetchOutcome::Skipped {
                    reason: SkipReason::NotFound,
                });
            },
            Err(Error::Client(ClientError::Forbidden { .. })) => {
                warn!(channel = %handle, "channel is private or unavailable, skipping");
                return Ok(FetchOutcome::Skipped {
                    reason: SkipReason::Forbidden,
                });
            },
            Err(err) => return Err(err),
        };
        let mut snapshot = ChannelSnapshot::from_entity(&entity);
        debug!(channel = %handle, channel_id = entity.id, "channel resolved");

        let sample_size = self.config.sample_size();
        let posts = self
            .with_flood_backoff(handle, "recent posts", || {
                self.client.recent_posts(entity.id, sample_size)
            })
            .await?;
        snapshot.average_views = average_views(&posts);
        snapshot.recent_posts = keep_recent(posts, self.config.post_limit);

        match self
            .with_flood_backoff(handle, "full metadata", || {
                self.client.full_metadata(entity.id)
            })
            .await
        {
            Ok(metadata) => {
                snapshot.participants = metadata.participants;
                snapshot.description = metadata.description;
                if let Some(post_id) = metadata.pinned_post_id {
                    snapshot.pinned = self.pinned_post(handle, entity.id, post_id).await?;
                }
            },
            Err(Error::Client(ClientError::Forbidden { .. })) => {
                // Entity and post fields stand on their own; the metadata
                // fields stay explicitly unavailable.
                warn!(channel = %handle, "full channel information restricted, keeping partial snapshot");
            },
            Err(err) => return Err(err),
        }

        Ok(FetchOutcome::Fetched(snapshot))
    }

    async fn pinned_post(
        &self,
        handle: &ChannelHandle,
        channel_id: i64,
        post_id: i64,
    ) -> Result<Option<PinnedPost>> {
        match self
            .with_flood_backoff(handle, "pinned post", || {
                self.client.post_text(channel_id, post_id)
            })
            .await
        {
            Ok(Some(text)) => Ok(Some(PinnedPost { id: post_id, text })),
            Ok(None) => Ok(None),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(err) => {
                debug!(channel = %handle, error = %err, "pinned post unavailable");
                Ok(None)
            },
        }
    }

    /// Run a remote call, absorbing flood waits.
    ///
    /// A rate-limit answer pauses for the platform-requested wait plus
    /// jitter, then retries the same call; there is no retry cap because the
    /// platform guarantees availability once the wait elapses. Other errors
    /// pass through untouched. The pause aborts promptly on cancellation.
    async fn with_flood_backoff<T, F, Fut>(
        &self,
        channel: &ChannelHandle,
        operation: &'static str,
        mut call: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = statgram_client::Result<T>>,
    {
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = err.retry_after() else {
                        return Err(err.into());
                    };
                    let pause = wait
                        + self.jitter.between(
                            self.config.flood_jitter_min(),
                            self.config.flood_jitter_max(),
                        );
                    warn!(
                        channel = %channel,
                        operation,
                        pause_ms = pause.as_millis() as u64,
                        "rate limited, pausing fetch before retry"
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                        _ = tokio::time::sleep(pause) => {},
                    }
                },
            }
        }
    }
}
