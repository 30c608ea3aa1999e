//! One channel's unit of work: connect, fetch, aggregate, disconnect.

use std::sync::Arc;

use {
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

use {
    statgram_client::{ChannelHandle, Connector, Error as ClientError, RemoteClient},
    statgram_session::{LoginFlow, SessionStore},
    statgram_store::StatsStore,
};

use crate::{
    aggregator::StatsAggregator,
    config::IngestConfig,
    error::Error,
    fetcher::{ChannelFetcher, FetchOutcome},
    jitter::JitterSource,
};

/// Shared collaborators for a batch run, handed to every job instead of
/// living in module-level state.
pub struct IngestContext {
    pub connector: Arc<dyn Connector>,
    pub sessions: Arc<SessionStore>,
    pub login: Arc<dyn LoginFlow>,
    pub store: Arc<dyn StatsStore>,
    pub config: IngestConfig,
    pub jitter: Arc<dyn JitterSource>,
    pub cancel: CancellationToken,
}

/// Terminal state of one channel job. Failures never escape a job; they are
/// logged here and the batch moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Snapshot fetched, record and stats written.
    Completed,
    /// Permanent identifier problem this run; nothing written.
    Skipped,
    /// Channel failed this run; the next scheduled batch retries it.
    Failed,
    /// The run was cancelled while this job was waiting.
    Cancelled,
}

/// One fetch-and-aggregate unit, submitted per channel by the scheduler.
pub struct IngestJob {
    handle: ChannelHandle,
    ctx: Arc<IngestContext>,
}

impl IngestJob {
    pub fn new(handle: ChannelHandle, ctx: Arc<IngestContext>) -> Self {
        Self { handle, ctx }
    }

    #[must_use]
    pub fn handle(&self) -> &ChannelHandle {
        &self.handle
    }

    pub async fn run(self) -> JobOutcome {
        let client = match self.connect().await {
            Ok(client) => client,
            Err(outcome) => return outcome,
        };

        let fetcher = ChannelFetcher::new(
            Arc::clone(&client),
            self.ctx.config.clone(),
            Arc::clone(&self.ctx.jitter),
            self.ctx.cancel.clone(),
        );
        let outcome = match fetcher.fetch(&self.handle).await {
            Ok(FetchOutcome::Fetched(snapshot)) => {
                let aggregator = StatsAggregator::new(Arc::clone(&self.ctx.store));
                match aggregator.apply(&snapshot).await {
                    Ok(_) => JobOutcome::Completed,
                    Err(err) => {
                        error!(channel = %self.handle, error = %err, "failed to persist channel snapshot");
                        JobOutcome::Failed
                    },
                }
            },
            Ok(FetchOutcome::Skipped { reason }) => {
                info!(channel = %self.handle, reason = reason.as_str(), "channel skipped this run");
                JobOutcome::Skipped
            },
            Err(Error::Cancelled) => {
                info!(channel = %self.handle, "channel ingest cancelled");
                JobOutcome::Cancelled
            },
            Err(err) => {
                error!(channel = %self.handle, error = %err, "channel ingest failed");
                JobOutcome::Failed
            },
        };

        if let Err(err) = client.disconnect().await {
            warn!(channel = %self.handle, error = %err, "disconnect failed");
        }
        outcome
    }

    /// Open a connection, refreshing the credential at most once when the
    /// platform rejects the session.
    async fn connect(&self) -> Result<Arc<dyn RemoteClient>, JobOutcome> {
        let Some(credential) = self.ctx.sessions.get().await else {
            error!(channel = %self.handle, "no session credential loaded for this run");
            return Err(JobOutcome::Failed);
        };

        match self.ctx.connector.connect(&credential).await {
            Ok(client) => Ok(client),
            Err(ClientError::AuthInvalid) => {
                warn!(channel = %self.handle, "session rejected, refreshing credential once");
                let fresh = match self.ctx.sessions.refresh(self.ctx.login.as_ref(), false).await {
                    Ok(fresh) => fresh,
                    Err(err) => {
                        error!(
                            channel = %self.handle,
                            error = %err,
                            "credential refresh failed; re-run `statgram session set`"
                        );
                        return Err(JobOutcome::Failed);
                    },
                };
                match self.ctx.connector.connect(&fresh).await {
                    Ok(client) => Ok(client),
                    Err(err) => {
                        error!(channel = %self.handle, error = %err, "refreshed credential rejected");
                        Err(JobOutcome::Failed)
                    },
                }
            },
            Err(err) => {
                // Connect problems are transient for the batch; this
                // channel is retried on the next scheduled run.
                warn!(channel = %self.handle, error = %err, "connection failed");
                Err(JobOutcome::Failed)
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        secrecy::Secret,
        statgram_client::{
            Entity,
            memory::{ScriptedChannel, ScriptedClient, ScriptedConnector},
        },
        statgram_session::{Credential, NonInteractive},
        statgram_store::InMemoryStatsStore,
    };

    use {super::*, crate::jitter::ZeroJitter};

    fn credential(session: &str) -> Credential {
        Credential {
            session: Secret::new(session.into()),
            api_id: 1,
            api_hash: Secret::new("hash".into()),
            phone: None,
            password: None,
        }
    }

    struct FixedFlow;

    #[async_trait::async_trait]
    impl LoginFlow for FixedFlow {
        async fn login(
            &self,
            _existing: Option<&Credential>,
            _force: bool,
        ) -> statgram_session::Result<Credential> {
            Ok(credential("refreshed"))
        }
    }

    fn scripted_channel(id: i64, username: &str) -> ScriptedChannel {
        let mut channel = ScriptedChannel::new(Entity {
            id,
            title: format!("channel {username}"),
            username: Some(username.into()),
            verified: false,
            created_at: None,
        });
        channel.metadata.participants = Some(100);
        channel
    }

    struct Fixture {
        connector: Arc<ScriptedConnector>,
        store: Arc<InMemoryStatsStore>,
        ctx: Arc<IngestContext>,
        _dir: tempfile::TempDir,
    }

    async fn fixture(client: Arc<ScriptedClient>, reject_connects: usize, login: Arc<dyn LoginFlow>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let sessions = Arc::new(SessionStore::new(dir.path().join(".env")));
        sessions.save(&credential("initial")).await.unwrap();

        let connector =
            Arc::new(ScriptedConnector::new(client).rejecting_connects(reject_connects));
        let store = Arc::new(InMemoryStatsStore::new());
        let ctx = Arc::new(IngestContext {
            connector: Arc::clone(&connector) as Arc<dyn Connector>,
            sessions,
            login,
            store: Arc::clone(&store) as Arc<dyn StatsStore>,
            config: IngestConfig::default(),
            jitter: Arc::new(ZeroJitter),
            cancel: CancellationToken::new(),
        });
        Fixture {
            connector,
            store,
            ctx,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn completed_job_writes_record_and_stats() {
        let client = Arc::new(ScriptedClient::new());
        client.add_channel(scripted_channel(7, "news"));
        let fx = fixture(client, 0, Arc::new(NonInteractive)).await;

        let outcome = IngestJob::new(ChannelHandle::parse("news"), Arc::clone(&fx.ctx))
            .run()
            .await;
        assert_eq!(outcome, JobOutcome::Completed);
        assert!(fx.store.record(7).is_some());
        assert_eq!(fx.store.stats_history(7).len(), 1);
    }

    #[tokio::test]
    async fn skipped_channel_writes_nothing() {
        let client = Arc::new(ScriptedClient::new());
        let fx = fixture(client, 0, Arc::new(NonInteractive)).await;

        let outcome = IngestJob::new(ChannelHandle::parse("ghost"), Arc::clone(&fx.ctx))
            .run()
            .await;
        assert_eq!(outcome, JobOutcome::Skipped);
        assert_eq!(fx.store.write_count(), 0);
    }

    #[tokio::test]
    async fn auth_invalid_refreshes_once_and_recovers() {
        let client = Arc::new(ScriptedClient::new());
        client.add_channel(scripted_channel(7, "news"));
        let fx = fixture(client, 1, Arc::new(FixedFlow)).await;

        let outcome = IngestJob::new(ChannelHandle::parse("news"), Arc::clone(&fx.ctx))
            .run()
            .await;
        assert_eq!(outcome, JobOutcome::Completed);
        assert_eq!(fx.connector.attempts(), 2);
        // the refreshed credential was persisted for the rest of the batch
        let active = fx.ctx.sessions.get().await.unwrap();
        assert!(active.same_session(&credential("refreshed")));
    }

    #[tokio::test]
    async fn auth_invalid_without_login_flow_fails_the_job() {
        let client = Arc::new(ScriptedClient::new());
        client.add_channel(scripted_channel(7, "news"));
        let fx = fixture(client, usize::MAX, Arc::new(NonInteractive)).await;

        let outcome = IngestJob::new(ChannelHandle::parse("news"), Arc::clone(&fx.ctx))
            .run()
            .await;
        assert_eq!(outcome, JobOutcome::Failed);
        // exactly one connect attempt: the refresh failed before a second
        assert_eq!(fx.connector.attempts(), 1);
        assert_eq!(fx.store.write_count(), 0);
    }

    #[tokio::test]
    async fn persistent_auth_rejection_stops_after_one_retry() {
        let client = Arc::new(ScriptedClient::new());
        client.add_channel(scripted_channel(7, "news"));
        let fx = fixture(client, usize::MAX, Arc::new(FixedFlow)).await;

        let outcome = IngestJob::new(ChannelHandle::parse("news"), Arc::clone(&fx.ctx))
            .run()
            .await;
        assert_eq!(outcome, JobOutcome::Failed);
        // one initial attempt plus exactly one refresh-and-retry
        assert_eq!(fx.connector.attempts(), 2);
    }
}
