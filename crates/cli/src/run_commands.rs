//! `statgram run` — one ingestion batch.

use std::{path::Path, sync::Arc};

use {
    anyhow::{Context, Result},
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use {
    statgram_client::{ChannelHandle, Connector, http::HttpConnector},
    statgram_ingest::{
        IngestConfig, IngestContext, IngestionScheduler, JobOutcome, TaskQueue, ThreadRngJitter,
        TokioTaskQueue,
    },
    statgram_session::{NonInteractive, SessionStore},
    statgram_store::{ChannelSet, SqliteStatsStore, StatsStore},
};

pub async fn handle_run(
    env_path: &Path,
    database_url: &str,
    gateway_url: &str,
    handles: &[String],
    post_limit: Option<usize>,
    pace_ms: Option<u64>,
) -> Result<()> {
    let store = Arc::new(
        SqliteStatsStore::connect(database_url)
            .await
            .context("opening statgram database")?,
    );

    let batch: Vec<ChannelHandle> = if handles.is_empty() {
        store.tracked().await?
    } else {
        handles.iter().map(|h| ChannelHandle::parse(h)).collect()
    };

    let mut config = IngestConfig::default();
    if let Some(post_limit) = post_limit {
        config.post_limit = post_limit;
    }
    if let Some(pace_ms) = pace_ms {
        config.pace_base_ms = pace_ms;
    }

    let cancel = CancellationToken::new();
    let ctx = Arc::new(IngestContext {
        connector: Arc::new(HttpConnector::new(gateway_url)?) as Arc<dyn Connector>,
        sessions: Arc::new(SessionStore::new(env_path)),
        login: Arc::new(NonInteractive),
        store: Arc::clone(&store) as Arc<dyn StatsStore>,
        config,
        jitter: Arc::new(ThreadRngJitter),
        cancel: cancel.clone(),
    });

    // Ctrl-C stops pacing and skips unsubmitted channels; in-flight jobs
    // finish on their own.
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling batch");
            cancel_on_signal.cancel();
        }
    });

    let queue = Arc::new(TokioTaskQueue::new());
    let scheduler = IngestionScheduler::new(ctx, Arc::clone(&queue) as Arc<dyn TaskQueue>);
    let report = scheduler.run_batch(&batch).await?;

    let outcomes = queue.join_all().await;
    let completed = outcomes
        .iter()
        .filter(|o| **o == JobOutcome::Completed)
        .count();
    let skipped = outcomes
        .iter()
        .filter(|o| **o == JobOutcome::Skipped)
        .count();
    let failed = outcomes.len() - completed - skipped;
    info!(
        submitted = report.submitted,
        completed, skipped, failed, "ingestion batch finished"
    );
    Ok(())
}
