//! Paced batch submission.
//!
//! The scheduler throttles *submission* rate only: it sleeps between
//! handing jobs to the task queue, while the queue executes earlier jobs
//! concurrently with the loop. One job per channel per batch keeps the
//! aggregator's read-then-write for a channel single-writer.

use std::sync::{Arc, Mutex};

use {
    tokio::task::JoinHandle,
    tracing::{debug, error, info, warn},
};

use statgram_client::ChannelHandle;

use crate::{
    error::Result,
    job::{IngestContext, IngestJob, JobOutcome},
};

/// Fire-and-forget job execution. The scheduler consumes no return value.
pub trait TaskQueue: Send + Sync {
    fn submit(&self, job: IngestJob);
}

/// Runs each job as a tokio task, keeping the join handles so a caller can
/// wait for in-flight jobs after the submission loop finishes.
#[derive(Default)]
pub struct TokioTaskQueue {
    handles: Mutex<Vec<JoinHandle<JobOutcome>>>,
}

impl TokioTaskQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for every job submitted so far.
    pub async fn join_all(&self) -> Vec<JobOutcome> {
        let handles: Vec<_> = {
            let mut guard = self.handles.lock().unwrap_or_else(|e| e.into_inner());
            guard.drain(..).collect()
        };
        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    error!(error = %err, "ingest job aborted abnormally");
                    outcomes.push(JobOutcome::Failed);
                },
            }
        }
        outcomes
    }
}

impl TaskQueue for TokioTaskQueue {
    fn submit(&self, job: IngestJob) {
        let handle = tokio::spawn(job.run());
        self.handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(handle);
    }
}

/// What a batch run submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub submitted: usize,
    pub cancelled: bool,
}

/// Walks a channel set, submitting one job per channel with a jittered
/// pause between submissions.
pub struct IngestionScheduler {
    ctx: Arc<IngestContext>,
    queue: Arc<dyn TaskQueue>,
}

impl IngestionScheduler {
    pub fn new(ctx: Arc<IngestContext>, queue: Arc<dyn TaskQueue>) -> Self {
        Self { ctx, queue }
    }

    /// Submit one job per handle, pacing submissions.
    ///
    /// An empty set is a logged no-op. A missing credential aborts the whole
    /// run before anything is submitted — per-channel failures never do.
    /// Cancellation interrupts the pacing sleep and skips the remaining
    /// unsubmitted channels; jobs already handed to the queue finish on
    /// their own.
    pub async fn run_batch(&self, handles: &[ChannelHandle]) -> Result<BatchReport> {
        if handles.is_empty() {
            info!("channel set is empty, nothing to ingest");
            return Ok(BatchReport::default());
        }

        // One credential read up front; NotConfigured surfaces to the
        // operator instead of failing every job one by one.
        self.ctx.sessions.load().await?;

        let mut report = BatchReport::default();
        for (index, handle) in handles.iter().enumerate() {
            if self.ctx.cancel.is_cancelled() {
                report.cancelled = true;
                warn!(
                    remaining = handles.len() - index,
                    "batch cancelled, skipping remaining channels"
                );
                break;
            }

            self.queue
                .submit(IngestJob::new(handle.clone(), Arc::clone(&self.ctx)));
            report.submitted += 1;
            debug!(channel = %handle, "ingest job submitted");

            if index + 1 < handles.len() {
                let pause =
                    self.ctx.config.pace_base() + self.ctx.jitter.up_to(self.ctx.config.pace_jitter());
                debug!(pause_ms = pause.as_millis() as u64, "pacing next submission");
                tokio::select! {
                    _ = self.ctx.cancel.cancelled() => {
                        report.cancelled = true;
                        warn!(
                            remaining = handles.len() - index - 1,
                            "batch cancelled, skipping remaining channels"
                        );
                        break;
                    },
                    _ = tokio::time::sleep(pause) => {},
                }
            }
        }

        info!(
            submitted = report.submitted,
            total = handles.len(),
            "batch submission finished"
        );
        Ok(report)
    }
}
