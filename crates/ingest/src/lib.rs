//! The ingestion pipeline: per-channel fetch with flood-wait retry,
//! idempotent daily-growth aggregation, and paced batch scheduling.
//!
//! One [`job::IngestJob`] covers one channel end to end; the
//! [`scheduler::IngestionScheduler`] paces job submissions across a batch so
//! the remote rate limit is respected for the run as a whole.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod jitter;
pub mod job;
pub mod scheduler;
pub mod snapshot;

pub use {
    aggregator::StatsAggregator,
    config::IngestConfig,
    error::{Error, Result},
    fetcher::{ChannelFetcher, FetchOutcome, SkipReason},
    jitter::{JitterSource, ThreadRngJitter, ZeroJitter},
    job::{IngestContext, IngestJob, JobOutcome},
    scheduler::{BatchReport, IngestionScheduler, TaskQueue, TokioTaskQueue},
    snapshot::ChannelSnapshot,
};
