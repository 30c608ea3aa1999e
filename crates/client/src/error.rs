use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Typed remote-API failures.
///
/// Each variant pins down one caller decision: wait-and-retry, skip the
/// channel, refresh the session, or give up on the attempt. Only
/// [`Error::RateLimited`] is retryable.
#[derive(Debug, Error)]
pub enum Error {
    /// The platform asked us to slow down. Wait at least `retry_after`
    /// before repeating the same call.
    #[error("rate limited, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// The handle does not resolve to any channel. Permanent for this
    /// identifier; the channel is skipped for the run.
    #[error("channel not found: {handle}")]
    NotFound { handle: String },

    /// The channel is private or restricted. Permanent for this identifier.
    #[error("channel is private or restricted: {handle}")]
    Forbidden { handle: String },

    /// The session credential was rejected. The caller may refresh the
    /// session and retry once, never in a loop.
    #[error("session rejected by the platform")]
    AuthInvalid,

    /// Transport-level failure (connect, timeout, malformed payload).
    #[error("remote call failed: {context}: {source}")]
    Transient {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn not_found(handle: impl Into<String>) -> Self {
        Self::NotFound {
            handle: handle.into(),
        }
    }

    #[must_use]
    pub fn forbidden(handle: impl Into<String>) -> Self {
        Self::Forbidden {
            handle: handle.into(),
        }
    }

    #[must_use]
    pub fn transient(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transient {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// The wait the platform requested, for the only retryable variant.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
