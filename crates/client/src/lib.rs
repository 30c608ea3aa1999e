//! Capability-scoped access to the remote channel platform.
//!
//! The pipeline only sees the [`Connector`] and [`RemoteClient`] traits plus
//! the typed failure taxonomy in [`error`]; [`http::HttpConnector`] binds
//! them to the MTProto session gateway, [`memory::ScriptedClient`] to
//! scripted in-memory data for tests.

pub mod error;
pub mod http;
pub mod memory;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;

use statgram_session::Credential;

pub use {
    error::{Error, Result},
    types::{ChannelHandle, Entity, FullMetadata, Post},
};

/// Opens authenticated connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection with the given credential.
    ///
    /// Fails with [`Error::AuthInvalid`] when the session string is stale or
    /// revoked; the caller may refresh the credential and retry once.
    async fn connect(&self, credential: &Credential) -> Result<Arc<dyn RemoteClient>>;
}

/// One authenticated connection to the platform.
///
/// Calls on a single connection are made sequentially by the owning fetch
/// job; distinct jobs hold distinct connections.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Resolve a handle to the channel it currently names.
    async fn resolve_entity(&self, handle: &ChannelHandle) -> Result<Entity>;

    /// The `count` most recent posts, most recent first.
    async fn recent_posts(&self, channel_id: i64, count: usize) -> Result<Vec<Post>>;

    /// Participant count, description and pinned-post id. Restricted
    /// channels answer with [`Error::Forbidden`].
    async fn full_metadata(&self, channel_id: i64) -> Result<FullMetadata>;

    /// Body text of a single post. `Ok(None)` when the post no longer
    /// exists.
    async fn post_text(&self, channel_id: i64, post_id: i64) -> Result<Option<String>>;

    /// Close the connection. Best-effort: callers log failures as warnings
    /// and move on.
    async fn disconnect(&self) -> Result<()>;
}
