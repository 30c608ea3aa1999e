//! Scripted in-memory client. No network — for tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use statgram_session::Credential;

use crate::{
    Connector, RemoteClient,
    error::{Error, Result},
    types::{ChannelHandle, Entity, FullMetadata, Post},
};

/// Which client operation a scripted fault applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Resolve,
    Posts,
    Metadata,
    PostText,
    Disconnect,
}

/// A scripted failure, consumed once by the next call of the matching
/// operation.
#[derive(Debug, Clone)]
pub enum Fault {
    RateLimited(Duration),
    NotFound,
    Forbidden,
    AuthInvalid,
    Transient,
}

impl Fault {
    fn into_error(self, subject: &str) -> Error {
        match self {
            Self::RateLimited(retry_after) => Error::RateLimited { retry_after },
            Self::NotFound => Error::not_found(subject),
            Self::Forbidden => Error::forbidden(subject),
            Self::AuthInvalid => Error::AuthInvalid,
            Self::Transient => Error::Transient {
                context: format!("scripted transient failure: {subject}"),
                source: "scripted".into(),
            },
        }
    }
}

/// One scripted channel.
#[derive(Debug, Clone)]
pub struct ScriptedChannel {
    pub entity: Entity,
    pub posts: Vec<Post>,
    pub metadata: FullMetadata,
    /// Answer every full-metadata call with `Forbidden`.
    pub metadata_forbidden: bool,
    /// Body of the pinned post, when `metadata.pinned_post_id` is set.
    pub pinned_text: Option<String>,
}

impl ScriptedChannel {
    #[must_use]
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            posts: Vec::new(),
            metadata: FullMetadata::default(),
            metadata_forbidden: false,
            pinned_text: None,
        }
    }
}

/// In-memory [`RemoteClient`] over scripted channel data, with one-shot
/// fault injection and a call log for asserting retry behavior.
#[derive(Default)]
pub struct ScriptedClient {
    channels: Mutex<HashMap<String, ScriptedChannel>>,
    faults: Mutex<HashMap<Op, VecDeque<Fault>>>,
    calls: Mutex<Vec<Op>>,
}

impl ScriptedClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel, reachable by username and by numeric id.
    pub fn add_channel(&self, channel: ScriptedChannel) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(username) = &channel.entity.username {
            channels.insert(username.clone(), channel.clone());
        }
        channels.insert(channel.entity.id.to_string(), channel);
    }

    /// Queue a fault for the next call of `op`.
    pub fn push_fault(&self, op: Op, fault: Fault) {
        let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        faults.entry(op).or_default().push_back(fault);
    }

    /// Operations invoked so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Op> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn enter(&self, op: Op, subject: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(op);
        let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        match faults.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(fault) => Err(fault.into_error(subject)),
            None => Ok(()),
        }
    }

    fn channel(&self, key: &str) -> Result<ScriptedChannel> {
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found(key))
    }
}

#[async_trait]
impl RemoteClient for ScriptedClient {
    async fn resolve_entity(&self, handle: &ChannelHandle) -> Result<Entity> {
        self.enter(Op::Resolve, handle.as_str())?;
        Ok(self.channel(handle.as_str())?.entity)
    }

    async fn recent_posts(&self, channel_id: i64, count: usize) -> Result<Vec<Post>> {
        self.enter(Op::Posts, &channel_id.to_string())?;
        let channel = self.channel(&channel_id.to_string())?;
        Ok(channel.posts.into_iter().take(count).collect())
    }

    async fn full_metadata(&self, channel_id: i64) -> Result<FullMetadata> {
        self.enter(Op::Metadata, &channel_id.to_string())?;
        let channel = self.channel(&channel_id.to_string())?;
        if channel.metadata_forbidden {
            return Err(Error::forbidden(channel_id.to_string()));
        }
        Ok(channel.metadata)
    }

    async fn post_text(&self, channel_id: i64, post_id: i64) -> Result<Option<String>> {
        self.enter(Op::PostText, &post_id.to_string())?;
        let channel = self.channel(&channel_id.to_string())?;
        if channel.metadata.pinned_post_id == Some(post_id) {
            return Ok(channel.pinned_text);
        }
        Ok(None)
    }

    async fn disconnect(&self) -> Result<()> {
        self.enter(Op::Disconnect, "disconnect")?;
        Ok(())
    }
}

/// Connector over a shared [`ScriptedClient`], optionally rejecting the
/// first N connection attempts with `AuthInvalid`.
pub struct ScriptedConnector {
    client: Arc<ScriptedClient>,
    reject_connects: AtomicUsize,
    attempts: AtomicUsize,
}

impl ScriptedConnector {
    #[must_use]
    pub fn new(client: Arc<ScriptedClient>) -> Self {
        Self {
            client,
            reject_connects: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Reject the next `count` connection attempts with `AuthInvalid`.
    #[must_use]
    pub fn rejecting_connects(self, count: usize) -> Self {
        self.reject_connects.store(count, Ordering::SeqCst);
        self
    }

    /// Connection attempts made so far.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _credential: &Credential) -> Result<Arc<dyn RemoteClient>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.reject_connects.load(Ordering::SeqCst) {
            return Err(Error::AuthInvalid);
        }
        Ok(Arc::clone(&self.client) as Arc<dyn RemoteClient>)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: i64, username: &str) -> ScriptedChannel {
        ScriptedChannel::new(Entity {
            id,
            title: format!("channel {id}"),
            username: Some(username.into()),
            verified: false,
            created_at: None,
        })
    }

    #[tokio::test]
    async fn resolves_by_username_and_id() {
        let client = ScriptedClient::new();
        client.add_channel(channel(7, "seven"));

        let by_name = client
            .resolve_entity(&ChannelHandle::parse("@seven"))
            .await
            .unwrap();
        let by_id = client
            .resolve_entity(&ChannelHandle::from(7))
            .await
            .unwrap();
        assert_eq!(by_name.id, by_id.id);
    }

    #[tokio::test]
    async fn faults_fire_once_in_order() {
        let client = ScriptedClient::new();
        client.add_channel(channel(7, "seven"));
        client.push_fault(Op::Resolve, Fault::RateLimited(Duration::from_millis(10)));

        let handle = ChannelHandle::parse("seven");
        assert!(client.resolve_entity(&handle).await.is_err());
        assert!(client.resolve_entity(&handle).await.is_ok());
        assert_eq!(client.calls(), vec![Op::Resolve, Op::Resolve]);
    }

    #[tokio::test]
    async fn connector_rejects_then_accepts() {
        let client = Arc::new(ScriptedClient::new());
        let connector = ScriptedConnector::new(client).rejecting_connects(1);
        let credential = Credential {
            session: secrecy::Secret::new("s".into()),
            api_id: 1,
            api_hash: secrecy::Secret::new("h".into()),
            phone: None,
            password: None,
        };

        assert!(matches!(
            connector.connect(&credential).await,
            Err(Error::AuthInvalid)
        ));
        assert!(connector.connect(&credential).await.is_ok());
        assert_eq!(connector.attempts(), 2);
    }
}
