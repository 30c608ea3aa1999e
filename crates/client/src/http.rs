//! Binding to the MTProto session gateway.
//!
//! The gateway owns the actual platform transport; this module maps its
//! HTTP surface onto the [`Connector`]/[`RemoteClient`] traits and its
//! status codes onto the error taxonomy: 401 → `AuthInvalid`, 403 →
//! `Forbidden`, 404 → `NotFound`, 429 + `Retry-After` → `RateLimited`,
//! anything else → `Transient`.

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    reqwest::{Response, StatusCode},
    secrecy::ExposeSecret,
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use statgram_session::Credential;

use crate::{
    Connector, RemoteClient,
    error::{Error, Result},
    types::{ChannelHandle, Entity, FullMetadata, Post},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Wait applied when the gateway rate-limits without a `Retry-After` header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Opens gateway sessions from a credential.
pub struct HttpConnector {
    http: reqwest::Client,
    base: String,
}

impl HttpConnector {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::transient("building http client", e))?;
        Ok(Self {
            http,
            base: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Serialize)]
struct SessionRequest<'a> {
    session_string: &'a str,
    api_id: i32,
    api_hash: &'a str,
}

#[derive(Deserialize)]
struct SessionResponse {
    token: String,
}

#[derive(Deserialize)]
struct PostTextResponse {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self, credential: &Credential) -> Result<Arc<dyn RemoteClient>> {
        let url = format!("{}/v1/sessions", self.base);
        let response = self
            .http
            .post(&url)
            .json(&SessionRequest {
                session_string: credential.session.expose_secret(),
                api_id: credential.api_id,
                api_hash: credential.api_hash.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| Error::transient("opening gateway session", e))?;
        let response = check_status(response, "gateway session")?;
        let body: SessionResponse = response
            .json()
            .await
            .map_err(|e| Error::transient("decoding gateway session", e))?;
        debug!("gateway session opened");

        Ok(Arc::new(HttpGatewayClient {
            http: self.http.clone(),
            base: self.base.clone(),
            token: body.token,
        }))
    }
}

/// One authenticated gateway session.
pub struct HttpGatewayClient {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl HttpGatewayClient {
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
        subject: &str,
    ) -> Result<T> {
        let response = self
            .http
            .get(&url)
            .query(query)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::transient(subject.to_string(), e))?;
        let response = check_status(response, subject)?;
        response
            .json()
            .await
            .map_err(|e| Error::transient(format!("decoding {subject}"), e))
    }
}

#[async_trait]
impl RemoteClient for HttpGatewayClient {
    async fn resolve_entity(&self, handle: &ChannelHandle) -> Result<Entity> {
        let url = format!("{}/v1/entities/{}", self.base, handle);
        self.get_json(url, &[], handle.as_str()).await
    }

    async fn recent_posts(&self, channel_id: i64, count: usize) -> Result<Vec<Post>> {
        let url = format!("{}/v1/entities/{channel_id}/posts", self.base);
        self.get_json(url, &[("limit", count.to_string())], "recent posts")
            .await
    }

    async fn full_metadata(&self, channel_id: i64) -> Result<FullMetadata> {
        let url = format!("{}/v1/entities/{channel_id}/full", self.base);
        self.get_json(url, &[], "full metadata").await
    }

    async fn post_text(&self, channel_id: i64, post_id: i64) -> Result<Option<String>> {
        let url = format!("{}/v1/entities/{channel_id}/posts/{post_id}", self.base);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::transient("fetching post text", e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, "post text")?;
        let body: PostTextResponse = response
            .json()
            .await
            .map_err(|e| Error::transient("decoding post text", e))?;
        Ok(body.text)
    }

    async fn disconnect(&self) -> Result<()> {
        let url = format!("{}/v1/sessions/current", self.base);
        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::transient("closing gateway session", e))?;
        check_status(response, "gateway session")?;
        Ok(())
    }
}

fn check_status(response: Response, subject: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(match status {
        StatusCode::UNAUTHORIZED => Error::AuthInvalid,
        StatusCode::FORBIDDEN => Error::forbidden(subject),
        StatusCode::NOT_FOUND => Error::not_found(subject),
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited {
            retry_after: retry_after_duration(response.headers()),
        },
        other => Error::Transient {
            context: format!("{subject}: unexpected status {other}"),
            source: format!("HTTP {other}").into(),
        },
    })
}

/// Parse `Retry-After` as delta-seconds, which is what the gateway sends
/// with 429 responses.
fn retry_after_duration(headers: &reqwest::header::HeaderMap) -> Duration {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|text| text.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}
