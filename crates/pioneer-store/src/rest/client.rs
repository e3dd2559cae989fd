//! HTTP client for the realtime-database REST API

use super::sse::{SseDecoder, SseEvent};
use crate::error::{Result, StoreError};
use crate::path::StorePath;
use crate::subscription::Subscription;
use crate::traits::RemoteStore;
use crate::tree;
use crate::types::{Snapshot, StoreEvent, SubscriptionFault};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Client configuration
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Database URL, e.g. `https://example-default-rtdb.firebaseio.com`
    pub base_url: String,
    /// ID token of the signed-in user, sent as the `auth` query parameter
    pub auth_token: Option<String>,
    /// Timeout for individual writes in seconds (default: 30).
    /// Event streams are long-lived and not subject to it.
    pub timeout_secs: u64,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            auth_token: None,
            timeout_secs: 30,
        }
    }
}

/// Body returned by a POST (append)
#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

/// Payload of `put` and `patch` stream events
#[derive(Debug, Deserialize)]
struct StreamPayload {
    path: String,
    data: Value,
}

/// [`RemoteStore`] over HTTP.
///
/// Writes map to `PUT`/`PATCH`/`POST`/`DELETE` on `{base}/{path}.json`;
/// subscriptions hold an `text/event-stream` GET open on the same URL and
/// rebuild the subtree locally from `put`/`patch` events.
///
/// # Example
///
/// ```rust,no_run
/// use pioneer_store::{RemoteStore, RestConfig, RestStore, StorePath};
///
/// # async fn example() -> pioneer_store::Result<()> {
/// let store = RestStore::new(RestConfig {
///     base_url: "https://example-default-rtdb.firebaseio.com".into(),
///     auth_token: Some("id-token".into()),
///     ..Default::default()
/// })?;
///
/// store
///     .write_full(&StorePath::parse("liveStatus/totalCapacity")?, 150.into())
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct RestStore {
    config: RestConfig,
    client: Client,
    stream_client: Client,
}

impl RestStore {
    /// Create a new REST store client
    pub fn new(config: RestConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let stream_client = Client::builder().build()?;

        Ok(Self {
            config,
            client,
            stream_client,
        })
    }

    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    /// Resource URL for a path, including the auth parameter
    pub fn url(&self, path: &StorePath) -> String {
        let encoded: Vec<String> = path
            .segments()
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect();
        let mut url = format!(
            "{}/{}.json",
            self.config.base_url.trim_end_matches('/'),
            encoded.join("/")
        );
        if let Some(ref token) = self.config.auth_token {
            url.push_str("?auth=");
            url.push_str(&urlencoding::encode(token));
        }
        url
    }

    async fn send(&self, path: &StorePath, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        check_status(path, response).await
    }
}

async fn check_status(path: &StorePath, response: Response) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(StoreError::PermissionDenied(path.to_string()));
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(StoreError::Server {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn subscribe(&self, path: &StorePath) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let request = self
            .stream_client
            .get(self.url(path))
            .header(header::ACCEPT, "text/event-stream");

        let task = tokio::spawn(run_event_stream(request, path.clone(), tx));
        info!(path = %path, "Opened event stream");

        Ok(Subscription::new(path.clone(), rx, move || task.abort()))
    }

    async fn write_full(&self, path: &StorePath, value: Value) -> Result<()> {
        let request = self.client.put(self.url(path)).json(&value);
        self.send(path, request).await?;
        Ok(())
    }

    async fn write_partial(&self, path: &StorePath, fields: Map<String, Value>) -> Result<()> {
        let request = self.client.patch(self.url(path)).json(&fields);
        self.send(path, request).await?;
        Ok(())
    }

    async fn append(&self, path: &StorePath, value: Value) -> Result<String> {
        let request = self.client.post(self.url(path)).json(&value);
        let response = self.send(path, request).await?;
        let body: PushResponse = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("append response: {}", e)))?;
        Ok(body.name)
    }

    async fn delete(&self, path: &StorePath) -> Result<()> {
        let request = self.client.delete(self.url(path));
        self.send(path, request).await?;
        Ok(())
    }
}

/// Drive one event stream until it ends, fails, or the receiver goes away.
async fn run_event_stream(
    request: RequestBuilder,
    path: StorePath,
    tx: mpsc::UnboundedSender<StoreEvent>,
) {
    let fault = match request.send().await {
        Ok(response) => match check_status(&path, response).await {
            Ok(response) => read_events(response, &path, &tx).await,
            Err(StoreError::PermissionDenied(_)) => SubscriptionFault::PermissionDenied,
            Err(e) => {
                warn!(path = %path, error = %e, "Event stream rejected");
                SubscriptionFault::Disconnected
            }
        },
        Err(e) => {
            warn!(path = %path, error = %e, "Event stream request failed");
            SubscriptionFault::Disconnected
        }
    };

    let _ = tx.send(StoreEvent::Error(fault));
}

async fn read_events(
    response: Response,
    path: &StorePath,
    tx: &mpsc::UnboundedSender<StoreEvent>,
) -> SubscriptionFault {
    let mut cache = StreamCache::new(path.clone());
    let mut decoder = SseDecoder::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(path = %path, error = %e, "Event stream broke");
                return SubscriptionFault::Disconnected;
            }
        };

        for event in decoder.push(&chunk) {
            match cache.apply(&event) {
                StreamStep::Snapshot(snapshot) => {
                    if tx.send(StoreEvent::Snapshot(snapshot)).is_err() {
                        return SubscriptionFault::Disconnected;
                    }
                }
                StreamStep::Ignore => {}
                StreamStep::Fault(fault) => return fault,
            }
        }
    }

    debug!(path = %path, "Event stream ended");
    SubscriptionFault::Disconnected
}

/// Outcome of applying one stream event
#[derive(Debug, PartialEq)]
pub enum StreamStep {
    Snapshot(Snapshot),
    Ignore,
    Fault(SubscriptionFault),
}

/// Local copy of a subscribed subtree, rebuilt from stream events.
#[derive(Debug)]
pub struct StreamCache {
    path: StorePath,
    value: Value,
}

impl StreamCache {
    pub fn new(path: StorePath) -> Self {
        Self {
            path,
            value: Value::Null,
        }
    }

    /// Apply an event and say what the subscriber should see.
    pub fn apply(&mut self, event: &SseEvent) -> StreamStep {
        match event.event.as_str() {
            "put" | "patch" => {
                let payload: StreamPayload = match serde_json::from_str(&event.data) {
                    Ok(payload) => payload,
                    Err(e) => {
                        // The local copy can no longer track the server
                        warn!(path = %self.path, error = %e, "Malformed stream payload");
                        return StreamStep::Fault(SubscriptionFault::Malformed);
                    }
                };
                let relative: Vec<String> = payload
                    .path
                    .split('/')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();

                if event.event == "put" {
                    tree::set_at(&mut self.value, &relative, payload.data);
                } else {
                    match payload.data {
                        Value::Object(fields) => tree::merge_at(&mut self.value, &relative, fields),
                        other => tree::set_at(&mut self.value, &relative, other),
                    }
                }

                StreamStep::Snapshot(Snapshot::new(self.path.clone(), Some(self.value.clone())))
            }
            "keep-alive" => StreamStep::Ignore,
            "cancel" | "auth_revoked" => {
                warn!(path = %self.path, reason = %event.data, "Event stream revoked");
                StreamStep::Fault(SubscriptionFault::PermissionDenied)
            }
            other => {
                debug!(path = %self.path, event = other, "Ignoring stream event");
                StreamStep::Ignore
            }
        }
    }
}
