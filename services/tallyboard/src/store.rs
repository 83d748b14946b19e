//! Realtime database client speaking the RTDB REST protocol
//!
//! Values live at hierarchical paths addressed as `{base}/{path}.json`.
//! Change subscriptions use the server-sent-events stream the database
//! exposes on the same URLs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::DatabaseConfig;
use crate::io::HttpClient;

/// Database path of the current checkpoint location
pub const LOCATION_PATH: &str = "currentLocation";
/// Database path of the last-update timestamp (epoch milliseconds)
pub const LAST_UPDATE_PATH: &str = "lastUpdate";
/// Database path of the material counts record
pub const MATERIALS_PATH: &str = "detectedMaterials";
/// The root of the data tree
pub const ROOT_PATH: &str = "";

/// Write-time sentinel the database resolves to its own clock
pub fn server_timestamp() -> Value {
    serde_json::json!({ ".sv": "timestamp" })
}

/// A realtime key/value store with change subscriptions
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait RealtimeStore: Send + Sync {
    /// Read the value at a path; absent values read as null
    async fn get(&self, path: &str) -> crate::Result<Value>;

    /// Overwrite the value at a path
    async fn set(&self, path: &str, value: &Value) -> crate::Result<()>;

    /// Atomically write a value only if the path currently holds null.
    /// Returns false when the path was already populated, including when a
    /// concurrent writer won the race.
    async fn create_if_absent(&self, path: &str, value: &Value) -> crate::Result<bool>;

    /// Open a standing change subscription. The returned channel yields the
    /// full value at the path on every change, starting with the current
    /// value. The subscription lives until the token is cancelled and
    /// reconnects on its own when the stream drops.
    async fn subscribe(&self, path: &str, cancel: CancellationToken) -> mpsc::Receiver<Value>;
}

/// REST/SSE-backed store client
#[derive(Clone)]
pub struct RestStore {
    base_url: String,
    auth: Option<String>,
    reconnect_delay: Duration,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for RestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestStore")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl RestStore {
    pub fn new(config: &DatabaseConfig, http: Arc<dyn HttpClient>) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        tracing::debug!("Created RestStore for {}", base_url);
        Self {
            base_url,
            auth: config.auth.clone(),
            reconnect_delay: Duration::from_secs(config.reconnect_delay_seconds),
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        let mut url = format!("{}/{}.json", self.base_url, path);
        if let Some(auth) = &self.auth {
            url.push_str("?auth=");
            url.push_str(auth);
        }
        url
    }

    async fn stream_changes(&self, path: &str, tx: mpsc::Sender<Value>, cancel: CancellationToken) {
        let url = self.url(path);
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.http.stream_lines(&url).await {
                Ok(mut lines) => {
                    tracing::debug!("Change stream open for '{}'", path);
                    let mut assembler = EventAssembler::default();
                    loop {
                        tokio::select! {
                            _ = cancel.cancelled() => return,
                            line = lines.recv() => {
                                let Some(line) = line else { break };
                                let Some(event) = assembler.push(&line) else { continue };
                                match event {
                                    StoreEvent::Put(envelope) if envelope.path == "/" => {
                                        if tx.send(envelope.data).await.is_err() {
                                            return;
                                        }
                                    }
                                    // A change below the subscribed path, or a
                                    // partial update: re-read the full value
                                    StoreEvent::Put(_) | StoreEvent::Patch(_) => {
                                        match self.get(path).await {
                                            Ok(value) => {
                                                if tx.send(value).await.is_err() {
                                                    return;
                                                }
                                            }
                                            Err(e) => {
                                                tracing::warn!("Re-read of '{}' failed: {}", path, e);
                                            }
                                        }
                                    }
                                    StoreEvent::KeepAlive => {}
                                    StoreEvent::Closed => {
                                        tracing::debug!("Change stream for '{}' closed by server", path);
                                        break;
                                    }
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Opening change stream for '{}' failed: {}", path, e);
                }
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
        tracing::debug!("Subscription to '{}' ended", path);
    }
}

#[async_trait]
impl RealtimeStore for RestStore {
    async fn get(&self, path: &str) -> crate::Result<Value> {
        let url = self.url(path);
        let response = self.http.get(&url, &[]).await?;
        if response.status != 200 {
            return Err(crate::TallyboardError::Store(format!(
                "GET '{}' returned status {}",
                path, response.status
            )));
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    async fn set(&self, path: &str, value: &Value) -> crate::Result<()> {
        let url = self.url(path);
        let response = self.http.put_json(&url, value, &[]).await?;
        if response.status != 200 {
            return Err(crate::TallyboardError::Store(format!(
                "PUT '{}' returned status {}",
                path, response.status
            )));
        }
        Ok(())
    }

    async fn create_if_absent(&self, path: &str, value: &Value) -> crate::Result<bool> {
        let url = self.url(path);
        let headers = [("X-Firebase-ETag".to_string(), "true".to_string())];
        let response = self.http.get(&url, &headers).await?;
        if response.status != 200 {
            return Err(crate::TallyboardError::Store(format!(
                "GET '{}' returned status {}",
                path, response.status
            )));
        }
        let current: Value = serde_json::from_str(&response.body)?;
        if !current.is_null() {
            return Ok(false);
        }
        let etag = response.etag.ok_or_else(|| {
            crate::TallyboardError::Store(format!("GET '{}' returned no entity tag", path))
        })?;

        let headers = [("if-match".to_string(), etag)];
        let response = self.http.put_json(&url, value, &headers).await?;
        match response.status {
            200 => Ok(true),
            // Another writer got there first
            412 => Ok(false),
            status => Err(crate::TallyboardError::Store(format!(
                "Conditional PUT '{}' returned status {}",
                path, status
            ))),
        }
    }

    async fn subscribe(&self, path: &str, cancel: CancellationToken) -> mpsc::Receiver<Value> {
        let (tx, rx) = mpsc::channel(16);
        let store = self.clone();
        let path = path.to_string();
        tokio::spawn(async move {
            store.stream_changes(&path, tx, cancel).await;
        });
        rx
    }
}

/// Envelope of a change event: the path relative to the subscription and
/// the new data at that path
#[derive(Debug, Deserialize)]
struct ChangeEnvelope {
    path: String,
    data: Value,
}

#[derive(Debug)]
enum StoreEvent {
    Put(ChangeEnvelope),
    Patch(ChangeEnvelope),
    KeepAlive,
    Closed,
}

/// Assembles server-sent-event lines into store events
#[derive(Default)]
struct EventAssembler {
    event: Option<String>,
}

impl EventAssembler {
    fn push(&mut self, line: &str) -> Option<StoreEvent> {
        if line.is_empty() {
            self.event = None;
            return None;
        }
        if let Some(name) = line.strip_prefix("event:") {
            self.event = Some(name.trim().to_string());
            return None;
        }
        if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            return match self.event.as_deref() {
                Some("put") => match serde_json::from_str(data) {
                    Ok(envelope) => Some(StoreEvent::Put(envelope)),
                    Err(e) => {
                        tracing::debug!("Ignoring unparsable put event: {}", e);
                        None
                    }
                },
                Some("patch") => match serde_json::from_str(data) {
                    Ok(envelope) => Some(StoreEvent::Patch(envelope)),
                    Err(e) => {
                        tracing::debug!("Ignoring unparsable patch event: {}", e);
                        None
                    }
                },
                Some("keep-alive") => Some(StoreEvent::KeepAlive),
                Some("cancel") | Some("auth_revoked") => Some(StoreEvent::Closed),
                _ => None,
            };
        }
        None
    }
}
