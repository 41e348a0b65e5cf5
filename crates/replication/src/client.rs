use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use templates::{repair_order, TemplateTree};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::{DocumentKind, PushEvent, Result, SyncError};

/// The default request timeout. Generous because a cold cloud instance can
/// take a long while to wake up.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// Blocking-per-call HTTP client for the snapshot API, plus the WebSocket
/// subscription for push events. Every call is terminal on failure: no
/// internal retry, and nothing local is touched.
pub struct SyncClient {
    base_url: String,
    client: reqwest::Client,
}

impl SyncClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Network(e.to_string()))?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the full template tree and runs the boundary repair pass.
    pub async fn pull_templates(&self) -> Result<TemplateTree> {
        let value = self.pull_document(DocumentKind::Templates).await?;
        decode_snapshot(value)
    }

    /// Sends the entire tree as a full replacement.
    pub async fn push_templates(&self, tree: &TemplateTree) -> Result<()> {
        let value =
            serde_json::to_value(tree).map_err(|e| SyncError::MalformedSnapshot(e.to_string()))?;
        self.push_document(DocumentKind::Templates, &value).await
    }

    pub async fn pull_document(&self, kind: DocumentKind) -> Result<Value> {
        let url = format!("{}{}", self.base_url, kind.api_path());
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SyncError::Network(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| SyncError::MalformedSnapshot(e.to_string()))
    }

    pub async fn push_document(&self, kind: DocumentKind, document: &Value) -> Result<()> {
        let url = format!("{}{}", self.base_url, kind.api_path());
        let response = self
            .client
            .post(&url)
            .json(document)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SyncError::Network(format!(
                "POST {} returned {}",
                url,
                response.status()
            )));
        }
        Ok(())
    }

    pub fn ws_url(&self) -> String {
        let stripped = self
            .base_url
            .strip_prefix("http://")
            .map(|rest| format!("ws://{}", rest))
            .or_else(|| {
                self.base_url
                    .strip_prefix("https://")
                    .map(|rest| format!("wss://{}", rest))
            })
            .unwrap_or_else(|| self.base_url.clone());
        format!("{}/ws", stripped)
    }

    /// Connects the push channel and forwards decoded events until the
    /// socket closes. Events may arrive at any time, including one's own
    /// broadcast right after a push.
    pub async fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<PushEvent>> {
        let (stream, _) = tokio_tungstenite::connect_async(self.ws_url())
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let (mut sink, mut source) = stream.split();
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<PushEvent>(&text) {
                        Ok(event) => {
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Ignoring malformed push event: {}", e),
                    },
                    Ok(Message::Ping(data)) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Ok(Message::Close(_)) => {
                        debug!("Push channel closed by server");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Push channel error: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }
}

/// Decodes a received snapshot and heals its order lists. Rejects anything
/// that is not a mapping at the root.
pub fn decode_snapshot(value: Value) -> Result<TemplateTree> {
    let mut tree: TemplateTree =
        serde_json::from_value(value).map_err(|e| SyncError::MalformedSnapshot(e.to_string()))?;
    repair_order(&mut tree.root);
    Ok(tree)
}
