use anyhow::Context;
use async_trait::async_trait;

/// Write side of the system: durably records patients and appointments.
/// The sink owns its own schema; we hand payloads over verbatim and read
/// back only the `ok` flag plus whatever else it wants to report.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn dispatch(&self, payload: &serde_json::Value) -> anyhow::Result<serde_json::Value>;
}

/// Automation webhook sink (Make scenario feeding Sheets + Calendar).
pub struct WebhookSink {
    url: String,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PersistenceSink for WebhookSink {
    async fn dispatch(&self, payload: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let resp = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .context("failed to call persistence webhook")?;

        resp.json()
            .await
            .context("failed to parse persistence webhook response")
    }
}
