use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::MessagingProvider;

/// WhatsApp Cloud API message length ceiling.
const MAX_BODY_CHARS: usize = 4096;

pub struct WhatsAppProvider {
    phone_number_id: String,
    access_token: String,
    client: reqwest::Client,
}

impl WhatsAppProvider {
    pub fn new(phone_number_id: String, access_token: String) -> Self {
        Self {
            phone_number_id,
            access_token,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MessagingProvider for WhatsAppProvider {
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()> {
        let url = format!(
            "https://graph.facebook.com/v20.0/{}/messages",
            self.phone_number_id
        );

        let truncated: String = body.chars().take(MAX_BODY_CHARS).collect();
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": to,
            "text": { "body": truncated },
        });

        self.client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await
            .context("failed to send WhatsApp message")?
            .error_for_status()
            .context("WhatsApp API returned error")?;

        Ok(())
    }
}
