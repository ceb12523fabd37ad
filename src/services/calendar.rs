use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::json;

use crate::models::BusyInterval;
use crate::services::scheduling::clinic_zone;

/// Read side of the live calendar: everything already occupied in a range.
#[async_trait]
pub trait BusySource: Send + Sync {
    async fn busy_between(
        &self,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
    ) -> anyhow::Result<Vec<BusyInterval>>;
}

/// FreeBusy-style query against the Google Calendar API.
pub struct FreeBusyClient {
    url: String,
    calendar_id: String,
    access_token: String,
    client: reqwest::Client,
}

impl FreeBusyClient {
    pub fn new(url: String, calendar_id: String, access_token: String) -> Self {
        Self {
            url,
            calendar_id,
            access_token,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl BusySource for FreeBusyClient {
    async fn busy_between(
        &self,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
    ) -> anyhow::Result<Vec<BusyInterval>> {
        let body = json!({
            "timeMin": from.with_timezone(&Utc).to_rfc3339(),
            "timeMax": to.with_timezone(&Utc).to_rfc3339(),
            "items": [{ "id": self.calendar_id }],
            "timeZone": "America/Bogota",
        });

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .context("failed to call freebusy API")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse freebusy response")?;

        if !status.is_success() {
            anyhow::bail!("freebusy API error ({}): {}", status, data);
        }

        let zone = clinic_zone();
        let busy = data["calendars"][&self.calendar_id]["busy"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|b| {
                        let start = b["start"].as_str()?;
                        let end = b["end"].as_str()?;
                        Some(BusyInterval {
                            start: DateTime::parse_from_rfc3339(start)
                                .ok()?
                                .with_timezone(&zone),
                            end: DateTime::parse_from_rfc3339(end).ok()?.with_timezone(&zone),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(busy)
    }
}
