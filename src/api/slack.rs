use crate::api::check_status;
use crate::error::Result;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

const SERVICE: &str = "Slack";

/// Posts rendered markup to a Slack incoming webhook
pub struct SlackWebhook {
    url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    text: &'a str,
    mrkdwn: bool,
}

impl SlackWebhook {
    pub fn new(url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { url, client })
    }

    pub async fn publish(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookMessage { text, mrkdwn: true })
            .send()
            .await?;
        check_status(SERVICE, response).await?;
        tracing::info!(bytes = text.len(), "published to Slack");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_payload() {
        let payload = serde_json::to_value(WebhookMessage {
            text: "*Weekly*",
            mrkdwn: true,
        })
        .unwrap();
        assert_eq!(payload, serde_json::json!({ "text": "*Weekly*", "mrkdwn": true }));
    }
}
