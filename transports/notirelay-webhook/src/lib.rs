use async_trait::async_trait;
use notirelay_core::error::EngineError;
use notirelay_core::transport::{NotificationPayload, NotificationSender};
use tracing::debug;
use url::Url;

/// Posts notifications as JSON to incoming-webhook URLs (Discord, Slack-compatible relays).
#[derive(Default)]
pub struct WebhookSender {
    client: reqwest::Client,
}

impl WebhookSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotificationSender for WebhookSender {
    async fn send(&self, url: &Url, payload: &NotificationPayload) -> Result<(), EngineError> {
        let response = self
            .client
            .post(url.clone())
            .json(payload)
            .send()
            .await
            .map_err(|e| EngineError::TransientExternal(e.to_string()))?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "Webhook responded");
        if !status.is_success() {
            return Err(EngineError::TransientExternal(format!(
                "webhook returned {status}"
            )));
        }
        Ok(())
    }
}
