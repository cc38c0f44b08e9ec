use crate::error::EngineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

/// Body posted to a destination webhook. Discord-compatible.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    pub content: String,
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, url: &Url, payload: &NotificationPayload) -> Result<(), EngineError>;
}
