use metrics::{counter, Counter};
use tracing::{error, info};
use uuid::Uuid;

pub trait Recorder: Send + Sync + 'static {
    fn record_message_sent(&self, event_id: Uuid, template_id: Uuid, destination_id: Uuid);
    fn record_message_failed(
        &self,
        event_id: Uuid,
        template_id: Uuid,
        destination_id: Uuid,
        error: &str,
    );
}

pub struct BaseRecorder {
    sent: Counter,
    failed: Counter,
}

impl BaseRecorder {
    pub fn new() -> Self {
        Self {
            sent: counter!("messages_sent"),
            failed: counter!("messages_failed"),
        }
    }
}

impl Default for BaseRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder for BaseRecorder {
    fn record_message_sent(&self, event_id: Uuid, template_id: Uuid, destination_id: Uuid) {
        self.sent.increment(1);
        info!("Message sent: {event_id}/{template_id}/{destination_id}");
    }

    fn record_message_failed(
        &self,
        event_id: Uuid,
        template_id: Uuid,
        destination_id: Uuid,
        error: &str,
    ) {
        self.failed.increment(1);
        error!("Failed to send message: {event_id}/{template_id}/{destination_id} - {error}");
    }
}
