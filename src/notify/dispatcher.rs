use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use super::payload::{lightweight_payload, snapshot_payload, SnapshotSources};
use crate::lifecycle::{GuaranteeRequest, TransitionNotifier};

/// Outbound HTTP seam. Implementations bound their own timeout and treat
/// non-success responses as errors.
pub trait WebhookSender: Send + Sync {
    fn post_json(&self, url: &str, body: &Value) -> Result<(), WebhookError>;
}

/// Webhook delivery failure. Always caught inside the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook transport failed: {0}")]
    Transport(String),
    #[error("webhook endpoint returned status {0}")]
    Status(u16),
}

/// Assembles event payloads and best-effort-delivers them to the configured
/// endpoint. Failures are logged and swallowed; a transition never fails
/// because its notification did.
pub struct NotificationDispatcher<S, W> {
    sources: Arc<S>,
    sender: Arc<W>,
    endpoint: String,
}

impl<S, W> NotificationDispatcher<S, W>
where
    S: SnapshotSources + 'static,
    W: WebhookSender + 'static,
{
    pub fn new(sources: Arc<S>, sender: Arc<W>, endpoint: impl Into<String>) -> Self {
        Self {
            sources,
            sender,
            endpoint: endpoint.into(),
        }
    }

    fn deliver(&self, request: &GuaranteeRequest, event: &str, body: Value) {
        match self.sender.post_json(&self.endpoint, &body) {
            Ok(()) => {
                info!(request = %request.id.0, event, "notification delivered");
            }
            Err(err) => {
                warn!(request = %request.id.0, event, %err, "notification dropped");
            }
        }
    }
}

impl<S, W> TransitionNotifier for NotificationDispatcher<S, W>
where
    S: SnapshotSources + 'static,
    W: WebhookSender + 'static,
{
    fn lightweight(&self, request: &GuaranteeRequest, event: &str) {
        let body = lightweight_payload(request, event);
        self.deliver(request, event, body);
    }

    fn full_snapshot(&self, request: &GuaranteeRequest, event: &str) {
        let body = snapshot_payload(self.sources.as_ref(), request, event, Utc::now());
        self.deliver(request, event, body);
    }
}
