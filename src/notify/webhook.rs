use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Runtime;

use super::dispatcher::{WebhookError, WebhookSender};

/// Thin wrapper around a reqwest client allowing synchronous workflows to
/// post events without exposing async details. The client-level timeout
/// bounds every send so a slow endpoint cannot stall a transition.
pub struct HttpWebhookClient {
    client: reqwest::Client,
    runtime: Runtime,
}

impl HttpWebhookClient {
    pub fn new(timeout: Duration) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| WebhookError::Transport(err.to_string()))?;
        let runtime = Runtime::new().map_err(|err| WebhookError::Transport(err.to_string()))?;
        Ok(Self { client, runtime })
    }
}

impl std::fmt::Debug for HttpWebhookClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpWebhookClient").finish_non_exhaustive()
    }
}

impl WebhookSender for HttpWebhookClient {
    fn post_json(&self, url: &str, body: &Value) -> Result<(), WebhookError> {
        let send = async { self.client.post(url).json(body).send().await };
        // Callers may already be on a server runtime worker; blocking there
        // directly would panic.
        let result = match tokio::runtime::Handle::try_current() {
            Ok(_) => tokio::task::block_in_place(|| self.runtime.block_on(send)),
            Err(_) => self.runtime.block_on(send),
        };
        let response = result.map_err(|err| WebhookError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(WebhookError::Status(status.as_u16()))
        }
    }
}
