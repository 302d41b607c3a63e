//! Outbound event notification: payload assembly and best-effort webhook
//! delivery to the external contract system.

pub mod dispatcher;
pub mod payload;
pub mod webhook;

pub use dispatcher::{NotificationDispatcher, WebhookError, WebhookSender};
pub use payload::{lightweight_payload, snapshot_payload, SnapshotSources, SourceError};
pub use webhook::HttpWebhookClient;
