use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AccountId, Actor, GuaranteeId};
use super::repository::RepositoryError;

/// Append-only record of one state-affecting action. Never updated or
/// deleted once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub request_id: GuaranteeId,
    pub action: String,
    pub actor_id: Option<AccountId>,
    pub actor_display_name: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn record(
        request_id: GuaranteeId,
        action: &str,
        actor: &Actor,
        details: Option<String>,
    ) -> Self {
        Self {
            request_id,
            action: action.to_string(),
            actor_id: actor.id.clone(),
            actor_display_name: actor.display_name.clone(),
            details,
            created_at: Utc::now(),
        }
    }
}

/// Append-only store for the audit trail.
pub trait AuditLog: Send + Sync {
    fn append(&self, entry: AuditLogEntry) -> Result<(), RepositoryError>;
    fn entries_for(&self, id: &GuaranteeId) -> Result<Vec<AuditLogEntry>, RepositoryError>;
}
