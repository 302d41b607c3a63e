use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::warn;

use crate::lifecycle::{AccountId, AgencyId, GuaranteeId, GuaranteeRequest};

/// Read-side collaborator joining the records a full snapshot needs. The
/// profiles are opaque to the engine; CRUD for these entities lives in
/// other subsystems.
pub trait SnapshotSources: Send + Sync {
    fn agency_profile(&self, id: &AgencyId) -> Result<Option<Value>, SourceError>;
    fn tenant_profile(&self, id: &AccountId) -> Result<Option<Value>, SourceError>;
    fn contract_for(&self, id: &GuaranteeId) -> Result<Option<Value>, SourceError>;
}

/// Lookup failure while assembling a snapshot. Never aborts assembly.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("snapshot lookup failed: {0}")]
    Lookup(String),
}

/// The low-stakes payload shape: event name and current status only.
pub fn lightweight_payload(request: &GuaranteeRequest, event: &str) -> Value {
    json!({
        "requestId": request.id.0,
        "contractStatus": request.status.label(),
        "eventName": event,
    })
}

/// The full joined view of request, agency, tenant, and contract at dispatch
/// time. Missing or failing tenant and contract lookups fall back to inline
/// data; assembly itself never fails.
pub fn snapshot_payload<S: SnapshotSources>(
    sources: &S,
    request: &GuaranteeRequest,
    event: &str,
    dispatched_at: DateTime<Utc>,
) -> Value {
    let agency = lookup(
        "agency",
        sources.agency_profile(&request.agency_id),
    )
    .unwrap_or_else(|| json!({ "id": request.agency_id.0 }));

    let tenant = request
        .tenant_account_id
        .as_ref()
        .and_then(|account_id| lookup("tenant", sources.tenant_profile(account_id)))
        .unwrap_or_else(|| inline_tenant(request));

    let contract = lookup("contract", sources.contract_for(&request.id))
        .unwrap_or_else(|| contract_placeholder(dispatched_at));

    json!({
        "requestId": request.id.0,
        "contractStatus": request.status.label(),
        "eventName": event,
        "request": request,
        "realtyAgency": agency,
        "tenant": tenant,
        "contract": contract,
        "timestamp": dispatched_at,
    })
}

fn lookup(entity: &str, result: Result<Option<Value>, SourceError>) -> Option<Value> {
    match result {
        Ok(found) => found,
        Err(err) => {
            warn!(entity, %err, "snapshot lookup failed, falling back");
            None
        }
    }
}

/// Fallback tenant object built from the fields stored on the request when
/// no account is linked or the profile lookup fails.
fn inline_tenant(request: &GuaranteeRequest) -> Value {
    json!({
        "name": request.tenant.name,
        "email": request.tenant.email,
        "nationalId": request.tenant.national_id,
        "phone": request.tenant.phone,
        "monthlyIncome": request.tenant.monthly_income,
        "address": request.tenant.address,
    })
}

fn contract_placeholder(dispatched_at: DateTime<Utc>) -> Value {
    json!({
        "status": "pending_generation",
        "generatedAt": dispatched_at,
    })
}
