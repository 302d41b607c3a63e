use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for guarantee requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuaranteeId(pub String);

/// Identifier for a realty agency profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgencyId(pub String);

/// Identifier for a platform account (actors and linked tenant accounts).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

/// Closed set of lifecycle states. The transition table in `transitions.rs`
/// is the only place that knows which pairs are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuaranteeStatus {
    UnderReview,
    Approved,
    Rejected,
    SentToFinance,
    PaymentLinkAvailable,
    ProofSubmitted,
    PaymentConfirmed,
    AwaitingRealtorSignature,
    Active,
    Expired,
}

impl GuaranteeStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::SentToFinance => "sent_to_finance",
            Self::PaymentLinkAvailable => "payment_link_available",
            Self::ProofSubmitted => "proof_submitted",
            Self::PaymentConfirmed => "payment_confirmed",
            Self::AwaitingRealtorSignature => "awaiting_realtor_signature",
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }
}

/// Organizational roles allowed to drive transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Analyst,
    RealtyAgency,
    Finance,
    Tenant,
    Automation,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Analyst => "credit analyst",
            Self::RealtyAgency => "realty agency",
            Self::Finance => "finance",
            Self::Tenant => "tenant",
            Self::Automation => "automation",
        }
    }
}

/// Identity attached to every state-affecting call. System-triggered actions
/// carry no account id, only a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Option<AccountId>,
    pub display_name: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn automation() -> Self {
        Self {
            id: None,
            display_name: "system".to_string(),
            role: ActorRole::Automation,
        }
    }
}

/// Tenant fields captured inline on the request at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantSnapshot {
    pub name: String,
    pub national_id: String,
    pub email: String,
    pub phone: String,
    pub monthly_income: f64,
    pub address: String,
}

/// Property fields captured inline on the request at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySnapshot {
    pub property_type: String,
    pub rent_value: f64,
    pub address: String,
    pub lease_months: u32,
}

/// Payload a realty agency submits to open a guarantee request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuaranteeSubmission {
    pub tenant: TenantSnapshot,
    pub property: PropertySnapshot,
    pub agency_id: AgencyId,
    pub created_by: AccountId,
}

/// The guarantee request as persisted. Status is mutated only by the
/// lifecycle service; `guarantee_value` is computed downstream and never
/// written by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuaranteeRequest {
    pub id: GuaranteeId,
    pub tenant: TenantSnapshot,
    pub property: PropertySnapshot,
    pub status: GuaranteeStatus,
    pub credit_score: Option<u16>,
    pub applied_rate: Option<f32>,
    pub rejection_reason: Option<String>,
    pub approval_notes: Option<String>,
    pub payment_link: Option<String>,
    pub guarantee_value: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub agency_id: AgencyId,
    pub tenant_account_id: Option<AccountId>,
    pub created_by: AccountId,
}

impl GuaranteeRequest {
    /// End of the lease counted from the activation instant. `None` until
    /// the request has been activated.
    pub fn lease_end(&self) -> Option<DateTime<Utc>> {
        self.activated_at
            .and_then(|at| at.checked_add_months(Months::new(self.property.lease_months)))
    }
}

/// Sanitized view returned to callers after a read or a transition.
#[derive(Debug, Clone, Serialize)]
pub struct GuaranteeView {
    pub id: GuaranteeId,
    pub status: &'static str,
    pub credit_score: Option<u16>,
    pub applied_rate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl GuaranteeRequest {
    pub fn view(&self) -> GuaranteeView {
        GuaranteeView {
            id: self.id.clone(),
            status: self.status.label(),
            credit_score: self.credit_score,
            applied_rate: self.applied_rate,
            rejection_reason: self.rejection_reason.clone(),
            updated_at: self.updated_at,
        }
    }
}
