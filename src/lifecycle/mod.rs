//! Guarantee lifecycle engine: the state machine moving requests through
//! analysis, finance, signature, and activation, with a tamper-evident
//! audit trail on every state-affecting operation.

pub mod audit;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub(crate) mod transitions;

#[cfg(test)]
mod tests;

pub use audit::{AuditLog, AuditLogEntry};
pub use domain::{
    AccountId, Actor, ActorRole, AgencyId, GuaranteeId, GuaranteeRequest, GuaranteeStatus,
    GuaranteeSubmission, GuaranteeView, PropertySnapshot, TenantSnapshot,
};
pub use repository::{GuaranteeRecord, GuaranteeRepository, RepositoryError};
pub use router::lifecycle_router;
pub use service::{LifecycleService, TransitionError, TransitionNotifier, TransitionOutcome};
