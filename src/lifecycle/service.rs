use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use super::audit::{AuditLog, AuditLogEntry};
use super::domain::{
    AccountId, Actor, ActorRole, GuaranteeId, GuaranteeRequest, GuaranteeStatus,
    GuaranteeSubmission,
};
use super::repository::{GuaranteeRecord, GuaranteeRepository, RepositoryError};
use super::transitions::{rule_for, NotificationShape, TransitionRule};

/// Seam toward the notification dispatcher. Implementations swallow delivery
/// failures internally; from the transition's point of view these calls
/// cannot fail.
pub trait TransitionNotifier: Send + Sync {
    fn lightweight(&self, request: &GuaranteeRequest, event: &str);
    fn full_snapshot(&self, request: &GuaranteeRequest, event: &str);
}

/// Error raised by lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("{0}")]
    Validation(String),
    #[error("transition from {} to {} is not defined", from.label(), to.label())]
    InvalidTransition {
        from: GuaranteeStatus,
        to: GuaranteeStatus,
    },
    #[error("{} is not permitted to perform this action", role.label())]
    Forbidden { role: ActorRole },
    #[error("guarantee request not found")]
    NotFound,
    #[error("the request was modified by another caller; re-read and retry")]
    Conflict,
    #[error(transparent)]
    Repository(RepositoryError),
}

/// Result of a successful transition: the new status plus a caller-facing
/// summary of what changed.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub id: GuaranteeId,
    pub status: &'static str,
    pub action: &'static str,
    pub summary: String,
}

static GUARANTEE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_guarantee_id() -> GuaranteeId {
    let id = GUARANTEE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    GuaranteeId(format!("gar-{id:06}"))
}

/// Orchestrator owning status mutation. Validates the transition table,
/// applies guards, persists, appends the audit entry, and fires the
/// notification attached to the edge.
pub struct LifecycleService<G, A, N> {
    guarantees: Arc<G>,
    audit: Arc<A>,
    notifier: Arc<N>,
}

impl<G, A, N> LifecycleService<G, A, N>
where
    G: GuaranteeRepository + 'static,
    A: AuditLog + 'static,
    N: TransitionNotifier + 'static,
{
    pub fn new(guarantees: Arc<G>, audit: Arc<A>, notifier: Arc<N>) -> Self {
        Self {
            guarantees,
            audit,
            notifier,
        }
    }

    /// Open a new request in `UnderReview` on behalf of a realty agency.
    pub fn submit(
        &self,
        submission: GuaranteeSubmission,
        actor: &Actor,
    ) -> Result<GuaranteeRecord, TransitionError> {
        let now = Utc::now();
        let request = GuaranteeRequest {
            id: next_guarantee_id(),
            tenant: submission.tenant,
            property: submission.property,
            status: GuaranteeStatus::UnderReview,
            credit_score: None,
            applied_rate: None,
            rejection_reason: None,
            approval_notes: None,
            payment_link: None,
            guarantee_value: None,
            created_at: now,
            updated_at: now,
            analyzed_at: None,
            activated_at: None,
            agency_id: submission.agency_id,
            tenant_account_id: None,
            created_by: submission.created_by,
        };

        let stored = self
            .guarantees
            .insert(request)
            .map_err(TransitionError::Repository)?;
        self.append_audit(AuditLogEntry::record(
            stored.request.id.clone(),
            "request created",
            actor,
            Some(format!("agency {}", stored.request.agency_id.0)),
        ));
        info!(request = %stored.request.id.0, "guarantee request opened");
        Ok(stored)
    }

    /// Standalone score/rate edit, usable only while under review. Never
    /// changes status; always writes its own audit entry.
    pub fn set_review_terms(
        &self,
        id: &GuaranteeId,
        actor: &Actor,
        credit_score: Option<u16>,
        applied_rate: Option<f32>,
    ) -> Result<GuaranteeRecord, TransitionError> {
        if actor.role != ActorRole::Analyst {
            return Err(TransitionError::Forbidden { role: actor.role });
        }
        if credit_score.is_none() && applied_rate.is_none() {
            return Err(TransitionError::Validation(
                "provide a credit score, an applied rate, or both".to_string(),
            ));
        }

        let mut record = self.fetch_record(id)?;
        if record.request.status != GuaranteeStatus::UnderReview {
            return Err(TransitionError::Validation(
                "score and rate can only be edited while the request is under review".to_string(),
            ));
        }

        if let Some(score) = credit_score {
            crate::pricing::rate_for(score)
                .map_err(|err| TransitionError::Validation(err.to_string()))?;
            record.request.credit_score = Some(score);
        }
        if let Some(rate) = applied_rate {
            record.request.applied_rate = Some(rate);
        }
        record.request.updated_at = Utc::now();

        let stored = self.persist(record)?;
        self.append_audit(AuditLogEntry::record(
            stored.request.id.clone(),
            "credit review updated",
            actor,
            Some(review_details(&stored.request)),
        ));
        Ok(stored)
    }

    /// UnderReview -> Approved. Requires both score and rate; the analyst
    /// may override the proposed rate in the same call.
    pub fn approve(
        &self,
        id: &GuaranteeId,
        actor: &Actor,
        rate_override: Option<f32>,
        notes: Option<String>,
    ) -> Result<TransitionOutcome, TransitionError> {
        let (stored, rule) = self.apply(
            id,
            actor,
            GuaranteeStatus::Approved,
            notes.clone(),
            |request| {
                if let Some(rate) = rate_override {
                    request.applied_rate = Some(rate);
                }
                if request.credit_score.is_none() || request.applied_rate.is_none() {
                    return Err(TransitionError::Validation(
                        "score and rate are required before approval".to_string(),
                    ));
                }
                request.approval_notes = notes.clone();
                request.analyzed_at = Some(Utc::now());
                Ok(())
            },
        )?;

        let summary = format!(
            "approved with score {} at {}%",
            stored.request.credit_score.unwrap_or_default(),
            stored.request.applied_rate.unwrap_or_default(),
        );
        Ok(outcome(&stored, rule, summary))
    }

    /// UnderReview -> Rejected. Requires a non-empty reason.
    pub fn reject(
        &self,
        id: &GuaranteeId,
        actor: &Actor,
        reason: &str,
    ) -> Result<TransitionOutcome, TransitionError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(TransitionError::Validation(
                "a rejection reason is required".to_string(),
            ));
        }
        let reason = reason.to_string();
        let (stored, rule) = self.apply(
            id,
            actor,
            GuaranteeStatus::Rejected,
            Some(reason.clone()),
            |request| {
                request.rejection_reason = Some(reason.clone());
                request.analyzed_at = Some(Utc::now());
                Ok(())
            },
        )?;
        Ok(outcome(&stored, rule, format!("rejected: {reason}")))
    }

    /// Approved -> SentToFinance.
    pub fn send_to_finance(
        &self,
        id: &GuaranteeId,
        actor: &Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        let (stored, rule) =
            self.apply(id, actor, GuaranteeStatus::SentToFinance, None, |_| Ok(()))?;
        Ok(outcome(&stored, rule, "forwarded to finance".to_string()))
    }

    /// SentToFinance -> PaymentLinkAvailable. Requires the link.
    pub fn attach_payment_link(
        &self,
        id: &GuaranteeId,
        actor: &Actor,
        link: &str,
    ) -> Result<TransitionOutcome, TransitionError> {
        let link = link.trim();
        if link.is_empty() {
            return Err(TransitionError::Validation(
                "a payment link is required".to_string(),
            ));
        }
        let link = link.to_string();
        let (stored, rule) = self.apply(
            id,
            actor,
            GuaranteeStatus::PaymentLinkAvailable,
            Some(link.clone()),
            |request| {
                request.payment_link = Some(link.clone());
                Ok(())
            },
        )?;
        Ok(outcome(&stored, rule, "payment link published".to_string()))
    }

    /// PaymentLinkAvailable -> ProofSubmitted.
    pub fn submit_proof(
        &self,
        id: &GuaranteeId,
        actor: &Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        let (stored, rule) =
            self.apply(id, actor, GuaranteeStatus::ProofSubmitted, None, |_| Ok(()))?;
        Ok(outcome(
            &stored,
            rule,
            "proof of payment recorded".to_string(),
        ))
    }

    /// PaymentLinkAvailable|ProofSubmitted -> PaymentConfirmed. The snapshot
    /// notification on this edge is always attempted.
    pub fn confirm_payment(
        &self,
        id: &GuaranteeId,
        actor: &Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        let (stored, rule) = self.apply(
            id,
            actor,
            GuaranteeStatus::PaymentConfirmed,
            None,
            |_| Ok(()),
        )?;
        Ok(outcome(&stored, rule, "payment confirmed".to_string()))
    }

    /// PaymentConfirmed -> AwaitingRealtorSignature.
    pub fn send_for_signature(
        &self,
        id: &GuaranteeId,
        actor: &Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        let (stored, rule) = self.apply(
            id,
            actor,
            GuaranteeStatus::AwaitingRealtorSignature,
            None,
            |_| Ok(()),
        )?;
        Ok(outcome(
            &stored,
            rule,
            "contract sent for realtor signature".to_string(),
        ))
    }

    /// AwaitingRealtorSignature -> Active, driven by signature completion.
    /// Records the activation instant the expiry guard counts from.
    pub fn activate(
        &self,
        id: &GuaranteeId,
        actor: &Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        let (stored, rule) = self.apply(id, actor, GuaranteeStatus::Active, None, |request| {
            request.activated_at = Some(Utc::now());
            Ok(())
        })?;
        Ok(outcome(&stored, rule, "guarantee activated".to_string()))
    }

    /// Active -> Expired once the lease term has elapsed at `as_of`.
    pub fn expire(
        &self,
        id: &GuaranteeId,
        actor: &Actor,
        as_of: DateTime<Utc>,
    ) -> Result<TransitionOutcome, TransitionError> {
        let (stored, rule) = self.apply(id, actor, GuaranteeStatus::Expired, None, |request| {
            match request.lease_end() {
                Some(end) if as_of >= end => Ok(()),
                Some(end) => Err(TransitionError::Validation(format!(
                    "lease term has not elapsed (runs until {end})"
                ))),
                None => Err(TransitionError::Validation(
                    "lease end date cannot be computed".to_string(),
                )),
            }
        })?;
        Ok(outcome(&stored, rule, "guarantee expired".to_string()))
    }

    /// Scheduled sweep: expire every active guarantee whose lease term has
    /// elapsed at `as_of`. Requests not yet due are left untouched; a record
    /// that fails to expire is logged and skipped so it cannot hide the
    /// work already completed in the same pass.
    pub fn expire_due(
        &self,
        as_of: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TransitionOutcome>, TransitionError> {
        let actor = Actor::automation();
        let candidates = self
            .guarantees
            .by_status(GuaranteeStatus::Active, limit)
            .map_err(TransitionError::Repository)?;

        let mut outcomes = Vec::new();
        for record in candidates {
            if matches!(record.request.lease_end(), Some(end) if as_of >= end) {
                match self.expire(&record.request.id, &actor, as_of) {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(err) => {
                        warn!(request = %record.request.id.0, %err, "expiry skipped");
                    }
                }
            }
        }
        Ok(outcomes)
    }

    /// Store the resolved tenant account on the request. Once set the link
    /// is permanent; re-linking the same account is a no-op.
    pub fn link_tenant_account(
        &self,
        id: &GuaranteeId,
        actor: &Actor,
        account_id: AccountId,
    ) -> Result<GuaranteeRecord, TransitionError> {
        if actor.role != ActorRole::Analyst {
            return Err(TransitionError::Forbidden { role: actor.role });
        }

        let mut record = self.fetch_record(id)?;
        if let Some(existing) = &record.request.tenant_account_id {
            if *existing == account_id {
                return Ok(record);
            }
            return Err(TransitionError::Validation(
                "a different tenant account is already linked".to_string(),
            ));
        }

        record.request.tenant_account_id = Some(account_id.clone());
        record.request.updated_at = Utc::now();
        let stored = self.persist(record)?;
        self.append_audit(AuditLogEntry::record(
            stored.request.id.clone(),
            "tenant account linked",
            actor,
            Some(account_id.0),
        ));
        Ok(stored)
    }

    pub fn get(&self, id: &GuaranteeId) -> Result<GuaranteeRecord, TransitionError> {
        self.fetch_record(id)
    }

    pub fn audit_trail(&self, id: &GuaranteeId) -> Result<Vec<AuditLogEntry>, TransitionError> {
        self.audit
            .entries_for(id)
            .map_err(TransitionError::Repository)
    }

    fn apply<F>(
        &self,
        id: &GuaranteeId,
        actor: &Actor,
        to: GuaranteeStatus,
        details: Option<String>,
        mutate: F,
    ) -> Result<(GuaranteeRecord, &'static TransitionRule), TransitionError>
    where
        F: FnOnce(&mut GuaranteeRequest) -> Result<(), TransitionError>,
    {
        let mut record = self.fetch_record(id)?;
        let from = record.request.status;
        let rule = rule_for(from, to).ok_or(TransitionError::InvalidTransition { from, to })?;
        if !rule.roles.contains(&actor.role) {
            return Err(TransitionError::Forbidden { role: actor.role });
        }

        mutate(&mut record.request)?;
        record.request.status = to;
        record.request.updated_at = Utc::now();

        let stored = self.persist(record)?;
        self.append_audit(AuditLogEntry::record(
            stored.request.id.clone(),
            rule.action,
            actor,
            details,
        ));

        match rule.notification {
            NotificationShape::None => {}
            NotificationShape::Lightweight(event) => {
                self.notifier.lightweight(&stored.request, event);
            }
            NotificationShape::FullSnapshot(event) => {
                self.notifier.full_snapshot(&stored.request, event);
            }
        }

        info!(
            request = %stored.request.id.0,
            from = from.label(),
            to = to.label(),
            "guarantee transition applied"
        );
        Ok((stored, rule))
    }

    fn fetch_record(&self, id: &GuaranteeId) -> Result<GuaranteeRecord, TransitionError> {
        self.guarantees
            .fetch(id)
            .map_err(TransitionError::Repository)?
            .ok_or(TransitionError::NotFound)
    }

    fn persist(&self, record: GuaranteeRecord) -> Result<GuaranteeRecord, TransitionError> {
        match self.guarantees.update(record) {
            Ok(stored) => Ok(stored),
            Err(RepositoryError::StaleVersion { .. }) => Err(TransitionError::Conflict),
            Err(other) => Err(TransitionError::Repository(other)),
        }
    }

    // Audit completeness is a compliance requirement but is not enforced
    // transactionally; a failed append must be loud, never fatal.
    fn append_audit(&self, entry: AuditLogEntry) {
        if let Err(err) = self.audit.append(entry) {
            error!(%err, "audit append failed after status write");
        }
    }
}

fn outcome(
    record: &GuaranteeRecord,
    rule: &'static TransitionRule,
    summary: String,
) -> TransitionOutcome {
    TransitionOutcome {
        id: record.request.id.clone(),
        status: record.request.status.label(),
        action: rule.action,
        summary,
    }
}

fn review_details(request: &GuaranteeRequest) -> String {
    match (request.credit_score, request.applied_rate) {
        (Some(score), Some(rate)) => format!("score {score}, rate {rate}%"),
        (Some(score), None) => format!("score {score}"),
        (None, Some(rate)) => format!("rate {rate}%"),
        (None, None) => "no terms recorded".to_string(),
    }
}
