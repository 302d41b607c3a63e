use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::lifecycle::audit::{AuditLog, AuditLogEntry};
use crate::lifecycle::domain::{
    Actor, ActorRole, AgencyId, GuaranteeId, GuaranteeRequest, GuaranteeStatus,
    GuaranteeSubmission, PropertySnapshot, TenantSnapshot,
};
use crate::lifecycle::repository::{GuaranteeRecord, GuaranteeRepository, RepositoryError};
use crate::lifecycle::service::{LifecycleService, TransitionNotifier};
use crate::lifecycle::AccountId;

pub(super) fn tenant_snapshot() -> TenantSnapshot {
    TenantSnapshot {
        name: "Marina Duarte".to_string(),
        national_id: "123.456.789-09".to_string(),
        email: "marina@example.com".to_string(),
        phone: "+55 11 98888-0000".to_string(),
        monthly_income: 5400.0,
        address: "Rua das Laranjeiras 120, São Paulo".to_string(),
    }
}

pub(super) fn property_snapshot() -> PropertySnapshot {
    PropertySnapshot {
        property_type: "apartment".to_string(),
        rent_value: 1800.0,
        address: "Av. Paulista 900, São Paulo".to_string(),
        lease_months: 30,
    }
}

pub(super) fn submission() -> GuaranteeSubmission {
    GuaranteeSubmission {
        tenant: tenant_snapshot(),
        property: property_snapshot(),
        agency_id: AgencyId("agency-007".to_string()),
        created_by: AccountId("acct-agency-01".to_string()),
    }
}

pub(super) fn analyst() -> Actor {
    Actor {
        id: Some(AccountId("acct-analyst-01".to_string())),
        display_name: "Ana Lima".to_string(),
        role: ActorRole::Analyst,
    }
}

pub(super) fn agency() -> Actor {
    Actor {
        id: Some(AccountId("acct-agency-01".to_string())),
        display_name: "Imob Prime".to_string(),
        role: ActorRole::RealtyAgency,
    }
}

pub(super) fn finance() -> Actor {
    Actor {
        id: Some(AccountId("acct-finance-01".to_string())),
        display_name: "Paulo Reis".to_string(),
        role: ActorRole::Finance,
    }
}

pub(super) fn automation() -> Actor {
    Actor::automation()
}

#[derive(Default)]
pub(super) struct MemoryGuarantees {
    records: Mutex<HashMap<GuaranteeId, GuaranteeRecord>>,
}

impl GuaranteeRepository for MemoryGuarantees {
    fn insert(&self, request: GuaranteeRequest) -> Result<GuaranteeRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&request.id) {
            return Err(RepositoryError::Conflict);
        }
        let record = GuaranteeRecord {
            version: 1,
            request,
        };
        guard.insert(record.request.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: GuaranteeRecord) -> Result<GuaranteeRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard
            .get(&record.request.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != record.version {
            return Err(RepositoryError::StaleVersion {
                expected: record.version,
                found: stored.version,
            });
        }
        let bumped = GuaranteeRecord {
            version: record.version + 1,
            request: record.request,
        };
        guard.insert(bumped.request.id.clone(), bumped.clone());
        Ok(bumped)
    }

    fn fetch(&self, id: &GuaranteeId) -> Result<Option<GuaranteeRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn by_status(
        &self,
        status: GuaranteeStatus,
        limit: usize,
    ) -> Result<Vec<GuaranteeRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.request.status == status)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Repository that refuses every update with a stale-version conflict, for
/// exercising the concurrent-writer path.
pub(super) struct StaleGuarantees {
    pub(super) inner: MemoryGuarantees,
}

impl GuaranteeRepository for StaleGuarantees {
    fn insert(&self, request: GuaranteeRequest) -> Result<GuaranteeRecord, RepositoryError> {
        self.inner.insert(request)
    }

    fn update(&self, record: GuaranteeRecord) -> Result<GuaranteeRecord, RepositoryError> {
        Err(RepositoryError::StaleVersion {
            expected: record.version,
            found: record.version + 1,
        })
    }

    fn fetch(&self, id: &GuaranteeId) -> Result<Option<GuaranteeRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn by_status(
        &self,
        status: GuaranteeStatus,
        limit: usize,
    ) -> Result<Vec<GuaranteeRecord>, RepositoryError> {
        self.inner.by_status(status, limit)
    }
}

/// Repository that refuses updates for one chosen request, for exercising
/// partial failure in batch sweeps.
#[derive(Default)]
pub(super) struct FlakyGuarantees {
    pub(super) inner: MemoryGuarantees,
    pub(super) fail_for: Mutex<Option<GuaranteeId>>,
}

impl GuaranteeRepository for FlakyGuarantees {
    fn insert(&self, request: GuaranteeRequest) -> Result<GuaranteeRecord, RepositoryError> {
        self.inner.insert(request)
    }

    fn update(&self, record: GuaranteeRecord) -> Result<GuaranteeRecord, RepositoryError> {
        let blocked = self.fail_for.lock().expect("flaky mutex poisoned");
        if blocked.as_ref() == Some(&record.request.id) {
            return Err(RepositoryError::StaleVersion {
                expected: record.version,
                found: record.version + 1,
            });
        }
        drop(blocked);
        self.inner.update(record)
    }

    fn fetch(&self, id: &GuaranteeId) -> Result<Option<GuaranteeRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn by_status(
        &self,
        status: GuaranteeStatus,
        limit: usize,
    ) -> Result<Vec<GuaranteeRecord>, RepositoryError> {
        self.inner.by_status(status, limit)
    }
}

#[derive(Default)]
pub(super) struct MemoryAudit {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl MemoryAudit {
    pub(super) fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditLog for MemoryAudit {
    fn append(&self, entry: AuditLogEntry) -> Result<(), RepositoryError> {
        self.entries.lock().expect("audit mutex poisoned").push(entry);
        Ok(())
    }

    fn entries_for(&self, id: &GuaranteeId) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        let guard = self.entries.lock().expect("audit mutex poisoned");
        Ok(guard
            .iter()
            .filter(|entry| entry.request_id == *id)
            .cloned()
            .collect())
    }
}

/// Audit log that always fails, for verifying appends are loud but not
/// fatal.
pub(super) struct BrokenAudit;

impl AuditLog for BrokenAudit {
    fn append(&self, _entry: AuditLogEntry) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("audit table offline".to_string()))
    }

    fn entries_for(&self, _id: &GuaranteeId) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("audit table offline".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum SentNotification {
    Lightweight { event: String },
    FullSnapshot { event: String },
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
}

impl RecordingNotifier {
    pub(super) fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl TransitionNotifier for RecordingNotifier {
    fn lightweight(&self, _request: &GuaranteeRequest, event: &str) {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(SentNotification::Lightweight {
                event: event.to_string(),
            });
    }

    fn full_snapshot(&self, _request: &GuaranteeRequest, event: &str) {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(SentNotification::FullSnapshot {
                event: event.to_string(),
            });
    }
}

pub(super) type TestService = LifecycleService<MemoryGuarantees, MemoryAudit, RecordingNotifier>;

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryGuarantees>,
    Arc<MemoryAudit>,
    Arc<RecordingNotifier>,
) {
    let guarantees = Arc::new(MemoryGuarantees::default());
    let audit = Arc::new(MemoryAudit::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = LifecycleService::new(guarantees.clone(), audit.clone(), notifier.clone());
    (service, guarantees, audit, notifier)
}

/// Drive a freshly submitted request forward to the given status through
/// the normal operations.
pub(super) fn advance_to<G>(
    service: &LifecycleService<G, MemoryAudit, RecordingNotifier>,
    id: &GuaranteeId,
    target: GuaranteeStatus,
) where
    G: GuaranteeRepository + 'static,
{
    let steps: &[GuaranteeStatus] = &[
        GuaranteeStatus::Approved,
        GuaranteeStatus::SentToFinance,
        GuaranteeStatus::PaymentLinkAvailable,
        GuaranteeStatus::PaymentConfirmed,
        GuaranteeStatus::AwaitingRealtorSignature,
        GuaranteeStatus::Active,
    ];

    for step in steps {
        match step {
            GuaranteeStatus::Approved => {
                service
                    .set_review_terms(id, &analyst(), Some(720), Some(10.0))
                    .expect("review terms stored");
                service
                    .approve(id, &analyst(), None, None)
                    .expect("approval applies");
            }
            GuaranteeStatus::SentToFinance => {
                service
                    .send_to_finance(id, &agency())
                    .expect("sent to finance");
            }
            GuaranteeStatus::PaymentLinkAvailable => {
                service
                    .attach_payment_link(id, &finance(), "https://pay.example.com/x")
                    .expect("payment link attached");
            }
            GuaranteeStatus::PaymentConfirmed => {
                service
                    .confirm_payment(id, &finance())
                    .expect("payment confirmed");
            }
            GuaranteeStatus::AwaitingRealtorSignature => {
                service
                    .send_for_signature(id, &finance())
                    .expect("sent for signature");
            }
            GuaranteeStatus::Active => {
                service.activate(id, &automation()).expect("activated");
            }
            _ => unreachable!("not part of the forward path"),
        }
        if step == &target {
            return;
        }
    }
    panic!("{target:?} is not reachable through advance_to");
}
