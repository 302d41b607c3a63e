//! Integration scenarios for the guarantee lifecycle engine, driven through
//! the public service facade, the real notification dispatcher, and the HTTP
//! router, with in-memory stores standing in for persistence.

mod common {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde_json::Value;

    use guarantee_engine::lifecycle::{
        AccountId, Actor, ActorRole, AgencyId, AuditLog, AuditLogEntry, GuaranteeId,
        GuaranteeRecord, GuaranteeRepository, GuaranteeRequest, GuaranteeStatus,
        GuaranteeSubmission, PropertySnapshot, RepositoryError, TenantSnapshot,
    };
    use guarantee_engine::notify::{SnapshotSources, SourceError, WebhookError, WebhookSender};

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
            self.entries
                .lock()
                .expect("audit mutex poisoned")
                .push(entry);
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

    /// Sources with no agency or tenant profiles and a contract table that
    /// is offline, to exercise every snapshot fallback at once.
    pub(super) struct OfflineSources;

    impl SnapshotSources for OfflineSources {
        fn agency_profile(&self, _: &AgencyId) -> Result<Option<Value>, SourceError> {
            Ok(None)
        }
        fn tenant_profile(&self, _: &AccountId) -> Result<Option<Value>, SourceError> {
            Ok(None)
        }
        fn contract_for(&self, _: &GuaranteeId) -> Result<Option<Value>, SourceError> {
            Err(SourceError::Lookup("contract table offline".to_string()))
        }
    }

    #[derive(Default)]
    pub(super) struct RecordingSender {
        pub(super) deliveries: Mutex<Vec<(String, Value)>>,
        pub(super) fail: bool,
    }

    impl RecordingSender {
        pub(super) fn payloads(&self) -> Vec<Value> {
            self.deliveries
                .lock()
                .expect("sender mutex poisoned")
                .iter()
                .map(|(_, body)| body.clone())
                .collect()
        }
    }

    impl WebhookSender for RecordingSender {
        fn post_json(&self, url: &str, body: &Value) -> Result<(), WebhookError> {
            self.deliveries
                .lock()
                .expect("sender mutex poisoned")
                .push((url.to_string(), body.clone()));
            if self.fail {
                Err(WebhookError::Status(503))
            } else {
                Ok(())
            }
        }
    }

    pub(super) fn submission() -> GuaranteeSubmission {
        GuaranteeSubmission {
            tenant: TenantSnapshot {
                name: "Marina Duarte".to_string(),
                national_id: "123.456.789-09".to_string(),
                email: "marina@example.com".to_string(),
                phone: "+55 11 98888-0000".to_string(),
                monthly_income: 5400.0,
                address: "Rua das Laranjeiras 120, São Paulo".to_string(),
            },
            property: PropertySnapshot {
                property_type: "apartment".to_string(),
                rent_value: 1800.0,
                address: "Av. Paulista 900, São Paulo".to_string(),
                lease_months: 30,
            },
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
}

use std::sync::Arc;

use serde_json::json;

use common::*;
use guarantee_engine::lifecycle::{GuaranteeStatus, LifecycleService, TransitionError};
use guarantee_engine::notify::NotificationDispatcher;
use guarantee_engine::pricing;

type EngineUnderTest = LifecycleService<
    MemoryGuarantees,
    MemoryAudit,
    NotificationDispatcher<OfflineSources, RecordingSender>,
>;

fn build_engine(fail_deliveries: bool) -> (EngineUnderTest, Arc<MemoryAudit>, Arc<RecordingSender>) {
    let guarantees = Arc::new(MemoryGuarantees::default());
    let audit = Arc::new(MemoryAudit::default());
    let sender = Arc::new(RecordingSender {
        deliveries: std::sync::Mutex::new(Vec::new()),
        fail: fail_deliveries,
    });
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::new(OfflineSources),
        sender.clone(),
        "https://hooks.example.com/contract-events",
    ));
    let service = LifecycleService::new(guarantees, audit.clone(), dispatcher);
    (service, audit, sender)
}

#[test]
fn analyst_review_round_trip() {
    let (engine, audit, sender) = build_engine(false);

    let record = engine.submit(submission(), &agency()).expect("submitted");
    let id = record.request.id.clone();

    // Approval is blocked until the review terms exist.
    match engine.approve(&id, &analyst(), None, None) {
        Err(TransitionError::Validation(_)) => {}
        other => panic!("expected validation error, got {other:?}"),
    }
    let stored = engine.get(&id).expect("fetch");
    assert_eq!(stored.request.status, GuaranteeStatus::UnderReview);

    let rate = pricing::rate_for(720).expect("720 is in range");
    assert_eq!(rate, 10.0);
    engine
        .set_review_terms(&id, &analyst(), Some(720), Some(rate))
        .expect("terms stored");

    let outcome = engine
        .approve(&id, &analyst(), None, None)
        .expect("approval applies");
    assert_eq!(outcome.status, "approved");

    let entries = audit.entries();
    let approvals: Vec<_> = entries
        .iter()
        .filter(|entry| entry.action == "approved")
        .collect();
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].actor_display_name, "Ana Lima");

    assert!(
        sender.payloads().is_empty(),
        "no webhook traffic before the finance phase"
    );
}

#[test]
fn payment_phase_emits_the_contracted_payload_shapes() {
    let (engine, _, sender) = build_engine(false);

    let record = engine.submit(submission(), &agency()).expect("submitted");
    let id = record.request.id.clone();

    engine
        .set_review_terms(&id, &analyst(), Some(720), Some(10.0))
        .expect("terms stored");
    engine.approve(&id, &analyst(), None, None).expect("approved");
    engine.send_to_finance(&id, &agency()).expect("sent to finance");
    engine
        .attach_payment_link(&id, &finance(), "https://pay.example.com/x")
        .expect("link attached");
    engine.confirm_payment(&id, &finance()).expect("confirmed");

    let payloads = sender.payloads();
    assert_eq!(payloads.len(), 2);

    // First delivery: the lightweight shape, no joined entities.
    assert_eq!(payloads[0]["eventName"], json!("payment_link_available"));
    assert_eq!(payloads[0]["contractStatus"], json!("payment_link_available"));
    assert!(payloads[0].get("request").is_none());

    // Second delivery: the full snapshot, with every lookup falling back.
    assert_eq!(payloads[1]["eventName"], json!("payment_confirmed"));
    assert_eq!(payloads[1]["request"]["id"], json!(id.0));
    assert_eq!(payloads[1]["tenant"]["email"], json!("marina@example.com"));
    assert_eq!(payloads[1]["realtyAgency"]["id"], json!("agency-007"));
    assert_eq!(payloads[1]["contract"]["status"], json!("pending_generation"));
}

#[test]
fn webhook_outage_never_blocks_the_lifecycle() {
    let (engine, audit, sender) = build_engine(true);

    let record = engine.submit(submission(), &agency()).expect("submitted");
    let id = record.request.id.clone();

    engine
        .set_review_terms(&id, &analyst(), Some(820), Some(8.0))
        .expect("terms stored");
    engine.approve(&id, &analyst(), None, None).expect("approved");
    engine.send_to_finance(&id, &agency()).expect("sent to finance");
    engine
        .attach_payment_link(&id, &finance(), "https://pay.example.com/x")
        .expect("link attached despite webhook outage");
    engine
        .confirm_payment(&id, &finance())
        .expect("confirmed despite webhook outage");

    assert_eq!(
        engine.get(&id).expect("fetch").request.status,
        GuaranteeStatus::PaymentConfirmed
    );
    assert_eq!(sender.payloads().len(), 2, "deliveries were still attempted");

    let actions: Vec<String> = audit
        .entries()
        .into_iter()
        .map(|entry| entry.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            "request created".to_string(),
            "credit review updated".to_string(),
            "approved".to_string(),
            "sent to finance".to_string(),
            "payment link attached".to_string(),
            "payment confirmed".to_string(),
        ]
    );
}
