use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::debug;

use guarantee_engine::identity::{AccountStoreError, TenantAccount, TenantAccountStore, TENANT_ROLE};
use guarantee_engine::lifecycle::{
    AccountId, AgencyId, AuditLog, AuditLogEntry, GuaranteeId, GuaranteeRecord,
    GuaranteeRepository, GuaranteeRequest, GuaranteeStatus, RepositoryError,
};
use guarantee_engine::notify::{HttpWebhookClient, SnapshotSources, SourceError, WebhookError, WebhookSender};

#[derive(Default)]
pub(crate) struct InMemoryGuaranteeRepository {
    records: Mutex<HashMap<GuaranteeId, GuaranteeRecord>>,
}

impl GuaranteeRepository for InMemoryGuaranteeRepository {
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
pub(crate) struct InMemoryAuditLog {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl AuditLog for InMemoryAuditLog {
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

#[derive(Default)]
pub(crate) struct InMemoryTenantAccounts {
    accounts: Mutex<HashMap<AccountId, TenantAccount>>,
}

impl TenantAccountStore for InMemoryTenantAccounts {
    fn find_tenant(
        &self,
        email: &str,
        national_id: &str,
    ) -> Result<Option<TenantAccount>, AccountStoreError> {
        let guard = self.accounts.lock().expect("accounts mutex poisoned");
        Ok(guard
            .values()
            .find(|account| {
                account.role == TENANT_ROLE
                    && (account.email == email || account.national_id == national_id)
            })
            .cloned())
    }

    fn insert(&self, account: TenantAccount) -> Result<TenantAccount, AccountStoreError> {
        let mut guard = self.accounts.lock().expect("accounts mutex poisoned");
        if guard.values().any(|existing| existing.email == account.email) {
            return Err(AccountStoreError::DuplicateEmail);
        }
        if guard.contains_key(&account.id) {
            return Err(AccountStoreError::Duplicate);
        }
        guard.insert(account.id.clone(), account.clone());
        Ok(account)
    }
}

/// Snapshot lookups backed by the in-memory account store. Agency profiles
/// and generated contracts live in systems this deployment does not carry,
/// so those lookups resolve to nothing and the payload assembler falls back
/// to inline data.
pub(crate) struct ProfileSources {
    accounts: Arc<InMemoryTenantAccounts>,
}

impl ProfileSources {
    pub(crate) fn new(accounts: Arc<InMemoryTenantAccounts>) -> Self {
        Self { accounts }
    }
}

impl SnapshotSources for ProfileSources {
    fn agency_profile(&self, _agency_id: &AgencyId) -> Result<Option<Value>, SourceError> {
        Ok(None)
    }

    fn tenant_profile(&self, account_id: &AccountId) -> Result<Option<Value>, SourceError> {
        let guard = self
            .accounts
            .accounts
            .lock()
            .expect("accounts mutex poisoned");
        Ok(guard
            .get(account_id)
            .map(|account| serde_json::to_value(account).unwrap_or(Value::Null)))
    }

    fn contract_for(&self, _id: &GuaranteeId) -> Result<Option<Value>, SourceError> {
        Ok(None)
    }
}

/// Outbound channel selected at startup: a real HTTP client when a webhook
/// URL is configured, otherwise a sink that drops events quietly.
pub(crate) enum OutboundSender {
    Http(HttpWebhookClient),
    Disabled,
}

impl WebhookSender for OutboundSender {
    fn post_json(&self, url: &str, body: &Value) -> Result<(), WebhookError> {
        match self {
            OutboundSender::Http(client) => client.post_json(url, body),
            OutboundSender::Disabled => {
                debug!("webhook delivery disabled; event dropped");
                Ok(())
            }
        }
    }
}
