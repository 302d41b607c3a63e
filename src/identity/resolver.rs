use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::hasher::{CredentialHasher, HashingError};
use crate::lifecycle::AccountId;

/// Role marker carried by every account this module creates.
pub const TENANT_ROLE: &str = "tenant";

/// Personal data submitted for resolution, as captured on the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalData {
    pub name: String,
    pub email: String,
    pub national_id: String,
    pub phone: String,
}

/// Platform account for a tenant. Lives independently of any single
/// guarantee request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantAccount {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub national_id: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub credential_hash: String,
    pub verified: bool,
    pub role: String,
}

/// Storage abstraction for tenant accounts.
pub trait TenantAccountStore: Send + Sync {
    /// OR-match: a record matching on either email or national id alone
    /// counts as found. Only tenant-role accounts are considered.
    fn find_tenant(
        &self,
        email: &str,
        national_id: &str,
    ) -> Result<Option<TenantAccount>, AccountStoreError>;
    fn insert(&self, account: TenantAccount) -> Result<TenantAccount, AccountStoreError>;
}

/// Error enumeration for account store failures.
#[derive(Debug, thiserror::Error)]
pub enum AccountStoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("account already exists")]
    Duplicate,
    #[error("account store unavailable: {0}")]
    Unavailable(String),
}

/// Error raised by identity resolution.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("email already registered")]
    EmailAlreadyRegistered,
    #[error("unable to create tenant account")]
    Creation(String),
    #[error(transparent)]
    Hashing(#[from] HashingError),
    #[error("account store unavailable: {0}")]
    Store(String),
}

/// Resolution result: the account plus whether this call created it.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedTenant {
    pub account: TenantAccount,
    pub is_new: bool,
}

static ACCOUNT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_account_id() -> AccountId {
    let id = ACCOUNT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AccountId(format!("acct-{id:06}"))
}

/// Resolves or creates tenant accounts. Independent of guarantee status;
/// the analyst workflow calls this before linking an account to a request.
pub struct IdentityResolver<S, H> {
    store: Arc<S>,
    hasher: Arc<H>,
}

impl<S, H> IdentityResolver<S, H>
where
    S: TenantAccountStore + 'static,
    H: CredentialHasher + 'static,
{
    pub fn new(store: Arc<S>, hasher: Arc<H>) -> Self {
        Self { store, hasher }
    }

    /// Find an existing tenant account by email or national id, or create
    /// one with an initial credential derived from the national id digits.
    /// Creation races surface as conflicts and are never retried here.
    pub fn resolve_or_create(&self, data: PersonalData) -> Result<ResolvedTenant, IdentityError> {
        let existing = self
            .store
            .find_tenant(&data.email, &data.national_id)
            .map_err(store_failure)?;
        if let Some(account) = existing {
            return Ok(ResolvedTenant {
                account,
                is_new: false,
            });
        }

        let initial_credential: String = data
            .national_id
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        let credential_hash = self.hasher.hash(&initial_credential)?;

        let account = TenantAccount {
            id: next_account_id(),
            name: data.name,
            email: data.email,
            national_id: data.national_id,
            phone: data.phone,
            credential_hash,
            verified: false,
            role: TENANT_ROLE.to_string(),
        };

        match self.store.insert(account) {
            Ok(created) => {
                info!(account = %created.id.0, "tenant account created");
                Ok(ResolvedTenant {
                    account: created,
                    is_new: true,
                })
            }
            Err(AccountStoreError::DuplicateEmail) => Err(IdentityError::EmailAlreadyRegistered),
            Err(AccountStoreError::Duplicate) => Err(IdentityError::Creation(
                "an equivalent account was created concurrently".to_string(),
            )),
            Err(AccountStoreError::Unavailable(detail)) => Err(IdentityError::Creation(detail)),
        }
    }
}

fn store_failure(err: AccountStoreError) -> IdentityError {
    match err {
        AccountStoreError::Unavailable(detail) => IdentityError::Store(detail),
        other => IdentityError::Store(other.to_string()),
    }
}
