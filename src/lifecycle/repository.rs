use serde::{Deserialize, Serialize};

use super::domain::{GuaranteeId, GuaranteeRequest, GuaranteeStatus};

/// Versioned persistence wrapper. `version` is the optimistic-concurrency
/// token: updates carry the version they read and stale writers are refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuaranteeRecord {
    pub version: u64,
    pub request: GuaranteeRequest,
}

/// Storage abstraction so the lifecycle service can be exercised in
/// isolation. Implementations live outside the engine.
pub trait GuaranteeRepository: Send + Sync {
    fn insert(&self, request: GuaranteeRequest) -> Result<GuaranteeRecord, RepositoryError>;
    /// Replace the stored request if `record.version` still matches, bumping
    /// the version; otherwise fail with `StaleVersion`.
    fn update(&self, record: GuaranteeRecord) -> Result<GuaranteeRecord, RepositoryError>;
    fn fetch(&self, id: &GuaranteeId) -> Result<Option<GuaranteeRecord>, RepositoryError>;
    fn by_status(
        &self,
        status: GuaranteeStatus,
        limit: usize,
    ) -> Result<Vec<GuaranteeRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("stale write: expected version {expected}, found {found}")]
    StaleVersion { expected: u64, found: u64 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
