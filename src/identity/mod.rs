//! Tenant identity resolution: deduplicates or creates the platform account
//! a guarantee request's tenant is linked to.

pub mod hasher;
pub mod resolver;
pub mod router;

pub use hasher::{Argon2Hasher, CredentialHasher, HashingError};
pub use resolver::{
    AccountStoreError, IdentityError, IdentityResolver, PersonalData, ResolvedTenant,
    TenantAccount, TenantAccountStore, TENANT_ROLE,
};
pub use router::identity_router;
