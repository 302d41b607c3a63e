use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};

/// One-way hashing collaborator used to derive a tenant's initial
/// credential. Account creation cannot proceed if hashing fails.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, HashingError>;
}

/// Hashing backend failure.
#[derive(Debug, thiserror::Error)]
pub enum HashingError {
    #[error("credential hashing failed: {0}")]
    Backend(String),
}

/// Argon2id hasher producing PHC-format strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashingError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| HashingError::Backend(err.to_string()))
    }
}
