//! Owner PIN hashing.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};

use shopledger_core::{DomainError, DomainResult};

/// A salted argon2id PIN hash in PHC string format.
///
/// Newtype so a hash can never be confused with (or logged as) a raw PIN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinHash(String);

impl PinHash {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Hash a PIN with argon2id and a fresh random salt.
pub fn hash_pin(pin: &str) -> DomainResult<PinHash> {
    if pin.len() < 4 {
        return Err(DomainError::validation("PIN must be at least 4 digits"));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| DomainError::validation(format!("failed to hash PIN: {e}")))?;
    Ok(PinHash(hash.to_string()))
}

/// Constant-time verification of a supplied PIN against the stored hash.
///
/// A malformed stored hash verifies as false rather than erroring: the
/// caller treats it the same as a wrong PIN.
pub fn verify_pin(pin: &str, stored: &PinHash) -> bool {
    let Ok(parsed) = PasswordHash::new(stored.as_str()) else {
        return false;
    };
    Argon2::default()
        .verify_password(pin.as_bytes(), &parsed)
        .is_ok()
}
