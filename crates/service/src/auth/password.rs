//! Salted one-way hashing shared by account passwords and refresh-token fingerprints.

use argon2::{
    password_hash::{PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, PasswordHash, Version,
};
use rand::rngs::OsRng;

use super::errors::AuthError;

/// Argon2id cost parameters, fixed for the lifetime of a hasher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HashCost {
    /// Cheapest parameters argon2 accepts. Tests and benches only.
    pub fn minimal() -> Self {
        Self { memory_kib: Params::MIN_M_COST.max(8), iterations: 1, parallelism: 1 }
    }
}

#[derive(Clone)]
pub struct SecretHasher {
    argon: Argon2<'static>,
}

impl SecretHasher {
    pub fn new(cost: HashCost) -> Result<Self, AuthError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| AuthError::HashError(e.to_string()))?;
        Ok(Self { argon: Argon2::new(Algorithm::Argon2id, Version::V0x13, params) })
    }

    /// PHC-formatted digest with a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self
            .argon
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();
        Ok(digest)
    }

    /// `false` for mismatches and for digests that do not parse.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        match PasswordHash::new(digest) {
            Ok(parsed) => self.argon.verify_password(plaintext.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }
}

impl Default for SecretHasher {
    fn default() -> Self {
        Self { argon: Argon2::default() }
    }
}
