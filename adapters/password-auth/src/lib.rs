//! password-auth — salted adaptive password hashing for td logins.
//!
//! Purpose
//! - Implement the domain `PasswordHasher` port with Argon2id.
//! - Digests are PHC strings (`$argon2id$v=19$m=...`) so parameters and salt
//!   travel with the hash stored in the `Users.password` column.
//!
//! API
//! - `Argon2Hasher::hash(plaintext)` → PHC digest with a fresh random salt.
//! - `Argon2Hasher::verify(plaintext, digest)` → `true`/`false`; a digest that
//!   does not parse as a PHC string verifies as `false`.

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use domain::{CoreError, PasswordHasher};
use tracing::warn;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HashError {
    #[error("invalid argon2 parameters: {0}")]
    Params(String),
    #[error("hashing failed: {0}")]
    Hash(String),
}

impl From<HashError> for CoreError {
    fn from(e: HashError) -> Self {
        CoreError::Hashing(e.to_string())
    }
}

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    fn to_argon2(self) -> Result<Argon2<'static>, HashError> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| HashError::Params(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MiB
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Argon2id implementation of the `PasswordHasher` port.
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher {
    params: Argon2Params,
}

impl Argon2Hasher {
    pub fn new(params: Argon2Params) -> Self {
        Self { params }
    }

    pub fn hash_password(&self, plaintext: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = self.params.to_argon2()?;
        let hash = argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| HashError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    // Verification uses the parameters embedded in the digest.
    pub fn check_password(&self, plaintext: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(p) => p,
            Err(e) => {
                warn!(err = %e, "stored password digest is not a PHC string");
                return false;
            }
        };
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, CoreError> {
        Ok(self.hash_password(plaintext)?)
    }

    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, CoreError> {
        Ok(self.check_password(plaintext, digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Cheap parameters keep the test suite fast.
    fn hasher() -> Argon2Hasher {
        Argon2Hasher::new(Argon2Params {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
    }

    #[test]
    fn hash_then_verify() {
        let h = hasher();
        let digest = h.hash("test_password_123").unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(h.verify("test_password_123", &digest).unwrap());
        assert!(!h.verify("wrong_password", &digest).unwrap());
    }

    #[test]
    fn same_input_gets_fresh_salt() {
        let h = hasher();
        let a = h.hash("same").unwrap();
        let b = h.hash("same").unwrap();
        assert_ne!(a, b);
        assert!(h.verify("same", &a).unwrap());
        assert!(h.verify("same", &b).unwrap());
    }

    #[test]
    fn malformed_digest_does_not_verify() {
        let h = hasher();
        assert!(!h.verify("pw", "not-a-phc-string").unwrap());
        assert!(!h.verify("pw", "").unwrap());
    }

    #[test]
    fn invalid_params_surface_as_error() {
        let h = Argon2Hasher::new(Argon2Params {
            memory_kib: 1,
            iterations: 0,
            parallelism: 0,
        });
        let err = h.hash("pw").unwrap_err();
        assert!(matches!(err, CoreError::Hashing(_)));
    }
}
