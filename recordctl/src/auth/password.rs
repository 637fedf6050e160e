//! Password hashing and verification.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Argon2 hashing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    /// Cheap parameters for tests, where hashing cost only slows the suite down.
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: 128,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn to_argon2(self) -> Result<Argon2<'static>, Error> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None).map_err(|e| Error::Internal {
            operation: format!("create argon2 params: {e}"),
        })?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for Argon2Params {
    /// Argon2id RFC recommendations
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MB
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Hash a password into a PHC string with the given parameters.
pub fn hash_string_with_params(input: &str, params: Argon2Params) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = params
        .to_argon2()?
        .hash_password(input.as_bytes(), &salt)
        .map_err(|e| Error::Internal {
            operation: format!("hash password: {e}"),
        })?;

    Ok(hash.to_string())
}

/// Hash a password with default parameters.
pub fn hash_string(input: &str) -> Result<String, Error> {
    hash_string_with_params(input, Argon2Params::default())
}

/// Hash on the blocking pool so request workers are not stalled.
pub async fn hash_string_blocking(input: String, params: Argon2Params) -> Result<String, Error> {
    tokio::task::spawn_blocking(move || hash_string_with_params(&input, params))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("join password hashing task: {e}"),
        })?
}

/// Verify a password against a stored PHC string.
///
/// Verification uses the parameters embedded in the hash itself. An unparseable hash is an
/// internal error, not a mismatch.
pub fn verify_string(input: &str, hash: &str) -> Result<bool, Error> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| Error::Internal {
        operation: format!("parse password hash: {e}"),
    })?;

    Ok(Argon2::default().verify_password(input.as_bytes(), &parsed_hash).is_ok())
}
