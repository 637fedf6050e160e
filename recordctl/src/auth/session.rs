//! Signed session token creation and verification.

use std::{fmt, time::Duration};

use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    api::models::users::Role,
    auth::context::AuthContext,
    errors::{Error, Result, TokenRejection},
};

/// Session claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // Subject (user ID)
    pub username: String, // Username
    pub role: Role,       // "admin" | "customer"
    pub iat: i64,         // Issued at
    pub exp: i64,         // Expiration time
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            subject_id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

/// Signs and verifies HS256 session tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").field("lifetime", &self.lifetime).finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], lifetime: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Claims for `context`, issued now and expiring after the configured lifetime.
    pub fn claims_for(&self, context: &AuthContext) -> Claims {
        let iat = Utc::now().timestamp();
        Claims {
            sub: context.subject_id.clone(),
            username: context.username.clone(),
            role: context.role,
            iat,
            exp: iat.saturating_add(self.lifetime.as_secs() as i64),
        }
    }

    pub fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(|e| Error::Internal {
            operation: format!("sign session token: {e}"),
        })
    }

    /// Issue a fresh token for `context`.
    pub fn issue(&self, context: &AuthContext) -> Result<String> {
        self.sign(&self.claims_for(context))
    }

    /// Verify the signature, then the expiry, then decode the claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::InvalidSignature => TokenRejection::BadSignature,
                ErrorKind::ExpiredSignature => TokenRejection::Expired,
                // Structure, encoding, algorithm or claim-shape problems
                _ => TokenRejection::Malformed,
            };
            Error::InvalidToken { reason }
        })?;

        Ok(data.claims)
    }
}
