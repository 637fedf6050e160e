//! Per-request identity resolution.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};
use utoipa::ToSchema;

use crate::{
    api::models::users::Role,
    auth::{cookie::TokenExtractor, session::TokenCodec},
    errors::{Error, Result},
    AppState,
};

/// The identity behind the in-flight request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    pub subject_id: String,
    pub username: String,
    pub role: Role,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Turns request headers into an identity: extract, then verify.
#[derive(Clone)]
pub struct AuthContextResolver {
    extractor: Arc<dyn TokenExtractor>,
    codec: Arc<TokenCodec>,
}

impl AuthContextResolver {
    pub fn new(extractor: Arc<dyn TokenExtractor>, codec: Arc<TokenCodec>) -> Self {
        Self { extractor, codec }
    }

    /// `Ok(None)` for an anonymous request; an error if a token is present but not valid.
    pub fn resolve(&self, headers: &HeaderMap) -> Result<Option<AuthContext>> {
        let Some(token) = self.extractor.extract(headers) else {
            trace!("no session token on request");
            return Ok(None);
        };

        let claims = self.codec.verify(&token)?;
        debug!(subject = %claims.sub, "resolved session");
        Ok(Some(claims.into()))
    }
}

/// Optional identity of the caller. Rejects only when a token is present and invalid.
#[derive(Debug, Clone)]
pub struct Identity(pub Option<AuthContext>);

impl FromRequestParts<AppState> for Identity {
    type Rejection = Error;

    #[instrument(skip_all)]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        state.resolver.resolve(&parts.headers).map(Identity)
    }
}
