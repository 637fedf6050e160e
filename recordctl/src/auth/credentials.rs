//! Credential lookup and verification.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::{
    api::models::users::Role,
    auth::{context::AuthContext, password::verify_string},
    db::errors::Result as DbResult,
    errors::{AuthFailure, Error, Result},
};

/// The stored login record for one account.
#[derive(Debug, Clone)]
pub struct Credential {
    pub subject_id: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
}

/// Source of credentials, looked up by username.
///
/// Implementations normalize the username themselves so that lookups are case-insensitive.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_credential(&self, username: &str) -> DbResult<Option<Credential>>;
}

/// Checks a submitted username/password pair against a [`CredentialStore`].
#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn CredentialStore>,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Returns the identity for a valid, active account.
    ///
    /// Store failures propagate as [`Error::Database`]; every credential mismatch becomes
    /// [`Error::Authentication`].
    #[instrument(skip(self, password))]
    pub async fn verify(&self, username: &str, password: &str) -> Result<AuthContext> {
        let credential = self
            .store
            .find_credential(username)
            .await?
            .ok_or(Error::Authentication {
                reason: AuthFailure::UnknownUser,
            })?;

        let hash = credential.password_hash.clone();
        let submitted = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_string(&submitted, &hash))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("join password verification task: {e}"),
            })??;

        if !matches {
            return Err(Error::Authentication {
                reason: AuthFailure::WrongPassword,
            });
        }
        if !credential.is_active {
            return Err(Error::Authentication {
                reason: AuthFailure::Inactive,
            });
        }

        debug!(subject = %credential.subject_id, "credentials verified");
        Ok(AuthContext {
            subject_id: credential.subject_id,
            username: credential.username,
            role: credential.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::{hash_string_with_params, Argon2Params};
    use crate::db::errors::DbError;
    use std::collections::HashMap;

    struct MapStore(HashMap<String, Credential>);

    #[async_trait::async_trait]
    impl CredentialStore for MapStore {
        async fn find_credential(&self, username: &str) -> DbResult<Option<Credential>> {
            Ok(self.0.get(&username.to_lowercase()).cloned())
        }
    }

    struct BrokenStore;

    #[async_trait::async_trait]
    impl CredentialStore for BrokenStore {
        async fn find_credential(&self, _username: &str) -> DbResult<Option<Credential>> {
            Err(DbError::Unavailable {
                reason: "store offline".to_string(),
            })
        }
    }

    fn verifier(role: Role, is_active: bool) -> CredentialVerifier {
        let credential = Credential {
            subject_id: "u1".to_string(),
            username: "admin".to_string(),
            password_hash: hash_string_with_params("admin123", Argon2Params::insecure_fast()).unwrap(),
            role,
            is_active,
        };
        CredentialVerifier::new(Arc::new(MapStore(HashMap::from([("admin".to_string(), credential)]))))
    }

    #[tokio::test]
    async fn test_matching_password_returns_stored_role() {
        let ctx = verifier(Role::Admin, true).verify("Admin", "admin123").await.unwrap();
        assert_eq!(ctx.subject_id, "u1");
        assert_eq!(ctx.username, "admin");
        assert_eq!(ctx.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let verifier = verifier(Role::Customer, true);

        let wrong = verifier.verify("admin", "nope").await.unwrap_err();
        let unknown = verifier.verify("ghost", "admin123").await.unwrap_err();

        assert!(matches!(
            wrong,
            Error::Authentication {
                reason: AuthFailure::WrongPassword
            }
        ));
        assert!(matches!(
            unknown,
            Error::Authentication {
                reason: AuthFailure::UnknownUser
            }
        ));
        assert_eq!(wrong.status_code(), unknown.status_code());
        assert_eq!(wrong.user_message(), unknown.user_message());
    }

    #[tokio::test]
    async fn test_inactive_account_rejected() {
        let err = verifier(Role::Customer, false).verify("admin", "admin123").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Authentication {
                reason: AuthFailure::Inactive
            }
        ));
    }

    #[tokio::test]
    async fn test_store_failure_is_not_authentication_failure() {
        let err = CredentialVerifier::new(Arc::new(BrokenStore))
            .verify("admin", "admin123")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Database(DbError::Unavailable { .. })));
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
