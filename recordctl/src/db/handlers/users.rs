//! Store repository for users.

use crate::types::{abbrev_uuid, UserId};
use crate::{
    api::models::users::Role,
    auth::credentials::{Credential, CredentialStore},
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
        Database,
    },
};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing users
#[derive(Debug, Clone)]
pub struct UserFilter {
    pub skip: u64,
    pub limit: u64,
    /// Only return users whose account is active
    pub active_only: bool,
}

impl UserFilter {
    pub fn new(skip: u64, limit: u64) -> Self {
        Self {
            skip,
            limit,
            active_only: true,
        }
    }
}

/// Usernames and emails are stored trimmed and lowercased, so lookups are case-insensitive.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

#[derive(Clone)]
pub struct Users {
    db: Database,
}

impl Users {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    /// Find a user by username (case-insensitive)
    #[instrument(skip(self), err)]
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<UserDBResponse>> {
        let id = match self.db.usernames.get(&normalize(username)) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.db.users.get(&id).map(|user| user.clone()))
    }

    /// Whether any user with the given role exists, active or not
    pub async fn any_with_role(&self, role: Role) -> Result<bool> {
        Ok(self.db.users.iter().any(|user| user.role == role))
    }

    /// Create `request` only if no admin account exists yet.
    ///
    /// Returns `Ok(None)` when an admin already exists.
    #[instrument(skip(self, request), fields(username = %request.username), err)]
    pub async fn create_first_admin(&self, request: &UserCreateDBRequest) -> Result<Option<UserDBResponse>> {
        let _guard = self
            .db
            .bootstrap
            .lock()
            .map_err(|_| DbError::Other(anyhow::anyhow!("bootstrap lock poisoned")))?;

        if self.db.users.iter().any(|user| user.role == Role::Admin) {
            return Ok(None);
        }
        self.insert(request).map(Some)
    }

    fn insert(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let user_id = Uuid::new_v4();
        let username = normalize(&request.username);
        let email = normalize(&request.email);

        // Lock order: usernames, then emails. Update follows the same order.
        let username_slot = match self.db.usernames.entry(username.clone()) {
            Entry::Occupied(_) => {
                return Err(DbError::UniqueViolation {
                    table: "users",
                    field: "username",
                    conflicting_value: username,
                });
            }
            Entry::Vacant(slot) => slot,
        };
        match self.db.emails.entry(email.clone()) {
            Entry::Occupied(_) => {
                return Err(DbError::UniqueViolation {
                    table: "users",
                    field: "email",
                    conflicting_value: email,
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(user_id);
            }
        }
        username_slot.insert(user_id);

        let now = Utc::now();
        let user = UserDBResponse {
            id: user_id,
            full_name: request.full_name.trim().to_string(),
            username,
            email,
            password_hash: request.password_hash.clone(),
            role: request.role,
            is_active: request.is_active,
            created_at: now,
            updated_at: now,
        };
        self.db.users.insert(user_id, user.clone());
        Ok(user)
    }

    fn matching(&self, filter: &UserFilter) -> Vec<UserDBResponse> {
        let mut users: Vec<UserDBResponse> = self
            .db
            .users
            .iter()
            .filter(|user| !filter.active_only || user.is_active)
            .map(|user| user.clone())
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        users
    }

    /// Move the `index` entry for `user_id` from `old` to `new`, failing if `new` is taken.
    fn reindex(
        index: &dashmap::DashMap<String, UserId>,
        field: &'static str,
        user_id: UserId,
        old: &str,
        new: &str,
    ) -> Result<()> {
        if old == new {
            return Ok(());
        }
        match index.entry(new.to_string()) {
            Entry::Occupied(_) => {
                return Err(DbError::UniqueViolation {
                    table: "users",
                    field,
                    conflicting_value: new.to_string(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(user_id);
            }
        }
        index.remove(old);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Repository for Users {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    #[instrument(skip(self, request), fields(username = %request.username), err)]
    async fn create(&self, request: &Self::CreateRequest) -> Result<Self::Response> {
        self.insert(request)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&self, id: Self::Id) -> Result<Option<Self::Response>> {
        Ok(self.db.users.get(&id).map(|user| user.clone()))
    }

    #[instrument(skip(self), err)]
    async fn list(&self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        Ok(self
            .matching(filter)
            .into_iter()
            .skip(filter.skip as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn count(&self, filter: &Self::Filter) -> Result<u64> {
        Ok(self.matching(filter).len() as u64)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn delete(&self, id: Self::Id) -> Result<bool> {
        match self.db.users.remove(&id) {
            Some((_, user)) => {
                self.db.usernames.remove(&user.username);
                self.db.emails.remove(&user.email);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update(&self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // The record stays write-locked across the index moves, so renames and deletes of one
        // user are serialized. Lock order: users, usernames, emails.
        let mut entry = self.db.users.get_mut(&id).ok_or(DbError::NotFound)?;
        let user = entry.value_mut();

        let username = request.username.as_deref().map(normalize).unwrap_or_else(|| user.username.clone());
        let email = request.email.as_deref().map(normalize).unwrap_or_else(|| user.email.clone());

        Self::reindex(&self.db.usernames, "username", id, &user.username, &username)?;
        if let Err(e) = Self::reindex(&self.db.emails, "email", id, &user.email, &email) {
            // Give back the username claimed above
            if username != user.username {
                self.db.usernames.remove(&username);
                self.db.usernames.insert(user.username.clone(), id);
            }
            return Err(e);
        }

        user.username = username;
        user.email = email;
        if let Some(full_name) = &request.full_name {
            user.full_name = full_name.trim().to_string();
        }
        if let Some(password_hash) = &request.password_hash {
            user.password_hash = password_hash.clone();
        }
        if let Some(role) = request.role {
            user.role = role;
        }
        if let Some(is_active) = request.is_active {
            user.is_active = is_active;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[async_trait::async_trait]
impl CredentialStore for Users {
    async fn find_credential(&self, username: &str) -> Result<Option<Credential>> {
        Ok(self.get_user_by_username(username).await?.map(|user| Credential {
            subject_id: user.id.to_string(),
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
            is_active: user.is_active,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(username: &str, email: &str, role: Role) -> UserCreateDBRequest {
        UserCreateDBRequest {
            full_name: "Test User".to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_username_and_email() {
        let db = Database::new();
        let users = Users::new(&db);

        let user = users
            .create(&create_request("  JohnDoe88 ", "John@Example.COM", Role::Customer))
            .await
            .unwrap();

        assert_eq!(user.username, "johndoe88");
        assert_eq!(user.email, "john@example.com");
        let found = users.get_user_by_username("JOHNDOE88").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email_rejected() {
        let db = Database::new();
        let users = Users::new(&db);
        users.create(&create_request("alice", "alice@example.com", Role::Customer)).await.unwrap();

        let err = users
            .create(&create_request("ALICE", "other@example.com", Role::Customer))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { field: "username", .. }));

        let err = users
            .create(&create_request("alice2", "Alice@example.com", Role::Customer))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { field: "email", .. }));

        // The failed email insert must not leave "alice2" reserved
        users.create(&create_request("alice2", "alice2@example.com", Role::Customer)).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_skips_inactive_and_paginates() {
        let db = Database::new();
        let users = Users::new(&db);
        for i in 0..5 {
            users
                .create(&create_request(&format!("user{i}"), &format!("user{i}@example.com"), Role::Customer))
                .await
                .unwrap();
        }
        let mut inactive = create_request("sleepy", "sleepy@example.com", Role::Customer);
        inactive.is_active = false;
        users.create(&inactive).await.unwrap();

        let filter = UserFilter::new(2, 2);
        assert_eq!(users.count(&filter).await.unwrap(), 5);
        let page = users.list(&filter).await.unwrap();
        assert_eq!(page.len(), 2);
        assert!(page.iter().all(|u| u.is_active));
    }

    #[tokio::test]
    async fn test_update_moves_username_index() {
        let db = Database::new();
        let users = Users::new(&db);
        let user = users.create(&create_request("before", "before@example.com", Role::Customer)).await.unwrap();

        let updated = users
            .update(
                user.id,
                &UserUpdateDBRequest {
                    username: Some("After".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.username, "after");
        assert!(users.get_user_by_username("before").await.unwrap().is_none());
        assert!(users.get_user_by_username("after").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_conflicting_email_keeps_old_username() {
        let db = Database::new();
        let users = Users::new(&db);
        users.create(&create_request("taken", "taken@example.com", Role::Customer)).await.unwrap();
        let user = users.create(&create_request("mover", "mover@example.com", Role::Customer)).await.unwrap();

        let err = users
            .update(
                user.id,
                &UserUpdateDBRequest {
                    username: Some("fresh".to_string()),
                    email: Some("taken@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { field: "email", .. }));
        assert!(users.get_user_by_username("mover").await.unwrap().is_some());
        assert!(users.get_user_by_username("fresh").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_renames_leave_one_index_entry() {
        let db = Database::new();
        let users = Users::new(&db);
        let user = users.create(&create_request("origin", "origin@example.com", Role::Customer)).await.unwrap();
        let user_id = user.id;

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let users = users.clone();
                tokio::spawn(async move {
                    users
                        .update(
                            user_id,
                            &UserUpdateDBRequest {
                                username: Some(format!("renamed{i}")),
                                email: Some(format!("renamed{i}@example.com")),
                                ..Default::default()
                            },
                        )
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = users.get_by_id(user.id).await.unwrap().unwrap();
        let names: Vec<String> = db.usernames.iter().filter(|e| *e.value() == user.id).map(|e| e.key().clone()).collect();
        let emails: Vec<String> = db.emails.iter().filter(|e| *e.value() == user.id).map(|e| e.key().clone()).collect();
        assert_eq!(names, vec![stored.username]);
        assert_eq!(emails, vec![stored.email]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_update_racing_delete_leaves_no_reservations() {
        let db = Database::new();
        let users = Users::new(&db);
        let user = users.create(&create_request("doomed", "doomed@example.com", Role::Customer)).await.unwrap();
        let user_id = user.id;

        let renamer = {
            let users = users.clone();
            tokio::spawn(async move {
                users
                    .update(
                        user_id,
                        &UserUpdateDBRequest {
                            username: Some("escaped".to_string()),
                            ..Default::default()
                        },
                    )
                    .await
            })
        };
        let deleter = {
            let users = users.clone();
            tokio::spawn(async move { users.delete(user_id).await })
        };

        // Either order is fine; the rename may also find the user already gone
        let _ = renamer.await.unwrap();
        assert!(deleter.await.unwrap().unwrap());

        assert!(db.usernames.iter().all(|e| *e.value() != user.id));
        assert!(db.emails.iter().all(|e| *e.value() != user.id));
        users.create(&create_request("escaped", "doomed@example.com", Role::Customer)).await.unwrap();
        users.create(&create_request("doomed", "other@example.com", Role::Customer)).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_frees_username() {
        let db = Database::new();
        let users = Users::new(&db);
        let user = users.create(&create_request("gone", "gone@example.com", Role::Customer)).await.unwrap();

        assert!(users.delete(user.id).await.unwrap());
        assert!(!users.delete(user.id).await.unwrap());
        users.create(&create_request("gone", "gone@example.com", Role::Customer)).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_first_admin_only_once() {
        let db = Database::new();
        let users = Users::new(&db);

        let first = users
            .create_first_admin(&create_request("root", "root@example.com", Role::Admin))
            .await
            .unwrap();
        assert!(first.is_some());

        let second = users
            .create_first_admin(&create_request("root2", "root2@example.com", Role::Admin))
            .await
            .unwrap();
        assert!(second.is_none());
        assert!(users.any_with_role(Role::Admin).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_credential_exposes_hash_and_status() {
        let db = Database::new();
        let users = Users::new(&db);
        let mut request = create_request("carol", "carol@example.com", Role::Admin);
        request.is_active = false;
        let user = users.create(&request).await.unwrap();

        let credential = users.find_credential("Carol").await.unwrap().unwrap();
        assert_eq!(credential.subject_id, user.id.to_string());
        assert_eq!(credential.role, Role::Admin);
        assert!(!credential.is_active);
        assert_eq!(credential.password_hash, "$argon2id$stub");

        assert!(users.find_credential("nobody").await.unwrap().is_none());
    }
}
