//! Store models for users.

use crate::api::models::users::Role;
use crate::types::UserId;
use chrono::{DateTime, Utc};

/// Store request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
}

/// Store request for updating a user. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Stored user record
#[derive(Debug, Clone)]
pub struct UserDBResponse {
    pub id: UserId,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
