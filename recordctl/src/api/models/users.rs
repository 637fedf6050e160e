//! API request/response models for users.

use crate::db::models::users::UserDBResponse;
use crate::errors::Error;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Access level of an account
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Customer,
}

/// Create a user with any role (admin only)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserCreate {
    #[schema(example = "John Doe")]
    pub full_name: String,
    /// At least 4 characters: letters, numbers and underscores
    #[schema(example = "johndoe88")]
    pub username: String,
    #[schema(example = "john@example.com")]
    pub email: String,
    #[schema(example = "SecurePass123!")]
    pub password: String,
    /// Defaults to `customer`
    pub role: Option<Role>,
}

/// Partial update. Only admins may change `role` or `isActive`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            full_name: db.full_name,
            username: db.username,
            email: db.email,
            role: db.role,
            is_active: db.is_active,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

fn bad_request(message: impl Into<String>) -> Error {
    Error::BadRequest { message: message.into() }
}

pub fn validate_full_name(full_name: &str) -> Result<(), Error> {
    if full_name.trim().is_empty() {
        return Err(bad_request("Full name must not be empty"));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), Error> {
    let username = username.trim();
    if username.chars().count() < 4 {
        return Err(bad_request("Username must be at least 4 characters"));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(bad_request("Username can only contain letters, numbers and underscores"));
    }
    Ok(())
}

/// Structural check: one `@`, non-empty local part, dotted domain, no whitespace.
pub fn validate_email(email: &str) -> Result<(), Error> {
    let invalid = || bad_request("Email must be a valid email address");
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_password(password: &str, min_length: usize) -> Result<(), Error> {
    if password.chars().count() < min_length {
        return Err(bad_request(format!("Password must be at least {min_length} characters")));
    }
    Ok(())
}

impl UserCreate {
    pub fn validate(&self, min_password_length: usize) -> Result<(), Error> {
        validate_full_name(&self.full_name)?;
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_password(&self.password, min_password_length)
    }
}

impl UserUpdate {
    pub fn validate(&self, min_password_length: usize) -> Result<(), Error> {
        if let Some(full_name) = &self.full_name {
            validate_full_name(full_name)?;
        }
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(password) = &self.password {
            validate_password(password, min_password_length)?;
        }
        Ok(())
    }

    /// Whether the update would move a field reserved to admins away from its stored value.
    pub fn changes_privileges(&self, role: Role, is_active: bool) -> bool {
        self.role.is_some_and(|requested| requested != role) || self.is_active.is_some_and(|requested| requested != is_active)
    }
}
