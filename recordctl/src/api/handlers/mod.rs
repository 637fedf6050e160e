//! HTTP request handlers for all API endpoints.
//!
//! Each handler is responsible for:
//! - Authorization, by taking the [`crate::auth::policy::Authorized`] extractor for its route
//! - Request validation and deserialization
//! - Store access via repositories
//! - Response serialization
//!
//! # Handler Modules
//!
//! - [`auth`]: Login, logout and session identity
//! - [`products`]: Product CRUD
//! - [`users`]: Registration, bootstrap and user CRUD
//!
//! # Authentication
//!
//! Handlers for protected routes take `Authorized<R>` ahead of any body extractor. It rejects a
//! missing or invalid session token with 401 and a policy denial with 403. Public handlers do not
//! take it and so never look at the session cookie.
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which converts to the matching HTTP status code.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{errors::Result, types::parse_id};

pub mod auth;
pub mod products;
pub mod users;

/// Parse the `id` path parameter. A missing parameter reads as an invalid id.
pub(crate) fn path_id(params: &HashMap<String, String>, resource: &str) -> Result<Uuid> {
    parse_id(params.get("id").map(String::as_str).unwrap_or_default(), resource)
}
