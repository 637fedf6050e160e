//! Record store for users and products.
//!
//! The store is an in-process document store: every collection is a concurrent map held behind
//! an `Arc`, so cloning a [`Database`] is cheap and all clones see the same records. It follows the
//! Repository pattern so that handlers never touch the maps directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - validation-free CRUD over a collection)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - stored records and write requests)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  Database   │  (dashmap collections)
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations for CRUD operations
//! - [`models`]: Record structures and create/update requests
//! - [`errors`]: Store-specific error types
//!
//! ## Example Usage
//!
//! ```ignore
//! use recordctl::db::{Database, handlers::{Users, Repository}};
//!
//! async fn example(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
//!     let users = Users::new(db);
//!     let user = users.create(&create_request).await?;
//!
//!     if let Some(user) = users.get_user_by_username("JohnDoe88").await? {
//!         println!("Found user: {}", user.username);
//!     }
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod handlers;
pub mod models;

use dashmap::DashMap;
use std::sync::{Arc, Mutex};

use crate::types::{ProductId, UserId};
use models::{products::ProductDBResponse, users::UserDBResponse};

/// Shared handle to every record collection.
#[derive(Clone, Default)]
pub struct Database {
    pub(crate) users: Arc<DashMap<UserId, UserDBResponse>>,
    /// Normalized username -> id. Owns uniqueness of usernames.
    pub(crate) usernames: Arc<DashMap<String, UserId>>,
    /// Normalized email -> id. Owns uniqueness of emails.
    pub(crate) emails: Arc<DashMap<String, UserId>>,
    pub(crate) products: Arc<DashMap<ProductId, ProductDBResponse>>,
    /// Product name -> id. Owns uniqueness of product names.
    pub(crate) product_names: Arc<DashMap<String, ProductId>>,
    /// Serializes "create only if no admin exists" against itself.
    pub(crate) bootstrap: Arc<Mutex<()>>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("users", &self.users.len())
            .field("products", &self.products.len())
            .finish()
    }
}
