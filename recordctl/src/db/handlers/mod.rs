//! Repository implementations for store access.
//!
//! Each repository wraps a [`Database`](crate::db::Database) handle, provides strongly-typed CRUD
//! operations and returns store models from [`crate::db::models`].
//!
//! # Available Repositories
//!
//! - [`Users`]: User accounts; also the credential source for login
//! - [`Products`]: Catalog products

pub mod products;
pub mod repository;
pub mod users;

pub use products::Products;
pub use repository::Repository;
pub use users::Users;
