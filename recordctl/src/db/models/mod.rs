//! Stored record models.
//!
//! Store models are distinct from API models so the storage representation (which carries the
//! password hash) can never be serialized to a client by accident.
//!
//! - [`users`]: User accounts and their credentials
//! - [`products`]: Catalog products

pub mod products;
pub mod users;
