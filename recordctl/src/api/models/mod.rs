//! API request and response data models.
//!
//! API models are distinct from store models ([`crate::db::models`]): request bodies are
//! validated here before anything reaches a repository, and responses never carry stored secrets
//! such as password hashes. JSON fields are camelCase.
//!
//! - [`auth`]: Login and logout payloads
//! - [`users`]: User profiles, roles and create/update requests
//! - [`products`]: Catalog products
//! - [`pagination`]: `page`/`limit` query parameters and the paginated envelope

pub mod auth;
pub mod pagination;
pub mod products;
pub mod users;
