//! Common type definitions.
//!
//! All stored entity IDs are UUIDs wrapped in type aliases:
//!
//! - [`UserId`]: User account identifier
//! - [`ProductId`]: Product identifier
//!
//! The authenticated subject carried inside a token is the string form of a [`UserId`], see
//! [`crate::auth::context::AuthContext`].
//!
//! # Utility Functions
//!
//! - [`abbrev_uuid`]: Abbreviate UUIDs to first 8 chars for logging
//! - [`parse_id`]: Parse a path segment into an entity ID, mapping failures to a 400

use uuid::Uuid;

use crate::errors::Error;

// Type aliases for IDs
pub type UserId = Uuid;
pub type ProductId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// Parse a raw path parameter into an entity ID.
///
/// `resource` is only used in the error message ("Invalid User ID format").
pub fn parse_id(raw: &str, resource: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(raw).map_err(|_| Error::BadRequest {
        message: format!("Invalid {resource} ID format"),
    })
}
