use crate::db::errors::DbError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error as ThisError;

/// Message returned for every failed login, whatever the underlying reason.
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Why a login attempt was refused. Logged, never returned to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    UnknownUser,
    WrongPassword,
    Inactive,
}

/// Why a presented token was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    Missing,
    Malformed,
    BadSignature,
    Expired,
}

/// Why an identified (or anonymous) caller was refused access to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    NoIdentity,
    RoleNotPermitted,
    NotResourceOwner,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthFailure::UnknownUser => "unknown user",
            AuthFailure::WrongPassword => "wrong password",
            AuthFailure::Inactive => "account disabled",
        })
    }
}

impl fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TokenRejection::Missing => "missing",
            TokenRejection::Malformed => "malformed",
            TokenRejection::BadSignature => "bad signature",
            TokenRejection::Expired => "expired",
        })
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Denial::NoIdentity => "no identity",
            Denial::RoleNotPermitted => "role not permitted",
            Denial::NotResourceOwner => "not resource owner",
        })
    }
}

#[derive(ThisError, Debug)]
pub enum Error {
    /// Login credentials were rejected
    #[error("Authentication failed: {reason}")]
    Authentication { reason: AuthFailure },

    /// Session token missing, malformed, forged or expired
    #[error("Invalid token: {reason}")]
    InvalidToken { reason: TokenRejection },

    /// Caller is not allowed to perform the operation
    #[error("Forbidden: {reason}")]
    Forbidden { reason: Denial },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Conflict with existing state
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Store operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Authentication { .. } | Error::InvalidToken { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::Unavailable { .. } | DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Authentication { .. } => INVALID_CREDENTIALS.to_string(),
            Error::InvalidToken { reason } => match reason {
                TokenRejection::Missing => "Authentication required".to_string(),
                TokenRejection::Expired => "Session expired".to_string(),
                TokenRejection::Malformed | TokenRejection::BadSignature => "Invalid session token".to_string(),
            },
            Error::Forbidden { reason } => match reason {
                Denial::NoIdentity => "Authentication required".to_string(),
                Denial::RoleNotPermitted => "Insufficient permissions".to_string(),
                Denial::NotResourceOwner => "You can only access your own resources".to_string(),
            },
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::Conflict { message } => message.clone(),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { table, field, .. } => match (*table, *field) {
                    ("users", "username") => "Username already exists".to_string(),
                    ("users", "email") => "Email already exists".to_string(),
                    ("products", "name") => "Product name already exists".to_string(),
                    _ => "Resource already exists".to_string(),
                },
                DbError::Unavailable { .. } | DbError::Other(_) => "Internal server error".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Database(DbError::Unavailable { .. } | DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) | Error::Conflict { .. } => {
                tracing::warn!("Conflict error: {}", self);
            }
            Error::Authentication { .. } | Error::InvalidToken { .. } | Error::Forbidden { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        match &self {
            Error::Database(DbError::UniqueViolation { table, field, .. }) => {
                let body = json!({
                    "message": self.user_message(),
                    "resource": table.trim_end_matches('s'),
                    "field": field,
                });
                (status, axum::response::Json(body)).into_response()
            }
            _ => (status, self.user_message()).into_response(),
        }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
