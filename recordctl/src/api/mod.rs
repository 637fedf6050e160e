//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! Everything is served under `/api/v1`:
//!
//! - **Authentication** (`/auth/*`): Login, logout and the current session identity
//! - **Users** (`/user/*`): Registration, first-admin bootstrap and user management
//! - **Products** (`/product/*`): Public catalog reads, admin-only writes
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with `utoipa` annotations. The document is served at
//! `/api/v1/openapi.json` and rendered at `/docs`.

pub mod handlers;
pub mod models;
