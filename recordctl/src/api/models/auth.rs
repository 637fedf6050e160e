//! API request/response models for login and logout.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::users::UserResponse;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "johndoe88")]
    pub username: String,
    #[schema(example = "SecurePass123!")]
    pub password: String,
}

/// Body of a successful login. The session token travels only in the cookie.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthSuccessResponse {
    pub message: String,
}

/// Login body plus the `Set-Cookie` value, attached when the response is built.
pub struct LoginResponse {
    pub auth_response: AuthResponse,
    pub cookie: String,
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, [(header::SET_COOKIE, self.cookie)], Json(self.auth_response)).into_response()
    }
}

pub struct LogoutResponse {
    pub auth_response: AuthSuccessResponse,
    pub cookie: String,
}

impl IntoResponse for LogoutResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, [(header::SET_COOKIE, self.cookie)], Json(self.auth_response)).into_response()
    }
}
