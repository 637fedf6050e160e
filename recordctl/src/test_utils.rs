//! Test utilities for integration testing.

use crate::api::models::users::{Role, UserResponse};
use crate::auth::password::{hash_string_with_params, Argon2Params};
use crate::config::{Config, PasswordConfig};
use crate::db::handlers::{Repository, Users};
use crate::db::models::users::{UserCreateDBRequest, UserUpdateDBRequest};
use crate::types::UserId;
use crate::{AppState, Application};
use axum::http::header;
use axum_test::TestServer;
use serde_json::json;

pub async fn create_test_app() -> (TestServer, AppState) {
    let app = Application::new(create_test_config())
        .await
        .expect("Failed to create application");

    app.into_test_server()
}

/// Default configuration with a fixed secret and the cheapest Argon2 cost.
pub fn create_test_config() -> Config {
    let fast = Argon2Params::insecure_fast();
    let mut config = Config {
        secret_key: Some("test-secret-key-for-recordctl-tests".to_string()),
        ..Default::default()
    };
    config.auth.password = PasswordConfig {
        argon2_memory_kib: fast.memory_kib,
        argon2_iterations: fast.iterations,
        argon2_parallelism: fast.parallelism,
        ..Default::default()
    };
    config
}

/// Insert an active user directly into the store. The email is derived from the username.
pub async fn create_test_user(state: &AppState, username: &str, password: &str, role: Role) -> UserResponse {
    let password_hash = hash_string_with_params(password, Argon2Params::insecure_fast()).expect("Failed to hash password");
    let user = Users::new(&state.db)
        .create(&UserCreateDBRequest {
            full_name: format!("Test {username}"),
            username: username.to_string(),
            email: format!("{}@example.com", username.to_lowercase()),
            password_hash,
            role,
            is_active: true,
        })
        .await
        .expect("Failed to create test user");
    user.into()
}

pub async fn deactivate_user(state: &AppState, user_id: UserId) {
    Users::new(&state.db)
        .update(
            user_id,
            &UserUpdateDBRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to deactivate test user");
}

/// Log in through the API and return a `Cookie` header value carrying the session.
pub async fn login_cookie(server: &TestServer, username: &str, password: &str) -> String {
    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({"username": username, "password": password}))
        .await;
    response.assert_status_ok();

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login response without Set-Cookie")
        .to_str()
        .expect("Set-Cookie is not ASCII")
        .to_string();
    set_cookie.split(';').next().unwrap_or_default().to_string()
}
