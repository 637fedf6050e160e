use axum::{extract::State, Json};

use crate::{
    api::models::auth::{AuthResponse, AuthSuccessResponse, LoginRequest, LoginResponse, LogoutResponse},
    auth::{
        context::AuthContext,
        policy::{route, Authorized},
    },
    db::handlers::{Repository, Users},
    errors::{AuthFailure, Error, Result},
    types::parse_id,
    AppState,
};

/// Login with username and password
///
/// On success the session token is set as an http-only cookie. It is never part of the body.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Login successful, session cookie set", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Invalid username or password"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(Error::BadRequest {
            message: "Username and password are required".to_string(),
        });
    }

    let context = state.verifier.verify(&request.username, &request.password).await?;

    let user_id = parse_id(&context.subject_id, "User")?;
    // The account can vanish between verification and this read
    let user = Users::new(&state.db).get_by_id(user_id).await?.ok_or(Error::Authentication {
        reason: AuthFailure::UnknownUser,
    })?;

    let token = state.codec.issue(&context)?;
    let cookie = state.cookies.set_auth_cookie(&token);

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(LoginResponse {
        auth_response: AuthResponse {
            user: user.into(),
            message: "Login successful".to_string(),
        },
        cookie,
    })
}

/// Logout and clear the session cookie
///
/// Does not require a session; the cookie is cleared either way.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logout successful, session cookie cleared", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Result<LogoutResponse> {
    Ok(LogoutResponse {
        auth_response: AuthSuccessResponse {
            message: "Logout successful".to_string(),
        },
        cookie: state.cookies.clear_auth_cookie(),
    })
}

/// Identity of the current session
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Identity carried by the session token", body = AuthContext),
        (status = 401, description = "Missing, invalid or expired session"),
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn me(caller: Authorized<route::Me>) -> Result<Json<AuthContext>> {
    Ok(Json(caller.context))
}

#[cfg(test)]
mod tests {
    use crate::api::models::users::Role;
    use crate::test_utils::{create_test_app, create_test_user, deactivate_user, login_cookie};
    use axum::http::{header, StatusCode};
    use serde_json::{json, Value};

    #[test_log::test(tokio::test)]
    async fn test_login_sets_cookie_without_token_in_body() {
        let (server, state) = create_test_app().await;
        create_test_user(&state, "johndoe88", "SecurePass123!", Role::Customer).await;

        let response = server
            .post("/api/v1/auth/login")
            .json(&json!({"username": "johndoe88", "password": "SecurePass123!"}))
            .await;

        response.assert_status_ok();
        let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("access_token="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(!cookie.contains("Secure"));

        let body: Value = response.json();
        assert_eq!(body["message"], "Login successful");
        assert_eq!(body["user"]["username"], "johndoe88");
        assert!(body["user"].get("passwordHash").is_none());
        assert!(body.get("token").is_none());
        assert!(body.get("accessToken").is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_admin_login_carries_admin_role() {
        let (server, state) = create_test_app().await;
        create_test_user(&state, "admin", "admin123", Role::Admin).await;

        let response = server
            .post("/api/v1/auth/login")
            .json(&json!({"username": "admin", "password": "admin123"}))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["user"]["role"], "admin");

        let cookie = login_cookie(&server, "admin", "admin123").await;
        let me: Value = server.get("/api/v1/auth/me").add_header(header::COOKIE, cookie).await.json();
        assert_eq!(me["role"], "admin");
    }

    #[test_log::test(tokio::test)]
    async fn test_login_is_case_insensitive_on_username() {
        let (server, state) = create_test_app().await;
        create_test_user(&state, "johndoe88", "SecurePass123!", Role::Customer).await;

        server
            .post("/api/v1/auth/login")
            .json(&json!({"username": "JohnDoe88", "password": "SecurePass123!"}))
            .await
            .assert_status_ok();
    }

    #[test_log::test(tokio::test)]
    async fn test_login_failures_share_one_message() {
        let (server, state) = create_test_app().await;
        create_test_user(&state, "johndoe88", "SecurePass123!", Role::Customer).await;

        let wrong_password = server
            .post("/api/v1/auth/login")
            .json(&json!({"username": "johndoe88", "password": "nope-nope"}))
            .await;
        wrong_password.assert_status(StatusCode::UNAUTHORIZED);

        let unknown_user = server
            .post("/api/v1/auth/login")
            .json(&json!({"username": "ghost", "password": "SecurePass123!"}))
            .await;
        unknown_user.assert_status(StatusCode::UNAUTHORIZED);

        assert_eq!(wrong_password.text(), unknown_user.text());
        assert_eq!(unknown_user.text(), "Invalid username or password");
        assert!(unknown_user.headers().get(header::SET_COOKIE).is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_login_rejects_inactive_account() {
        let (server, state) = create_test_app().await;
        let user = create_test_user(&state, "sleepy", "SecurePass123!", Role::Customer).await;
        deactivate_user(&state, user.id).await;

        server
            .post("/api/v1/auth/login")
            .json(&json!({"username": "sleepy", "password": "SecurePass123!"}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[test_log::test(tokio::test)]
    async fn test_login_rejects_empty_fields() {
        let (server, _) = create_test_app().await;
        server
            .post("/api/v1/auth/login")
            .json(&json!({"username": "", "password": ""}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[test_log::test(tokio::test)]
    async fn test_logout_clears_cookie_without_session() {
        let (server, _) = create_test_app().await;

        let response = server.post("/api/v1/auth/logout").await;
        response.assert_status_ok();
        let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("access_token=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert_eq!(response.json::<Value>()["message"], "Logout successful");
    }

    #[test_log::test(tokio::test)]
    async fn test_logout_ignores_garbage_cookie() {
        let (server, _) = create_test_app().await;
        server
            .post("/api/v1/auth/logout")
            .add_header(header::COOKIE, "access_token=not-a-jwt")
            .await
            .assert_status_ok();
    }

    #[test_log::test(tokio::test)]
    async fn test_me_returns_identity() {
        let (server, state) = create_test_app().await;
        let user = create_test_user(&state, "johndoe88", "SecurePass123!", Role::Customer).await;
        let cookie = login_cookie(&server, "johndoe88", "SecurePass123!").await;

        let response = server.get("/api/v1/auth/me").add_header(header::COOKIE, cookie).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["subjectId"], user.id.to_string());
        assert_eq!(body["username"], "johndoe88");
        assert_eq!(body["role"], "customer");
    }

    #[test_log::test(tokio::test)]
    async fn test_me_requires_session() {
        let (server, _) = create_test_app().await;

        let missing = server.get("/api/v1/auth/me").await;
        missing.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(missing.text(), "Authentication required");

        let invalid = server
            .get("/api/v1/auth/me")
            .add_header(header::COOKIE, "access_token=a.b.c")
            .await;
        invalid.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(invalid.text(), "Invalid session token");
    }
}
