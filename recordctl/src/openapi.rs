//! OpenAPI document for the `/api/v1` surface.
//!
//! Served as JSON at `/api/v1/openapi.json` and rendered with Scalar at `/docs`.

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use crate::{api, auth};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            let cookie = ApiKeyValue::with_description(
                "access_token",
                "Session cookie set by `POST /auth/login`. HTTP-only, so browsers send it automatically \
                 on same-site requests; the token is never returned in a response body.",
            );
            components
                .security_schemes
                .insert("CookieAuth".to_string(), SecurityScheme::ApiKey(ApiKey::Cookie(cookie)));
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "recordctl API",
        description = "User and product management with cookie-based session authentication"
    ),
    servers(
        (url = "/api/v1", description = "Record API")
    ),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::auth::me,
        api::handlers::users::create_user,
        api::handlers::users::register,
        api::handlers::users::bootstrap_admin,
        api::handlers::users::list_users,
        api::handlers::users::get_user,
        api::handlers::users::update_user,
        api::handlers::users::delete_user,
        api::handlers::products::create_product,
        api::handlers::products::list_products,
        api::handlers::products::get_product,
        api::handlers::products::update_product,
        api::handlers::products::delete_product,
    ),
    components(
        schemas(
            api::models::auth::LoginRequest,
            api::models::auth::AuthResponse,
            api::models::auth::AuthSuccessResponse,
            api::models::users::Role,
            api::models::users::UserCreate,
            api::models::users::UserUpdate,
            api::models::users::UserResponse,
            api::models::products::ProductCreate,
            api::models::products::ProductUpdate,
            api::models::products::ProductResponse,
            auth::context::AuthContext,
        )
    ),
    tags(
        (name = "auth", description = "Login, logout and session identity"),
        (name = "user", description = "User accounts"),
        (name = "product", description = "Product catalog"),
    )
)]
pub struct ApiDoc;
