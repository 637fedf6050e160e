//! # recordctl: user and product records behind cookie-based sessions
//!
//! `recordctl` is a small REST backend that manages user accounts and a product catalog. Callers
//! log in with a username and password and receive a signed session token in an HTTP-only cookie;
//! every later request is authorized against a static per-route policy.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! keeps its records in an in-process store ([`db::Database`]).
//!
//! ### Request Flow
//!
//! Requests to `/api/v1/*` reach their handler directly; there is no authentication middleware.
//! Handlers for protected routes take an [`auth::policy::Authorized`] extractor for their route.
//! It reads the session cookie, verifies the token and applies the route's policy before the body
//! extractor runs. The policy table decides between role checks and ownership checks. Public
//! handlers skip the extractor, so an expired cookie never gets in the way of logging in again or
//! browsing products.
//!
//! ### Core Components
//!
//! The **API layer** ([`api`]) holds the handlers and request/response models.
//!
//! The **authentication layer** ([`auth`]) covers password hashing, credential verification, token
//! signing and verification, the cookie transport, per-request identity resolution and the
//! authorization guards.
//!
//! The **store layer** ([`db`]) uses the repository pattern. [`db::handlers::Users`] also serves
//! as the credential source for login.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use recordctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = recordctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     recordctl::telemetry::init_telemetry(config.log_format)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See [`config`] for the YAML layout and environment overrides. At minimum a signing secret is
//! required, usually through `JWT_SECRET`.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod types;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    http::{self, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use bon::Builder;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, instrument, Level};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    api::models::users::Role,
    auth::{
        context::AuthContextResolver,
        cookie::{CookieTransport, TokenExtractor},
        credentials::CredentialVerifier,
        password,
        session::TokenCodec,
    },
    config::{AdminConfig, CorsOrigin},
    db::{
        handlers::{Repository, Users},
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
        Database,
    },
    openapi::ApiDoc,
    types::UserId,
};

pub use config::Config;

/// Application state shared across all request handlers.
///
/// Everything here is cheap to clone: the store and the auth components are behind `Arc`.
///
/// Build it with [`AppState::from_config`], or with the builder when a test needs to swap a
/// component:
///
/// ```ignore
/// let state = AppState::builder()
///     .db(db)
///     .config(config)
///     .codec(codec)
///     .cookies(cookies)
///     .resolver(resolver)
///     .verifier(verifier)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub codec: Arc<TokenCodec>,
    pub cookies: Arc<CookieTransport>,
    pub resolver: AuthContextResolver,
    pub verifier: Arc<CredentialVerifier>,
}

impl AppState {
    /// Wire the auth components from configuration. Fails if no signing secret is configured.
    pub fn from_config(db: Database, config: Config) -> anyhow::Result<Self> {
        let secret = config
            .secret_key
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .context("secret_key must be configured")?;

        let session = &config.auth.session;
        let codec = Arc::new(TokenCodec::new(secret.as_bytes(), session.lifetime));
        let cookies = Arc::new(CookieTransport::new(
            session.cookie_name.clone(),
            config.cookie_secure(),
            session.lifetime,
        ));
        let extractor: Arc<dyn TokenExtractor> = cookies.clone();
        let resolver = AuthContextResolver::new(extractor, codec.clone());
        let verifier = Arc::new(CredentialVerifier::new(Arc::new(Users::new(&db))));

        Ok(Self::builder()
            .db(db)
            .config(config)
            .codec(codec)
            .cookies(cookies)
            .resolver(resolver)
            .verifier(verifier)
            .build())
    }
}

/// Create the configured admin account if it doesn't exist.
///
/// Idempotent: when the username is already taken the existing account is promoted to an active
/// admin and its password reset to the configured one, so a restart with changed credentials
/// takes effect.
#[instrument(skip_all, fields(username = %admin.username))]
pub async fn create_initial_admin_user(admin: &AdminConfig, state: &AppState) -> anyhow::Result<UserId> {
    let password_hash = password::hash_string_blocking(admin.password.clone(), state.config.auth.password.argon2_params())
        .await
        .context("Failed to hash admin password")?;

    let users = Users::new(&state.db);

    if let Some(existing) = users.get_user_by_username(&admin.username).await? {
        let update = UserUpdateDBRequest {
            password_hash: Some(password_hash),
            role: Some(Role::Admin),
            is_active: Some(true),
            ..Default::default()
        };
        users.update(existing.id, &update).await.context("Failed to update admin user")?;
        info!("Initial admin user already present, credentials refreshed");
        return Ok(existing.id);
    }

    let created = users
        .create(&UserCreateDBRequest {
            full_name: admin.full_name.clone(),
            username: admin.username.clone(),
            email: admin.email.clone(),
            password_hash,
            role: Role::Admin,
            is_active: true,
        })
        .await
        .context("Failed to create admin user")?;

    info!(user_id = %created.id, "Created initial admin user");
    Ok(created.id)
}

/// Build the CORS layer from configuration.
///
/// No configured origins means no cross-origin access at all.
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE])
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router.
///
/// All API routes live under `/api/v1`. The OpenAPI document is at `/api/v1/openapi.json` and
/// the Scalar viewer at `/docs`.
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    use api::handlers::{auth, products, users};

    let api_routes = Router::new()
        // Sessions
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        // Users
        .route("/user", post(users::create_user).get(users::list_users))
        .route("/user/register", post(users::register))
        .route("/user/bootstrap-admin", post(users::bootstrap_admin))
        .route(
            "/user/{id}",
            get(users::get_user).patch(users::update_user).delete(users::delete_user),
        )
        // Products
        .route("/product", post(products::create_product).get(products::list_products))
        .route(
            "/product/{id}",
            get(products::get_product)
                .patch(products::update_product)
                .delete(products::delete_product),
        )
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(create_cors_layer(&state.config)?)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// The assembled service: state, router and the configuration it was built from.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] builds the store and auth components and creates the
///    configured admin account
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown future resolves, in-flight requests are drained
pub struct Application {
    router: Router,
    app_state: AppState,
    config: Config,
}

impl Application {
    /// Create a new application instance with an empty store
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let app_state = AppState::from_config(Database::new(), config.clone())?;

        if let Some(admin) = &config.admin {
            create_initial_admin_user(admin, &app_state).await?;
        }

        let router = build_router(&app_state)?;

        Ok(Self {
            router,
            app_state,
            config,
        })
    }

    #[cfg(test)]
    pub fn into_test_server(self) -> (axum_test::TestServer, AppState) {
        let server = axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server");
        (server, self.app_state)
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "recordctl listening on http://{}, API docs at http://localhost:{}/docs",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped");
        Ok(())
    }
}
