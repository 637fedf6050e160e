//! Authentication and authorization.
//!
//! # Authentication
//!
//! Login checks a username/password pair against the user store and answers with a signed,
//! expiring session token carried in an HTTP-only cookie:
//!
//! ```text
//! login ─→ CredentialVerifier ─→ TokenCodec::issue ─→ CookieTransport::set_auth_cookie ─→ response
//! ```
//!
//! Handlers of protected routes resolve the caller's identity once, through the
//! [`policy::Authorized`] extractor, before the request body is read:
//!
//! ```text
//! request ─→ TokenExtractor ─→ TokenCodec::verify ─→ Option<AuthContext>
//! ```
//!
//! A request without a token is anonymous. A forged, malformed or expired token is rejected with
//! 401. Public handlers never resolve an identity, so a stale cookie cannot lock a caller out of
//! login or the public catalog.
//!
//! # Authorization
//!
//! Each endpoint has a static [`policy::RoutePolicy`]: a role allowlist and optionally the path
//! parameter that names the resource owner. [`policy::authorize`] feeds the identity to
//! [`guards::RoleGuard`] and [`guards::OwnershipGuard`]. `Authorized<R>` runs it for the route
//! marker `R` as a parts extractor, so an anonymous or under-privileged caller gets 401 or 403
//! whatever body it sent.
//!
//! # Modules
//!
//! - [`context`]: `AuthContext`, its resolver and the axum extractors
//! - [`cookie`]: Session cookie formatting and token extraction
//! - [`credentials`]: Credential store trait and password verification
//! - [`guards`]: Role and ownership decisions
//! - [`password`]: Argon2 password hashing
//! - [`policy`]: Route policy table and the `Authorized` extractor
//! - [`session`]: Token signing and verification
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use recordctl::auth::policy::{route, Authorized};
//!
//! async fn update_product(
//!     State(state): State<AppState>,
//!     _: Authorized<route::UpdateProduct>,
//!     Path(params): Path<HashMap<String, String>>,
//!     Json(request): Json<ProductUpdate>,
//! ) -> Result<Json<ProductResponse>> {
//!     // ...
//! }
//! ```

pub mod context;
pub mod cookie;
pub mod credentials;
pub mod guards;
pub mod password;
pub mod policy;
pub mod session;
