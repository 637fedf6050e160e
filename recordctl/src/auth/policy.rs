//! Static per-route authorization policy.
//!
//! Every routed endpoint has a [`RouteId`], and [`RouteId::policy`] is the single table that says
//! who may call it. Protected handlers take an [`Authorized`] extractor naming their route marker
//! from [`route`]; it resolves the caller and applies the policy while only the request head has
//! been read, so a body extractor never runs for a caller the policy turns away.

use std::{collections::HashMap, marker::PhantomData};

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use tracing::{debug, instrument};

use crate::{
    api::models::users::Role,
    auth::{
        context::{AuthContext, Identity},
        guards::{OwnershipGuard, RoleGuard},
    },
    errors::{Error, Result, TokenRejection},
    AppState,
};

const ADMIN_ONLY: &[Role] = &[Role::Admin];
const PUBLIC: &[Role] = &[];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteId {
    Login,
    Logout,
    Me,
    CreateUser,
    RegisterUser,
    BootstrapAdmin,
    ListUsers,
    GetUser,
    UpdateUser,
    DeleteUser,
    CreateProduct,
    ListProducts,
    GetProduct,
    UpdateProduct,
    DeleteProduct,
}

/// Who may call a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePolicy {
    /// Empty means no role restriction.
    pub required_roles: &'static [Role],
    /// Path parameter holding the id of the resource owner, if ownership is enforced.
    pub ownership_param: Option<&'static str>,
    /// Route needs an identity even though no role or ownership rule applies.
    pub authenticated: bool,
}

impl RoutePolicy {
    const fn public() -> Self {
        Self {
            required_roles: PUBLIC,
            ownership_param: None,
            authenticated: false,
        }
    }

    const fn admin() -> Self {
        Self {
            required_roles: ADMIN_ONLY,
            ownership_param: None,
            authenticated: true,
        }
    }

    const fn authenticated() -> Self {
        Self {
            required_roles: PUBLIC,
            ownership_param: None,
            authenticated: true,
        }
    }

    const fn owner(param: &'static str) -> Self {
        Self {
            required_roles: PUBLIC,
            ownership_param: Some(param),
            authenticated: true,
        }
    }

    pub fn requires_identity(&self) -> bool {
        self.authenticated || !self.required_roles.is_empty() || self.ownership_param.is_some()
    }
}

impl RouteId {
    pub const ALL: [RouteId; 15] = [
        RouteId::Login,
        RouteId::Logout,
        RouteId::Me,
        RouteId::CreateUser,
        RouteId::RegisterUser,
        RouteId::BootstrapAdmin,
        RouteId::ListUsers,
        RouteId::GetUser,
        RouteId::UpdateUser,
        RouteId::DeleteUser,
        RouteId::CreateProduct,
        RouteId::ListProducts,
        RouteId::GetProduct,
        RouteId::UpdateProduct,
        RouteId::DeleteProduct,
    ];

    pub const fn policy(self) -> RoutePolicy {
        match self {
            RouteId::Login | RouteId::Logout => RoutePolicy::public(),
            RouteId::Me => RoutePolicy::authenticated(),

            RouteId::CreateUser => RoutePolicy::admin(),
            RouteId::RegisterUser | RouteId::BootstrapAdmin => RoutePolicy::public(),
            RouteId::ListUsers | RouteId::GetUser | RouteId::DeleteUser => RoutePolicy::admin(),
            RouteId::UpdateUser => RoutePolicy::owner("id"),

            RouteId::ListProducts | RouteId::GetProduct => RoutePolicy::public(),
            RouteId::CreateProduct | RouteId::UpdateProduct | RouteId::DeleteProduct => RoutePolicy::admin(),
        }
    }
}

/// Apply the policy for `route` to the caller.
///
/// A missing identity on a route that needs one is reported as a missing token (401) before any
/// guard runs; guard denials are 403.
pub fn authorize(route: RouteId, identity: Option<&AuthContext>, params: &HashMap<String, String>) -> Result<()> {
    let policy = route.policy();

    if identity.is_none() && policy.requires_identity() {
        return Err(Error::InvalidToken {
            reason: TokenRejection::Missing,
        });
    }

    RoleGuard::decide(policy.required_roles, identity)
        .into_result()
        .map_err(|reason| Error::Forbidden { reason })?;

    if let Some(param) = policy.ownership_param {
        OwnershipGuard::decide(param, identity, params)
            .into_result()
            .map_err(|reason| Error::Forbidden { reason })?;
    }

    debug!(?route, "authorized");
    Ok(())
}

/// Type-level handle on a [`RouteId`], used to parameterize [`Authorized`].
pub trait Route: Send + Sync + 'static {
    const ID: RouteId;
}

/// Marker types for the routes that need an identity.
pub mod route {
    macro_rules! route_markers {
        ($($name:ident),* $(,)?) => {
            $(
                #[derive(Debug, Clone, Copy)]
                pub struct $name;

                impl super::Route for $name {
                    const ID: super::RouteId = super::RouteId::$name;
                }
            )*
        };
    }

    route_markers!(
        Me,
        CreateUser,
        ListUsers,
        GetUser,
        UpdateUser,
        DeleteUser,
        CreateProduct,
        UpdateProduct,
        DeleteProduct,
    );
}

/// A caller that passed the policy of route `R`.
#[derive(Debug, Clone)]
pub struct Authorized<R: Route> {
    pub context: AuthContext,
    _route: PhantomData<R>,
}

impl<R: Route> FromRequestParts<AppState> for Authorized<R> {
    type Rejection = Error;

    #[instrument(skip_all, fields(route = ?R::ID))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let Identity(identity) = Identity::from_request_parts(parts, state).await?;

        let params = match R::ID.policy().ownership_param {
            // Unreadable params leave the owner unknown, which the ownership guard denies
            Some(_) => Path::<HashMap<String, String>>::from_request_parts(parts, state)
                .await
                .map(|Path(params)| params)
                .unwrap_or_default(),
            None => HashMap::new(),
        };

        authorize(R::ID, identity.as_ref(), &params)?;
        let context = identity.ok_or(Error::InvalidToken {
            reason: TokenRejection::Missing,
        })?;

        Ok(Self {
            context,
            _route: PhantomData,
        })
    }
}
