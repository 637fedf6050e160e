//! Request-time authorization decisions. Guards only look at their arguments.

use std::collections::HashMap;

use crate::{api::models::users::Role, auth::context::AuthContext, errors::Denial};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn into_result(self) -> Result<(), Denial> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(denial) => Err(denial),
        }
    }
}

/// Does the caller's role satisfy a route's allowlist?
pub struct RoleGuard;

impl RoleGuard {
    /// An empty allowlist means the route is public.
    pub fn decide(required: &[Role], context: Option<&AuthContext>) -> Decision {
        if required.is_empty() {
            return Decision::Allow;
        }
        match context {
            None => Decision::Deny(Denial::NoIdentity),
            Some(ctx) if required.contains(&ctx.role) => Decision::Allow,
            Some(_) => Decision::Deny(Denial::RoleNotPermitted),
        }
    }
}

/// May the caller act on the resource named by a path parameter?
pub struct OwnershipGuard;

impl OwnershipGuard {
    /// Admins may act on any resource; everyone else only where `params[param]` is their own
    /// subject id, compared as exact strings.
    pub fn decide(param: &str, context: Option<&AuthContext>, params: &HashMap<String, String>) -> Decision {
        let Some(ctx) = context else {
            return Decision::Deny(Denial::NoIdentity);
        };
        if ctx.is_admin() {
            return Decision::Allow;
        }
        match params.get(param) {
            Some(value) if *value == ctx.subject_id => Decision::Allow,
            _ => Decision::Deny(Denial::NotResourceOwner),
        }
    }
}
