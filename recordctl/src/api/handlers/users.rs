use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    api::{
        handlers::path_id,
        models::{
            pagination::{PaginatedResponse, Pagination},
            users::{Role, UserCreate, UserResponse, UserUpdate},
        },
    },
    auth::{
        password::hash_string_blocking,
        policy::{route, Authorized},
    },
    db::{
        errors::DbError,
        handlers::{users::UserFilter, Repository, Users},
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    errors::{Denial, Error, Result},
    AppState,
};

/// Validate, hash and build the store request for a new account.
async fn prepare_create(state: &AppState, request: UserCreate, role: Role) -> Result<UserCreateDBRequest> {
    let password_config = &state.config.auth.password;
    request.validate(password_config.min_length)?;

    let password_hash = hash_string_blocking(request.password, password_config.argon2_params()).await?;

    Ok(UserCreateDBRequest {
        full_name: request.full_name,
        username: request.username,
        email: request.email,
        password_hash,
        role,
        is_active: true,
    })
}

fn not_found(id: impl ToString) -> Error {
    Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    post,
    path = "/user",
    tag = "user",
    summary = "Create a user with any role (admin only)",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "Username or email already exists"),
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    _: Authorized<route::CreateUser>,
    Json(request): Json<UserCreate>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let role = request.role.unwrap_or_default();
    let create_request = prepare_create(&state, request, role).await?;
    let user = Users::new(&state.db).create(&create_request).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(
    post,
    path = "/user/register",
    tag = "user",
    summary = "Register a new customer account",
    request_body = UserCreate,
    responses(
        (status = 201, description = "Customer account created", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username or email already exists"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<UserCreate>) -> Result<(StatusCode, Json<UserResponse>)> {
    if request.role.is_some_and(|role| role != Role::Customer) {
        tracing::debug!("ignoring requested role on public registration");
    }

    let create_request = prepare_create(&state, request, Role::Customer).await?;
    let user = Users::new(&state.db).create(&create_request).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(
    post,
    path = "/user/bootstrap-admin",
    tag = "user",
    summary = "Create the first admin account (only while no admin exists)",
    request_body = UserCreate,
    responses(
        (status = 201, description = "First admin created", body = UserResponse),
        (status = 400, description = "Invalid input, or an admin already exists"),
        (status = 409, description = "Username or email already exists"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn bootstrap_admin(
    State(state): State<AppState>,
    Json(request): Json<UserCreate>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let repo = Users::new(&state.db);
    // Checked again under the bootstrap lock
    if repo.any_with_role(Role::Admin).await? {
        return Err(admin_exists());
    }

    let create_request = prepare_create(&state, request, Role::Admin).await?;
    let user = repo.create_first_admin(&create_request).await?.ok_or_else(admin_exists)?;

    tracing::info!(user_id = %user.id, "bootstrap admin created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

fn admin_exists() -> Error {
    Error::BadRequest {
        message: "Admin user already exists. Use POST /user with admin authentication.".to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/user",
    tag = "user",
    summary = "List active users",
    params(Pagination),
    responses(
        (status = 200, description = "Page of active users", body = PaginatedResponse<UserResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required"),
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    _: Authorized<route::ListUsers>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<UserResponse>>> {
    let repo = Users::new(&state.db);
    let filter = UserFilter::new(pagination.skip(), pagination.limit());
    let users = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    let data = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, &pagination)))
}

#[utoipa::path(
    get,
    path = "/user/{id}",
    tag = "user",
    summary = "Get a user",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 400, description = "Invalid user ID"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found"),
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_user(
    State(state): State<AppState>,
    _: Authorized<route::GetUser>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<Json<UserResponse>> {
    let user_id = path_id(&params, "User")?;

    let user = Users::new(&state.db).get_by_id(user_id).await?.ok_or_else(|| not_found(user_id))?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    patch,
    path = "/user/{id}",
    tag = "user",
    summary = "Update a user (owner or admin)",
    params(("id" = String, Path, description = "User ID")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the owner, or a non-admin setting a role or active state different from the stored one"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Username or email already exists"),
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    caller: Authorized<route::UpdateUser>,
    Path(params): Path<HashMap<String, String>>,
    Json(request): Json<UserUpdate>,
) -> Result<Json<UserResponse>> {
    let user_id = path_id(&params, "User")?;
    let repo = Users::new(&state.db);

    if !caller.context.is_admin() {
        let current = repo.get_by_id(user_id).await?.ok_or_else(|| not_found(user_id))?;
        if request.changes_privileges(current.role, current.is_active) {
            return Err(Error::Forbidden {
                reason: Denial::RoleNotPermitted,
            });
        }
    }

    let password_config = &state.config.auth.password;
    request.validate(password_config.min_length)?;

    let password_hash = match request.password {
        Some(password) => Some(hash_string_blocking(password, password_config.argon2_params()).await?),
        None => None,
    };

    let update = UserUpdateDBRequest {
        full_name: request.full_name,
        username: request.username,
        email: request.email,
        password_hash,
        role: request.role,
        is_active: request.is_active,
    };

    let user = repo.update(user_id, &update).await.map_err(|e| match e {
        DbError::NotFound => not_found(user_id),
        other => other.into(),
    })?;

    Ok(Json(user.into()))
}

#[utoipa::path(
    delete,
    path = "/user/{id}",
    tag = "user",
    summary = "Delete a user",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Invalid user ID"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found"),
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_user(
    State(state): State<AppState>,
    _: Authorized<route::DeleteUser>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<StatusCode> {
    let user_id = path_id(&params, "User")?;

    if Users::new(&state.db).delete(user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(user_id))
    }
}
