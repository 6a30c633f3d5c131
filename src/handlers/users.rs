use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    errors::ApiError,
    models::{CreateUserRequest, UpdateProfileRequest, User, UserPatch},
    permissions::{Action, authorize},
    validation::{validate_email, validate_username},
};

use super::SearchFilter;

fn require_user_admin(identity: &AuthUser) -> Result<(), ApiError> {
    if !authorize(Some(identity), Action::UserAdmin, None).is_allowed() {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

/// get_me
///
/// [Authenticated Route] Returns the caller's own profile, freshly read from
/// storage (not from the token snapshot, which may be stale).
#[utoipa::path(
    get,
    path = "/users/me",
    responses((status = 200, description = "Own profile", body = User))
)]
pub async fn get_me(
    identity: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .repo
        .find_user_by_username(&identity.username)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(user))
}

/// update_me
///
/// [Authenticated Route] Partial update of the caller's own profile.
///
/// *Invariant*: a `role` field in the payload is ignored on this path for
/// every caller, admin included. Self-service can never change privileges.
#[utoipa::path(
    patch,
    path = "/users/me",
    request_body = UpdateProfileRequest,
    responses((status = 200, description = "Updated profile", body = User))
)]
pub async fn update_me(
    identity: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    if let Some(email) = &payload.email {
        validate_email(email)?;
    }
    let patch = UserPatch {
        email: payload.email,
        first_name: payload.first_name,
        last_name: payload.last_name,
        bio: payload.bio,
        // Dropped regardless of what the payload carried.
        role: None,
    };
    let user = state
        .repo
        .update_user(&identity.username, patch)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(user))
}

/// admin_list_users
///
/// [Admin Route] Lists every account, optionally narrowed by a username
/// substring search.
#[utoipa::path(
    get,
    path = "/admin/users",
    params(SearchFilter),
    responses((status = 200, description = "Accounts", body = [User]))
)]
pub async fn admin_list_users(
    identity: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<SearchFilter>,
) -> Result<Json<Vec<User>>, ApiError> {
    require_user_admin(&identity)?;
    let users = state.repo.list_users(filter.search.as_deref()).await?;
    Ok(Json(users))
}

/// admin_create_user
///
/// [Admin Route] Creates an account directly, bypassing the signup flow. The
/// account holds no confirmation code until its owner runs signup themselves.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 400, description = "Validation or uniqueness conflict")
    )
)]
pub async fn admin_create_user(
    identity: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    require_user_admin(&identity)?;
    validate_username(&payload.username)?;
    validate_email(&payload.email)?;

    let user = User {
        id: Uuid::new_v4(),
        username: payload.username,
        email: payload.email,
        first_name: payload.first_name,
        last_name: payload.last_name,
        bio: payload.bio,
        role: payload.role,
        ..Default::default()
    };
    let created = state.repo.create_user(user).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// admin_get_user
///
/// [Admin Route] Fetches a single account by username.
#[utoipa::path(
    get,
    path = "/admin/users/{username}",
    params(("username" = String, Path, description = "Account username")),
    responses(
        (status = 200, description = "Account", body = User),
        (status = 404, description = "Unknown username")
    )
)]
pub async fn admin_get_user(
    identity: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<User>, ApiError> {
    require_user_admin(&identity)?;
    let user = state
        .repo
        .find_user_by_username(&username)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(user))
}

/// admin_update_user
///
/// [Admin Route] Partial account update. Unlike the self-service path, `role`
/// is honored here; this is the only way privileges change.
#[utoipa::path(
    patch,
    path = "/admin/users/{username}",
    params(("username" = String, Path, description = "Account username")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 404, description = "Unknown username")
    )
)]
pub async fn admin_update_user(
    identity: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    require_user_admin(&identity)?;
    if let Some(email) = &payload.email {
        validate_email(email)?;
    }
    let patch = UserPatch {
        email: payload.email,
        first_name: payload.first_name,
        last_name: payload.last_name,
        bio: payload.bio,
        role: payload.role,
    };
    let user = state
        .repo
        .update_user(&username, patch)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(user))
}

/// admin_delete_user
///
/// [Admin Route] Removes an account. The account's reviews and comments go
/// with it (storage-level cascade).
#[utoipa::path(
    delete,
    path = "/admin/users/{username}",
    params(("username" = String, Path, description = "Account username")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Unknown username")
    )
)]
pub async fn admin_delete_user(
    identity: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_user_admin(&identity)?;
    if state.repo.delete_user(&username).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
