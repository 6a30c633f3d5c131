use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes for any user holding a valid bearer token, wrapped in the auth
/// middleware at assembly time. Currently the self-service profile surface;
/// content creation lives in the `content` module because those paths are
/// shared with anonymous reads.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET   /users/me — own profile, freshly read from storage.
        // PATCH /users/me — partial self-update; any `role` field is ignored,
        // so privileges can only ever change through the admin surface.
        .route("/users/me", get(handlers::get_me).patch(handlers::update_me))
}
