use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// User administration and catalog writes, nested under `/admin`. The tier
/// is enforced twice: the surrounding auth middleware guarantees an
/// authenticated caller, and every handler then routes through the
/// access-control engine, which grants the admin capability to
/// `role == admin` OR the staff flag.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET  /admin/users?search=... — list accounts
        // POST /admin/users            — create an account directly
        .route(
            "/users",
            get(handlers::admin_list_users).post(handlers::admin_create_user),
        )
        // GET/PATCH/DELETE /admin/users/{username}
        // The only place `role` can change; deletion cascades to the
        // account's reviews and comments.
        .route(
            "/users/{username}",
            get(handlers::admin_get_user)
                .patch(handlers::admin_update_user)
                .delete(handlers::admin_delete_user),
        )
        // POST /admin/categories, DELETE /admin/categories/{slug}
        // Category removal detaches titles (category becomes null).
        .route("/categories", post(handlers::create_category))
        .route("/categories/{slug}", axum::routing::delete(handlers::delete_category))
        // POST /admin/genres, DELETE /admin/genres/{slug}
        .route("/genres", post(handlers::create_genre))
        .route("/genres/{slug}", axum::routing::delete(handlers::delete_genre))
        // POST /admin/titles, PATCH/DELETE /admin/titles/{id}
        .route("/titles", post(handlers::create_title))
        .route(
            "/titles/{id}",
            axum::routing::patch(handlers::update_title).delete(handlers::delete_title),
        )
}
