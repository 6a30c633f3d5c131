use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints accessible to any client, anonymous included: the health probe,
/// the signup/token gateway, and the read-only catalog surface. The catalog
/// is world-readable by design; the write methods for the same resources
/// live under `/admin`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe for monitors and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/signup
        // Registers a (username, email) pair and emails a confirmation code.
        // Idempotent for the exact pair; each call replaces the pending code.
        .route("/auth/signup", post(handlers::signup))
        // POST /auth/token
        // Exchanges a confirmation code for a signed bearer token.
        .route("/auth/token", post(handlers::token))
        // GET /categories?search=...
        // GET /genres?search=...
        // Taxonomy listings with optional name search.
        .route("/categories", get(handlers::list_categories))
        .route("/genres", get(handlers::list_genres))
        // GET /titles?name=...&category=...&genre=...&genre=...&year=...
        // Filterable title listing; `genre` may repeat and ORs across slugs.
        .route("/titles", get(handlers::list_titles))
        // GET /titles/{title_id}
        // A single title with its aggregated rating. The segment name matches
        // the nested review routes; the router requires them to agree.
        .route("/titles/{title_id}", get(handlers::get_title))
}
