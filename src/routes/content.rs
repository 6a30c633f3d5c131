use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Content Router Module
///
/// The nested review/comment tree under `/titles/{title_id}`. Read and write
/// methods share every path here, so this router carries no auth middleware:
/// GET handlers serve anonymous clients, while each mutating handler takes
/// the `AuthUser` extractor and rejects unauthenticated requests with 401
/// before any work happens. Object-level authorization (author, moderator,
/// admin) runs inside the handlers via the access-control engine.
pub fn content_routes() -> Router<AppState> {
    Router::new()
        // GET  /titles/{title_id}/reviews          — list, newest first
        // POST /titles/{title_id}/reviews          — one per (author, title)
        .route(
            "/titles/{title_id}/reviews",
            get(handlers::list_reviews).post(handlers::create_review),
        )
        // GET    /titles/{title_id}/reviews/{review_id}
        // PATCH  /titles/{title_id}/reviews/{review_id} — author/moderator/admin
        // DELETE /titles/{title_id}/reviews/{review_id} — cascades to comments
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            get(handlers::get_review)
                .patch(handlers::update_review)
                .delete(handlers::delete_review),
        )
        // GET  /titles/{title_id}/reviews/{review_id}/comments
        // POST /titles/{title_id}/reviews/{review_id}/comments
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        // GET/PATCH/DELETE /titles/{title_id}/reviews/{review_id}/comments/{comment_id}
        // The full parent chain is verified on every method; a mismatched
        // chain is a 404 indistinguishable from absence.
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            get(handlers::get_comment)
                .patch(handlers::update_comment)
                .delete(handlers::delete_comment),
        )
}
