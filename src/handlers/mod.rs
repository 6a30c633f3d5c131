//! HTTP handlers, split by concern:
//! - `auth`: the signup / confirmation-code / token exchange flow.
//! - `users`: the self-service profile and the admin account surface.
//! - `catalog`: categories, genres and titles.
//! - `content`: reviews and comments.
//!
//! Every mutating handler routes its decision through the access-control
//! engine in [`crate::permissions`]; handlers own the orchestration (existence
//! checks, validation order, authorization) while storage invariants stay in
//! the repository.

use serde::Deserialize;

pub mod auth;
pub mod catalog;
pub mod content;
pub mod users;

pub use auth::{signup, token};
pub use catalog::{
    create_category, create_genre, create_title, delete_category, delete_genre, delete_title,
    get_title, list_categories, list_genres, list_titles, update_title,
};
pub use content::{
    create_comment, create_review, delete_comment, delete_review, get_comment, get_review,
    list_comments, list_reviews, update_comment, update_review,
};
pub use users::{
    admin_create_user, admin_delete_user, admin_get_user, admin_list_users, admin_update_user,
    get_me, update_me,
};

/// SearchFilter
///
/// The single accepted query parameter on the listing endpoints that support
/// text search (users, categories, genres): a case-insensitive substring
/// match.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SearchFilter {
    pub search: Option<String>,
}
