use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::filters::TitleFilter;
use crate::models::{
    Category, Comment, CreateTitleRequest, Genre, Review, TermRequest, Title, UpdateTitleRequest,
    User, UserPatch,
};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// Repository Trait
///
/// Abstract contract for all persistence operations, shared as
/// `Arc<dyn Repository>` across Axum's task boundaries. Handlers never see
/// the concrete backend: Postgres in production, the in-memory
/// implementation in tests.
///
/// Conventions:
/// - `find_*`/`get_*` return `Ok(None)` for absence; only infrastructure
///   failures become errors.
/// - Creation methods surface uniqueness violations as
///   [`ApiError::Conflict`] with the constraint already translated to a
///   client message; the database constraint remains the authority.
/// - Deletions return whether a row was removed.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users & signup ---
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ApiError>;
    /// Exact (username, email) pair lookup, used by the idempotent signup
    /// retry path.
    async fn find_user_by_pair(&self, username: &str, email: &str)
    -> Result<Option<User>, ApiError>;
    async fn create_user(&self, user: User) -> Result<User, ApiError>;
    /// Overwrites the pending confirmation code; last write wins.
    async fn set_confirmation_code(&self, user_id: Uuid, code: i32) -> Result<(), ApiError>;
    async fn list_users(&self, search: Option<&str>) -> Result<Vec<User>, ApiError>;
    /// COALESCE-style partial update addressed by username.
    async fn update_user(&self, username: &str, patch: UserPatch)
    -> Result<Option<User>, ApiError>;
    async fn delete_user(&self, username: &str) -> Result<bool, ApiError>;

    // --- Taxonomy ---
    async fn list_categories(&self, search: Option<&str>) -> Result<Vec<Category>, ApiError>;
    async fn create_category(&self, req: TermRequest) -> Result<Category, ApiError>;
    async fn delete_category(&self, slug: &str) -> Result<bool, ApiError>;
    async fn list_genres(&self, search: Option<&str>) -> Result<Vec<Genre>, ApiError>;
    async fn create_genre(&self, req: TermRequest) -> Result<Genre, ApiError>;
    async fn delete_genre(&self, slug: &str) -> Result<bool, ApiError>;

    // --- Titles ---
    /// Filtered listing; `rating` is aggregated at read time in the query.
    async fn list_titles(&self, filter: &TitleFilter) -> Result<Vec<Title>, ApiError>;
    async fn get_title(&self, id: Uuid) -> Result<Option<Title>, ApiError>;
    async fn create_title(&self, req: CreateTitleRequest) -> Result<Title, ApiError>;
    async fn update_title(
        &self,
        id: Uuid,
        req: UpdateTitleRequest,
    ) -> Result<Option<Title>, ApiError>;
    async fn delete_title(&self, id: Uuid) -> Result<bool, ApiError>;

    // --- Reviews ---
    async fn list_reviews(&self, title_id: Uuid) -> Result<Vec<Review>, ApiError>;
    async fn get_review(&self, title_id: Uuid, review_id: Uuid)
    -> Result<Option<Review>, ApiError>;
    /// Enforces one-review-per-(author, title); a duplicate surfaces as a
    /// Conflict even under concurrent inserts (unique constraint).
    async fn create_review(
        &self,
        title_id: Uuid,
        author_id: Uuid,
        text: String,
        score: i32,
    ) -> Result<Review, ApiError>;
    async fn update_review(
        &self,
        review_id: Uuid,
        text: Option<String>,
        score: Option<i32>,
    ) -> Result<Option<Review>, ApiError>;
    async fn delete_review(&self, review_id: Uuid) -> Result<bool, ApiError>;

    // --- Comments ---
    async fn list_comments(&self, review_id: Uuid) -> Result<Vec<Comment>, ApiError>;
    async fn get_comment(
        &self,
        review_id: Uuid,
        comment_id: Uuid,
    ) -> Result<Option<Comment>, ApiError>;
    async fn create_comment(
        &self,
        review_id: Uuid,
        author_id: Uuid,
        text: String,
    ) -> Result<Comment, ApiError>;
    async fn update_comment(
        &self,
        comment_id: Uuid,
        text: String,
    ) -> Result<Option<Comment>, ApiError>;
    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool, ApiError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;
