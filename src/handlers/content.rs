use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    errors::ApiError,
    models::{Comment, CommentRequest, CreateReviewRequest, Review, UpdateReviewRequest},
    permissions::{Action, authorize},
    validation::validate_score,
};

fn require(decision: crate::permissions::Decision) -> Result<(), ApiError> {
    if decision.is_allowed() {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Resolves the parent title or fails with 404. Content under a nonexistent
/// title is indistinguishable from absence.
async fn require_title(state: &AppState, title_id: Uuid) -> Result<(), ApiError> {
    state
        .repo
        .get_title(title_id)
        .await?
        .map(|_| ())
        .ok_or(ApiError::NotFound)
}

/// Resolves a review scoped to its claimed parent title. A real review id
/// under the wrong title is a 404, same as a missing one.
async fn require_review(
    state: &AppState,
    title_id: Uuid,
    review_id: Uuid,
) -> Result<Review, ApiError> {
    require_title(state, title_id).await?;
    state
        .repo
        .get_review(title_id, review_id)
        .await?
        .ok_or(ApiError::NotFound)
}

// --- Reviews ---

/// list_reviews
///
/// [Public Route] All reviews of a title, newest first.
#[utoipa::path(
    get,
    path = "/titles/{title_id}/reviews",
    params(("title_id" = Uuid, Path, description = "Title ID")),
    responses(
        (status = 200, description = "Reviews", body = [Review]),
        (status = 404, description = "Unknown title")
    )
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(title_id): Path<Uuid>,
) -> Result<Json<Vec<Review>>, ApiError> {
    require_title(&state, title_id).await?;
    let reviews = state.repo.list_reviews(title_id).await?;
    Ok(Json(reviews))
}

/// get_review
///
/// [Public Route] A single review, addressed through its parent title.
#[utoipa::path(
    get,
    path = "/titles/{title_id}/reviews/{review_id}",
    params(
        ("title_id" = Uuid, Path, description = "Title ID"),
        ("review_id" = Uuid, Path, description = "Review ID")
    ),
    responses(
        (status = 200, description = "Review", body = Review),
        (status = 404, description = "Unknown title or review")
    )
)]
pub async fn get_review(
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Review>, ApiError> {
    let review = require_review(&state, title_id, review_id).await?;
    Ok(Json(review))
}

/// create_review
///
/// [Authenticated Route] Posts a review on a title.
///
/// *Ordering*: parent existence is checked first (404 before anything else),
/// then the score domain (400), and only then the one-review-per-author
/// invariant (400 conflict) via the storage constraint.
#[utoipa::path(
    post,
    path = "/titles/{title_id}/reviews",
    params(("title_id" = Uuid, Path, description = "Title ID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Created", body = Review),
        (status = 400, description = "Bad score or duplicate review"),
        (status = 404, description = "Unknown title")
    )
)]
pub async fn create_review(
    identity: AuthUser,
    State(state): State<AppState>,
    Path(title_id): Path<Uuid>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    require(authorize(Some(&identity), Action::ContentCreate, None))?;
    require_title(&state, title_id).await?;
    validate_score(payload.score)?;

    let review = state
        .repo
        .create_review(title_id, identity.id, payload.text, payload.score)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// update_review
///
/// [Authenticated Route] Partial edit of a review. Author, moderator or
/// admin; `pub_date` and authorship never change.
#[utoipa::path(
    patch,
    path = "/titles/{title_id}/reviews/{review_id}",
    params(
        ("title_id" = Uuid, Path, description = "Title ID"),
        ("review_id" = Uuid, Path, description = "Review ID")
    ),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Updated", body = Review),
        (status = 403, description = "Not author, moderator or admin"),
        (status = 404, description = "Unknown title or review")
    )
)]
pub async fn update_review(
    identity: AuthUser,
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<Json<Review>, ApiError> {
    let review = require_review(&state, title_id, review_id).await?;
    require(authorize(
        Some(&identity),
        Action::ContentModify,
        Some(review.author_id),
    ))?;
    if let Some(score) = payload.score {
        validate_score(score)?;
    }

    let updated = state
        .repo
        .update_review(review_id, payload.text, payload.score)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(updated))
}

/// delete_review
///
/// [Authenticated Route] Removes a review and, by cascade, its comments.
#[utoipa::path(
    delete,
    path = "/titles/{title_id}/reviews/{review_id}",
    params(
        ("title_id" = Uuid, Path, description = "Title ID"),
        ("review_id" = Uuid, Path, description = "Review ID")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not author, moderator or admin"),
        (status = 404, description = "Unknown title or review")
    )
)]
pub async fn delete_review(
    identity: AuthUser,
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let review = require_review(&state, title_id, review_id).await?;
    require(authorize(
        Some(&identity),
        Action::ContentModify,
        Some(review.author_id),
    ))?;

    if state.repo.delete_review(review_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

// --- Comments ---

/// list_comments
///
/// [Public Route] All comments on a review, newest first.
#[utoipa::path(
    get,
    path = "/titles/{title_id}/reviews/{review_id}/comments",
    params(
        ("title_id" = Uuid, Path, description = "Title ID"),
        ("review_id" = Uuid, Path, description = "Review ID")
    ),
    responses(
        (status = 200, description = "Comments", body = [Comment]),
        (status = 404, description = "Unknown title or review")
    )
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    require_review(&state, title_id, review_id).await?;
    let comments = state.repo.list_comments(review_id).await?;
    Ok(Json(comments))
}

/// get_comment
///
/// [Public Route] A single comment, addressed through its full parent chain.
#[utoipa::path(
    get,
    path = "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
    params(
        ("title_id" = Uuid, Path, description = "Title ID"),
        ("review_id" = Uuid, Path, description = "Review ID"),
        ("comment_id" = Uuid, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Comment", body = Comment),
        (status = 404, description = "Unknown title, review or comment")
    )
)]
pub async fn get_comment(
    State(state): State<AppState>,
    Path((title_id, review_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<Comment>, ApiError> {
    require_review(&state, title_id, review_id).await?;
    let comment = state
        .repo
        .get_comment(review_id, comment_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(comment))
}

/// create_comment
///
/// [Authenticated Route] Posts a comment on a review. Unlike reviews, there
/// is no per-author limit.
#[utoipa::path(
    post,
    path = "/titles/{title_id}/reviews/{review_id}/comments",
    params(
        ("title_id" = Uuid, Path, description = "Title ID"),
        ("review_id" = Uuid, Path, description = "Review ID")
    ),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Created", body = Comment),
        (status = 404, description = "Unknown title or review")
    )
)]
pub async fn create_comment(
    identity: AuthUser,
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    require(authorize(Some(&identity), Action::ContentCreate, None))?;
    require_review(&state, title_id, review_id).await?;

    let comment = state
        .repo
        .create_comment(review_id, identity.id, payload.text)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// update_comment
///
/// [Authenticated Route] Edits a comment's text. Author, moderator or admin.
#[utoipa::path(
    patch,
    path = "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
    params(
        ("title_id" = Uuid, Path, description = "Title ID"),
        ("review_id" = Uuid, Path, description = "Review ID"),
        ("comment_id" = Uuid, Path, description = "Comment ID")
    ),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Updated", body = Comment),
        (status = 403, description = "Not author, moderator or admin"),
        (status = 404, description = "Unknown title, review or comment")
    )
)]
pub async fn update_comment(
    identity: AuthUser,
    State(state): State<AppState>,
    Path((title_id, review_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    require_review(&state, title_id, review_id).await?;
    let comment = state
        .repo
        .get_comment(review_id, comment_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    require(authorize(
        Some(&identity),
        Action::ContentModify,
        Some(comment.author_id),
    ))?;

    let updated = state
        .repo
        .update_comment(comment_id, payload.text)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(updated))
}

/// delete_comment
///
/// [Authenticated Route] Removes a comment. Author, moderator or admin.
#[utoipa::path(
    delete,
    path = "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
    params(
        ("title_id" = Uuid, Path, description = "Title ID"),
        ("review_id" = Uuid, Path, description = "Review ID"),
        ("comment_id" = Uuid, Path, description = "Comment ID")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not author, moderator or admin"),
        (status = 404, description = "Unknown title, review or comment")
    )
)]
pub async fn delete_comment(
    identity: AuthUser,
    State(state): State<AppState>,
    Path((title_id, review_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    require_review(&state, title_id, review_id).await?;
    let comment = state
        .repo
        .get_comment(review_id, comment_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    require(authorize(
        Some(&identity),
        Action::ContentModify,
        Some(comment.author_id),
    ))?;

    if state.repo.delete_comment(comment_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
