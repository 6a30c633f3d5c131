use axum::{
    Json,
    extract::{Path, Query, RawQuery, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    errors::ApiError,
    filters::TitleFilter,
    models::{Category, CreateTitleRequest, Genre, TermRequest, Title, UpdateTitleRequest},
    permissions::{Action, authorize},
    validation::{validate_term, validate_year},
};

use super::SearchFilter;

fn require_catalog_write(identity: &AuthUser) -> Result<(), ApiError> {
    if !authorize(Some(identity), Action::CatalogWrite, None).is_allowed() {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

// --- Categories ---

/// list_categories
///
/// [Public Route] Lists every category, optionally narrowed by a name search.
#[utoipa::path(
    get,
    path = "/categories",
    params(SearchFilter),
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(filter): Query<SearchFilter>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = state.repo.list_categories(filter.search.as_deref()).await?;
    Ok(Json(categories))
}

/// create_category
///
/// [Admin Route] Adds a category. The slug must be unique across categories.
#[utoipa::path(
    post,
    path = "/admin/categories",
    request_body = TermRequest,
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 400, description = "Validation or slug conflict")
    )
)]
pub async fn create_category(
    identity: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<TermRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    require_catalog_write(&identity)?;
    validate_term(&payload.name, &payload.slug)?;
    let category = state.repo.create_category(payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// delete_category
///
/// [Admin Route] Removes a category by slug. Titles that belonged to it are
/// detached (their category becomes null), never deleted.
#[utoipa::path(
    delete,
    path = "/admin/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Unknown slug")
    )
)]
pub async fn delete_category(
    identity: AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_catalog_write(&identity)?;
    if state.repo.delete_category(&slug).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

// --- Genres ---

/// list_genres
///
/// [Public Route] Lists every genre, optionally narrowed by a name search.
#[utoipa::path(
    get,
    path = "/genres",
    params(SearchFilter),
    responses((status = 200, description = "Genres", body = [Genre]))
)]
pub async fn list_genres(
    State(state): State<AppState>,
    Query(filter): Query<SearchFilter>,
) -> Result<Json<Vec<Genre>>, ApiError> {
    let genres = state.repo.list_genres(filter.search.as_deref()).await?;
    Ok(Json(genres))
}

/// create_genre
///
/// [Admin Route] Adds a genre. The slug must be unique across genres.
#[utoipa::path(
    post,
    path = "/admin/genres",
    request_body = TermRequest,
    responses(
        (status = 201, description = "Created", body = Genre),
        (status = 400, description = "Validation or slug conflict")
    )
)]
pub async fn create_genre(
    identity: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<TermRequest>,
) -> Result<(StatusCode, Json<Genre>), ApiError> {
    require_catalog_write(&identity)?;
    validate_term(&payload.name, &payload.slug)?;
    let genre = state.repo.create_genre(payload).await?;
    Ok((StatusCode::CREATED, Json(genre)))
}

/// delete_genre
///
/// [Admin Route] Removes a genre by slug. Titles keep existing; the genre is
/// simply dropped from their genre sets.
#[utoipa::path(
    delete,
    path = "/admin/genres/{slug}",
    params(("slug" = String, Path, description = "Genre slug")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Unknown slug")
    )
)]
pub async fn delete_genre(
    identity: AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_catalog_write(&identity)?;
    if state.repo.delete_genre(&slug).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

// --- Titles ---

/// list_titles
///
/// [Public Route] Lists titles with combinable filters. `genre` may repeat
/// (OR across the given slugs); all other filters AND together. The raw query
/// string is parsed by [`TitleFilter`] because the standard extractor cannot
/// represent a repeated key.
#[utoipa::path(
    get,
    path = "/titles",
    params(
        ("name" = Option<String>, Query, description = "Substring name match"),
        ("category" = Option<String>, Query, description = "Exact category slug"),
        ("genre" = Option<String>, Query, description = "Genre slug, repeatable"),
        ("year" = Option<i32>, Query, description = "Exact release year")
    ),
    responses((status = 200, description = "Titles", body = [Title]))
)]
pub async fn list_titles(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<Title>>, ApiError> {
    let filter = TitleFilter::parse(query.as_deref().unwrap_or(""));
    let titles = state.repo.list_titles(&filter).await?;
    Ok(Json(titles))
}

/// get_title
///
/// [Public Route] A single title with its aggregated rating (null until the
/// first review lands).
#[utoipa::path(
    get,
    path = "/titles/{title_id}",
    params(("title_id" = Uuid, Path, description = "Title ID")),
    responses(
        (status = 200, description = "Title", body = Title),
        (status = 404, description = "Unknown title")
    )
)]
pub async fn get_title(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Title>, ApiError> {
    let title = state.repo.get_title(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(title))
}

/// create_title
///
/// [Admin Route] Adds a title. `genre`/`category` reference existing taxonomy
/// entries by slug; an unknown slug is a validation error, not a silent skip.
#[utoipa::path(
    post,
    path = "/admin/titles",
    request_body = CreateTitleRequest,
    responses(
        (status = 201, description = "Created", body = Title),
        (status = 400, description = "Validation failure")
    )
)]
pub async fn create_title(
    identity: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateTitleRequest>,
) -> Result<(StatusCode, Json<Title>), ApiError> {
    require_catalog_write(&identity)?;
    validate_year(payload.year)?;
    let title = state.repo.create_title(payload).await?;
    Ok((StatusCode::CREATED, Json(title)))
}

/// update_title
///
/// [Admin Route] Partial title update. A present `genre` list replaces the
/// title's genre set wholesale.
#[utoipa::path(
    patch,
    path = "/admin/titles/{id}",
    params(("id" = Uuid, Path, description = "Title ID")),
    request_body = UpdateTitleRequest,
    responses(
        (status = 200, description = "Updated", body = Title),
        (status = 404, description = "Unknown title")
    )
)]
pub async fn update_title(
    identity: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTitleRequest>,
) -> Result<Json<Title>, ApiError> {
    require_catalog_write(&identity)?;
    if let Some(year) = payload.year {
        validate_year(year)?;
    }
    let title = state
        .repo
        .update_title(id, payload)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(title))
}

/// delete_title
///
/// [Admin Route] Removes a title and, by cascade, its reviews and their
/// comments.
#[utoipa::path(
    delete,
    path = "/admin/titles/{id}",
    params(("id" = Uuid, Path, description = "Title ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Unknown title")
    )
)]
pub async fn delete_title(
    identity: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_catalog_write(&identity)?;
    if state.repo.delete_title(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
