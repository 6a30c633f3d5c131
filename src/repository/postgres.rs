use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use crate::constants::{DOUBLE_EMAIL_ERROR, DOUBLE_REVIEW_ERROR, DOUBLE_USERNAME_ERROR};
use crate::errors::ApiError;
use crate::filters::TitleFilter;
use crate::models::{
    Category, Comment, CreateTitleRequest, Genre, Review, TermRequest, Title, TitleRow,
    UpdateTitleRequest, User, UserPatch,
};

use super::Repository;

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, bio, role, is_staff, confirmation_code";

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.title_id, r.author_id, u.username AS author, r.text, r.pub_date, r.score
    FROM reviews r
    JOIN users u ON u.id = r.author_id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.review_id, c.author_id, u.username AS author, c.text, c.pub_date
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

// Category join and read-time rating aggregation shared by every title read.
const TITLE_SELECT: &str = r#"
    SELECT t.id, t.name, t.year, AVG(r.score)::float8 AS rating, t.description,
           c.id AS category_id, c.name AS category_name, c.slug AS category_slug
    FROM titles t
    LEFT JOIN categories c ON c.id = t.category_id
    LEFT JOIN reviews r ON r.title_id = t.id
"#;

/// Translates storage-level constraint violations into the client-facing
/// taxonomy. Unique violations are resolved by constraint name; foreign-key
/// violations mean a referenced parent vanished and read as NotFound.
fn map_constraint(e: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some("users_username_key") => ApiError::conflict(DOUBLE_USERNAME_ERROR),
                Some("users_email_key") => ApiError::conflict(DOUBLE_EMAIL_ERROR),
                Some("users_username_email_key") => ApiError::Conflict(vec![
                    DOUBLE_USERNAME_ERROR.to_string(),
                    DOUBLE_EMAIL_ERROR.to_string(),
                ]),
                Some("reviews_author_title_key") => ApiError::conflict(DOUBLE_REVIEW_ERROR),
                Some("categories_slug_key") | Some("genres_slug_key") => {
                    ApiError::conflict("this slug is already in use")
                }
                _ => ApiError::conflict("uniqueness constraint violated"),
            };
        }
        if db.is_foreign_key_violation() {
            return ApiError::NotFound;
        }
    }
    ApiError::Database(e)
}

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the
/// PostgreSQL database. All invariant-bearing writes lean on the schema's
/// unique constraints so concurrent requests cannot both succeed.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetches the genre lists for a set of titles in one round trip.
    async fn load_genres(&self, title_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Genre>>, ApiError> {
        #[derive(sqlx::FromRow)]
        struct GenreLinkRow {
            title_id: Uuid,
            id: Uuid,
            name: String,
            slug: String,
        }

        if title_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, GenreLinkRow>(
            r#"
            SELECT tg.title_id, g.id, g.name, g.slug
            FROM title_genres tg
            JOIN genres g ON g.id = tg.genre_id
            WHERE tg.title_id = ANY($1)
            ORDER BY g.name
            "#,
        )
        .bind(title_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut map: HashMap<Uuid, Vec<Genre>> = HashMap::new();
        for row in rows {
            map.entry(row.title_id).or_default().push(Genre {
                id: row.id,
                fields: crate::models::TermFields {
                    name: row.name,
                    slug: row.slug,
                },
            });
        }
        Ok(map)
    }

    /// Resolves a category slug to its id, failing validation for an
    /// unknown slug (mirrors slug-related input semantics).
    async fn resolve_category(&self, slug: &str) -> Result<Uuid, ApiError> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::validation(format!("unknown category slug: {slug}")))
    }

    /// Resolves genre slugs to ids, failing validation when any is unknown.
    async fn resolve_genres(&self, slugs: &[String]) -> Result<Vec<Uuid>, ApiError> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }

        #[derive(sqlx::FromRow)]
        struct SlugRow {
            id: Uuid,
            slug: String,
        }

        let rows = sqlx::query_as::<_, SlugRow>("SELECT id, slug FROM genres WHERE slug = ANY($1)")
            .bind(slugs)
            .fetch_all(&self.pool)
            .await?;

        let found: HashMap<&str, Uuid> = rows.iter().map(|r| (r.slug.as_str(), r.id)).collect();
        let mut ids = Vec::with_capacity(slugs.len());
        for slug in slugs {
            match found.get(slug.as_str()) {
                Some(id) => ids.push(*id),
                None => {
                    return Err(ApiError::validation(format!("unknown genre slug: {slug}")));
                }
            }
        }
        Ok(ids)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- Users & signup ---

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_pair(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND email = $2"
        ))
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// The insert is the atomic authority for the get-or-create: two
    /// concurrent signups for the same pair race on the unique constraints
    /// and exactly one wins.
    async fn create_user(&self, user: User) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, email, first_name, last_name, bio, role, is_staff, confirmation_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.bio)
        .bind(user.role)
        .bind(user.is_staff)
        .bind(user.confirmation_code)
        .fetch_one(&self.pool)
        .await
        .map_err(map_constraint)
    }

    async fn set_confirmation_code(&self, user_id: Uuid, code: i32) -> Result<(), ApiError> {
        sqlx::query("UPDATE users SET confirmation_code = $2 WHERE id = $1")
            .bind(user_id)
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_users(&self, search: Option<&str>) -> Result<Vec<User>, ApiError> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE true"));
        if let Some(term) = search {
            builder.push(" AND username ILIKE ");
            builder.push_bind(format!("%{term}%"));
        }
        builder.push(" ORDER BY username");

        let users = builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn update_user(
        &self,
        username: &str,
        patch: UserPatch,
    ) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                bio = COALESCE($5, bio),
                role = COALESCE($6, role)
            WHERE username = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(patch.email)
        .bind(patch.first_name)
        .bind(patch.last_name)
        .bind(patch.bio)
        .bind(patch.role)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_constraint)
    }

    async fn delete_user(&self, username: &str) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Taxonomy ---

    async fn list_categories(&self, search: Option<&str>) -> Result<Vec<Category>, ApiError> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT id, name, slug FROM categories WHERE true");
        if let Some(term) = search {
            builder.push(" AND name ILIKE ");
            builder.push_bind(format!("%{term}%"));
        }
        builder.push(" ORDER BY name");

        let categories = builder
            .build_query_as::<Category>()
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    async fn create_category(&self, req: TermRequest) -> Result<Category, ApiError> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (id, name, slug) VALUES ($1, $2, $3) RETURNING id, name, slug",
        )
        .bind(Uuid::new_v4())
        .bind(&req.name)
        .bind(&req.slug)
        .fetch_one(&self.pool)
        .await
        .map_err(map_constraint)
    }

    /// Titles referencing the category are detached (SET NULL), never
    /// deleted.
    async fn delete_category(&self, slug: &str) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM categories WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_genres(&self, search: Option<&str>) -> Result<Vec<Genre>, ApiError> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT id, name, slug FROM genres WHERE true");
        if let Some(term) = search {
            builder.push(" AND name ILIKE ");
            builder.push_bind(format!("%{term}%"));
        }
        builder.push(" ORDER BY name");

        let genres = builder
            .build_query_as::<Genre>()
            .fetch_all(&self.pool)
            .await?;
        Ok(genres)
    }

    async fn create_genre(&self, req: TermRequest) -> Result<Genre, ApiError> {
        sqlx::query_as::<_, Genre>(
            "INSERT INTO genres (id, name, slug) VALUES ($1, $2, $3) RETURNING id, name, slug",
        )
        .bind(Uuid::new_v4())
        .bind(&req.name)
        .bind(&req.slug)
        .fetch_one(&self.pool)
        .await
        .map_err(map_constraint)
    }

    async fn delete_genre(&self, slug: &str) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM genres WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Titles ---

    /// Flexible filtering with QueryBuilder for safe parameterization.
    /// Genre slugs combine with OR among themselves (ANY) and AND with the
    /// other predicates.
    async fn list_titles(&self, filter: &TitleFilter) -> Result<Vec<Title>, ApiError> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(TITLE_SELECT);
        builder.push(" WHERE true");

        if let Some(name) = &filter.name {
            builder.push(" AND t.name ILIKE ");
            builder.push_bind(format!("%{name}%"));
        }
        if let Some(category) = &filter.category {
            builder.push(" AND c.slug = ");
            builder.push_bind(category.clone());
        }
        if !filter.genre.is_empty() {
            builder.push(
                " AND EXISTS (SELECT 1 FROM title_genres tg JOIN genres g ON g.id = tg.genre_id \
                 WHERE tg.title_id = t.id AND g.slug = ANY(",
            );
            builder.push_bind(filter.genre.clone());
            builder.push("))");
        }
        if let Some(year) = filter.year {
            builder.push(" AND t.year = ");
            builder.push_bind(year);
        }

        builder.push(" GROUP BY t.id, c.id ORDER BY t.name");

        let rows = builder
            .build_query_as::<TitleRow>()
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut genres = self.load_genres(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let genre = genres.remove(&row.id).unwrap_or_default();
                row.into_title(genre)
            })
            .collect())
    }

    async fn get_title(&self, id: Uuid) -> Result<Option<Title>, ApiError> {
        let row = sqlx::query_as::<_, TitleRow>(&format!(
            "{TITLE_SELECT} WHERE t.id = $1 GROUP BY t.id, c.id"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let mut genres = self.load_genres(&[row.id]).await?;
                let genre = genres.remove(&row.id).unwrap_or_default();
                Ok(Some(row.into_title(genre)))
            }
            None => Ok(None),
        }
    }

    async fn create_title(&self, req: CreateTitleRequest) -> Result<Title, ApiError> {
        let category_id = match &req.category {
            Some(slug) => Some(self.resolve_category(slug).await?),
            None => None,
        };
        let genre_ids = self.resolve_genres(&req.genre).await?;

        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO titles (id, name, description, year, category_id) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.year)
        .bind(category_id)
        .execute(&mut *tx)
        .await?;

        for genre_id in genre_ids {
            sqlx::query("INSERT INTO title_genres (title_id, genre_id) VALUES ($1, $2)")
                .bind(id)
                .bind(genre_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        self.get_title(id).await?.ok_or(ApiError::NotFound)
    }

    async fn update_title(
        &self,
        id: Uuid,
        req: UpdateTitleRequest,
    ) -> Result<Option<Title>, ApiError> {
        let category_id = match &req.category {
            Some(slug) => Some(self.resolve_category(slug).await?),
            None => None,
        };
        let genre_ids = match &req.genre {
            Some(slugs) => Some(self.resolve_genres(slugs).await?),
            None => None,
        };

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE titles
            SET name = COALESCE($2, name),
                year = COALESCE($3, year),
                description = COALESCE($4, description),
                category_id = COALESCE($5, category_id)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(req.name)
        .bind(req.year)
        .bind(req.description)
        .bind(category_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        // A present genre list replaces the set wholesale.
        if let Some(genre_ids) = genre_ids {
            sqlx::query("DELETE FROM title_genres WHERE title_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for genre_id in genre_ids {
                sqlx::query("INSERT INTO title_genres (title_id, genre_id) VALUES ($1, $2)")
                    .bind(id)
                    .bind(genre_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;

        self.get_title(id).await
    }

    async fn delete_title(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM titles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Reviews ---

    async fn list_reviews(&self, title_id: Uuid) -> Result<Vec<Review>, ApiError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "{REVIEW_SELECT} WHERE r.title_id = $1 ORDER BY r.pub_date DESC"
        ))
        .bind(title_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    /// Scoped by both ids: a review id under the wrong title resolves to
    /// absence, indistinguishable from a missing review.
    async fn get_review(
        &self,
        title_id: Uuid,
        review_id: Uuid,
    ) -> Result<Option<Review>, ApiError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "{REVIEW_SELECT} WHERE r.id = $1 AND r.title_id = $2"
        ))
        .bind(review_id)
        .bind(title_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(review)
    }

    /// Insert-then-join CTE so the response carries the author's username in
    /// one round trip. The unique (author, title) constraint backs the
    /// duplicate check under concurrency.
    async fn create_review(
        &self,
        title_id: Uuid,
        author_id: Uuid,
        text: String,
        score: i32,
    ) -> Result<Review, ApiError> {
        sqlx::query_as::<_, Review>(
            r#"
            WITH inserted AS (
                INSERT INTO reviews (id, title_id, author_id, text, score)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, title_id, author_id, text, score, pub_date
            )
            SELECT i.id, i.title_id, i.author_id, u.username AS author, i.text, i.pub_date, i.score
            FROM inserted i
            JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title_id)
        .bind(author_id)
        .bind(text)
        .bind(score)
        .fetch_one(&self.pool)
        .await
        .map_err(map_constraint)
    }

    async fn update_review(
        &self,
        review_id: Uuid,
        text: Option<String>,
        score: Option<i32>,
    ) -> Result<Option<Review>, ApiError> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            WITH updated AS (
                UPDATE reviews
                SET text = COALESCE($2, text),
                    score = COALESCE($3, score)
                WHERE id = $1
                RETURNING id, title_id, author_id, text, score, pub_date
            )
            SELECT i.id, i.title_id, i.author_id, u.username AS author, i.text, i.pub_date, i.score
            FROM updated i
            JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(review_id)
        .bind(text)
        .bind(score)
        .fetch_optional(&self.pool)
        .await?;
        Ok(review)
    }

    /// Cascades to the review's comments via the schema.
    async fn delete_review(&self, review_id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Comments ---

    async fn list_comments(&self, review_id: Uuid) -> Result<Vec<Comment>, ApiError> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE c.review_id = $1 ORDER BY c.pub_date DESC"
        ))
        .bind(review_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn get_comment(
        &self,
        review_id: Uuid,
        comment_id: Uuid,
    ) -> Result<Option<Comment>, ApiError> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE c.id = $1 AND c.review_id = $2"
        ))
        .bind(comment_id)
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn create_comment(
        &self,
        review_id: Uuid,
        author_id: Uuid,
        text: String,
    ) -> Result<Comment, ApiError> {
        sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (id, review_id, author_id, text)
                VALUES ($1, $2, $3, $4)
                RETURNING id, review_id, author_id, text, pub_date
            )
            SELECT i.id, i.review_id, i.author_id, u.username AS author, i.text, i.pub_date
            FROM inserted i
            JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(review_id)
        .bind(author_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await
        .map_err(map_constraint)
    }

    async fn update_comment(
        &self,
        comment_id: Uuid,
        text: String,
    ) -> Result<Option<Comment>, ApiError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            WITH updated AS (
                UPDATE comments SET text = $2 WHERE id = $1
                RETURNING id, review_id, author_id, text, pub_date
            )
            SELECT i.id, i.review_id, i.author_id, u.username AS author, i.text, i.pub_date
            FROM updated i
            JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(comment_id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
