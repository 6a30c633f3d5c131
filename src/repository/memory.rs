use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use uuid::Uuid;

use crate::constants::{DOUBLE_EMAIL_ERROR, DOUBLE_REVIEW_ERROR, DOUBLE_USERNAME_ERROR};
use crate::errors::ApiError;
use crate::filters::TitleFilter;
use crate::models::{
    Category, Comment, CreateTitleRequest, Genre, PostFields, Review, TermFields, TermRequest,
    Title, UpdateTitleRequest, User, UserPatch,
};

use super::Repository;

#[derive(Debug, Clone)]
struct StoredTitle {
    id: Uuid,
    name: String,
    description: Option<String>,
    year: i32,
    category_id: Option<Uuid>,
    genre_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
struct StoredReview {
    id: Uuid,
    title_id: Uuid,
    author_id: Uuid,
    text: String,
    score: i32,
    pub_date: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredComment {
    id: Uuid,
    review_id: Uuid,
    author_id: Uuid,
    text: String,
    pub_date: chrono::DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    users: Vec<User>,
    categories: Vec<Category>,
    genres: Vec<Genre>,
    titles: Vec<StoredTitle>,
    reviews: Vec<StoredReview>,
    comments: Vec<StoredComment>,
}

/// MemoryRepository
///
/// In-memory implementation of the `Repository` trait used by the test
/// suite (and handy for local experiments). It mirrors the storage
/// semantics the Postgres schema provides: uniqueness conflicts, cascade
/// deletes, SET NULL on category removal, and read-time rating
/// aggregation.
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<Inner>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl Inner {
    fn username_of(&self, author_id: Uuid) -> String {
        self.users
            .iter()
            .find(|u| u.id == author_id)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }

    fn review_model(&self, stored: &StoredReview) -> Review {
        Review {
            id: stored.id,
            title_id: stored.title_id,
            author_id: stored.author_id,
            post: PostFields {
                author: self.username_of(stored.author_id),
                text: stored.text.clone(),
                pub_date: stored.pub_date,
            },
            score: stored.score,
        }
    }

    fn comment_model(&self, stored: &StoredComment) -> Comment {
        Comment {
            id: stored.id,
            review_id: stored.review_id,
            author_id: stored.author_id,
            post: PostFields {
                author: self.username_of(stored.author_id),
                text: stored.text.clone(),
                pub_date: stored.pub_date,
            },
        }
    }

    fn title_model(&self, stored: &StoredTitle) -> Title {
        let scores: Vec<i32> = self
            .reviews
            .iter()
            .filter(|r| r.title_id == stored.id)
            .map(|r| r.score)
            .collect();
        let rating = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<i32>() as f64 / scores.len() as f64)
        };

        let mut genre: Vec<Genre> = self
            .genres
            .iter()
            .filter(|g| stored.genre_ids.contains(&g.id))
            .cloned()
            .collect();
        genre.sort_by(|a, b| a.fields.name.cmp(&b.fields.name));

        let category = stored
            .category_id
            .and_then(|id| self.categories.iter().find(|c| c.id == id).cloned());

        Title {
            id: stored.id,
            name: stored.name.clone(),
            year: stored.year,
            rating,
            description: stored.description.clone(),
            genre,
            category,
        }
    }

    fn resolve_category(&self, slug: &str) -> Result<Uuid, ApiError> {
        self.categories
            .iter()
            .find(|c| c.fields.slug == slug)
            .map(|c| c.id)
            .ok_or_else(|| ApiError::validation(format!("unknown category slug: {slug}")))
    }

    fn resolve_genres(&self, slugs: &[String]) -> Result<Vec<Uuid>, ApiError> {
        slugs
            .iter()
            .map(|slug| {
                self.genres
                    .iter()
                    .find(|g| &g.fields.slug == slug)
                    .map(|g| g.id)
                    .ok_or_else(|| ApiError::validation(format!("unknown genre slug: {slug}")))
            })
            .collect()
    }

    /// Cascade removal of a set of reviews and their comments.
    fn drop_reviews<F: Fn(&StoredReview) -> bool>(&mut self, predicate: F) {
        let doomed: Vec<Uuid> = self
            .reviews
            .iter()
            .filter(|r| predicate(r))
            .map(|r| r.id)
            .collect();
        self.reviews.retain(|r| !doomed.contains(&r.id));
        self.comments.retain(|c| !doomed.contains(&c.review_id));
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    // --- Users & signup ---

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ApiError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_pair(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, ApiError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        Ok(inner
            .users
            .iter()
            .find(|u| u.username == username && u.email == email)
            .cloned())
    }

    async fn create_user(&self, user: User) -> Result<User, ApiError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        let mut conflicts = Vec::new();
        if inner.users.iter().any(|u| u.username == user.username) {
            conflicts.push(DOUBLE_USERNAME_ERROR.to_string());
        }
        if inner.users.iter().any(|u| u.email == user.email) {
            conflicts.push(DOUBLE_EMAIL_ERROR.to_string());
        }
        if !conflicts.is_empty() {
            return Err(ApiError::Conflict(conflicts));
        }
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn set_confirmation_code(&self, user_id: Uuid, code: i32) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == user_id) {
            user.confirmation_code = Some(code);
        }
        Ok(())
    }

    async fn list_users(&self, search: Option<&str>) -> Result<Vec<User>, ApiError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        let mut users: Vec<User> = inner
            .users
            .iter()
            .filter(|u| search.is_none_or(|term| contains_ci(&u.username, term)))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn update_user(
        &self,
        username: &str,
        patch: UserPatch,
    ) -> Result<Option<User>, ApiError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        if let Some(email) = &patch.email {
            if inner
                .users
                .iter()
                .any(|u| u.username != username && &u.email == email)
            {
                return Err(ApiError::conflict(DOUBLE_EMAIL_ERROR));
            }
        }
        let Some(user) = inner.users.iter_mut().find(|u| u.username == username) else {
            return Ok(None);
        };
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(first_name) = patch.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            user.last_name = last_name;
        }
        if let Some(bio) = patch.bio {
            user.bio = bio;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, username: &str) -> Result<bool, ApiError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        let Some(user_id) = inner
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.id)
        else {
            return Ok(false);
        };
        inner.users.retain(|u| u.id != user_id);
        // Cascade: the user's reviews (and their comments), then the user's
        // own comments elsewhere.
        inner.drop_reviews(|r| r.author_id == user_id);
        inner.comments.retain(|c| c.author_id != user_id);
        Ok(true)
    }

    // --- Taxonomy ---

    async fn list_categories(&self, search: Option<&str>) -> Result<Vec<Category>, ApiError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        let mut categories: Vec<Category> = inner
            .categories
            .iter()
            .filter(|c| search.is_none_or(|term| contains_ci(&c.fields.name, term)))
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.fields.name.cmp(&b.fields.name));
        Ok(categories)
    }

    async fn create_category(&self, req: TermRequest) -> Result<Category, ApiError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        if inner.categories.iter().any(|c| c.fields.slug == req.slug) {
            return Err(ApiError::conflict("this slug is already in use"));
        }
        let category = Category {
            id: Uuid::new_v4(),
            fields: TermFields {
                name: req.name,
                slug: req.slug,
            },
        };
        inner.categories.push(category.clone());
        Ok(category)
    }

    async fn delete_category(&self, slug: &str) -> Result<bool, ApiError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        let Some(id) = inner
            .categories
            .iter()
            .find(|c| c.fields.slug == slug)
            .map(|c| c.id)
        else {
            return Ok(false);
        };
        inner.categories.retain(|c| c.id != id);
        // SET NULL semantics: titles are detached, never deleted.
        for title in &mut inner.titles {
            if title.category_id == Some(id) {
                title.category_id = None;
            }
        }
        Ok(true)
    }

    async fn list_genres(&self, search: Option<&str>) -> Result<Vec<Genre>, ApiError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        let mut genres: Vec<Genre> = inner
            .genres
            .iter()
            .filter(|g| search.is_none_or(|term| contains_ci(&g.fields.name, term)))
            .cloned()
            .collect();
        genres.sort_by(|a, b| a.fields.name.cmp(&b.fields.name));
        Ok(genres)
    }

    async fn create_genre(&self, req: TermRequest) -> Result<Genre, ApiError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        if inner.genres.iter().any(|g| g.fields.slug == req.slug) {
            return Err(ApiError::conflict("this slug is already in use"));
        }
        let genre = Genre {
            id: Uuid::new_v4(),
            fields: TermFields {
                name: req.name,
                slug: req.slug,
            },
        };
        inner.genres.push(genre.clone());
        Ok(genre)
    }

    async fn delete_genre(&self, slug: &str) -> Result<bool, ApiError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        let Some(id) = inner
            .genres
            .iter()
            .find(|g| g.fields.slug == slug)
            .map(|g| g.id)
        else {
            return Ok(false);
        };
        inner.genres.retain(|g| g.id != id);
        for title in &mut inner.titles {
            title.genre_ids.retain(|gid| *gid != id);
        }
        Ok(true)
    }

    // --- Titles ---

    async fn list_titles(&self, filter: &TitleFilter) -> Result<Vec<Title>, ApiError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        let mut titles: Vec<Title> = inner
            .titles
            .iter()
            .filter(|t| {
                filter
                    .name
                    .as_deref()
                    .is_none_or(|name| contains_ci(&t.name, name))
            })
            .filter(|t| {
                filter.category.as_deref().is_none_or(|slug| {
                    t.category_id.is_some_and(|id| {
                        inner
                            .categories
                            .iter()
                            .any(|c| c.id == id && c.fields.slug == slug)
                    })
                })
            })
            .filter(|t| {
                filter.genre.is_empty()
                    || inner.genres.iter().any(|g| {
                        t.genre_ids.contains(&g.id) && filter.genre.contains(&g.fields.slug)
                    })
            })
            .filter(|t| filter.year.is_none_or(|year| t.year == year))
            .map(|t| inner.title_model(t))
            .collect();
        titles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(titles)
    }

    async fn get_title(&self, id: Uuid) -> Result<Option<Title>, ApiError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        Ok(inner
            .titles
            .iter()
            .find(|t| t.id == id)
            .map(|t| inner.title_model(t)))
    }

    async fn create_title(&self, req: CreateTitleRequest) -> Result<Title, ApiError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        let category_id = match &req.category {
            Some(slug) => Some(inner.resolve_category(slug)?),
            None => None,
        };
        let genre_ids = inner.resolve_genres(&req.genre)?;
        let stored = StoredTitle {
            id: Uuid::new_v4(),
            name: req.name,
            description: req.description,
            year: req.year,
            category_id,
            genre_ids,
        };
        let title = {
            inner.titles.push(stored.clone());
            inner.title_model(&stored)
        };
        Ok(title)
    }

    async fn update_title(
        &self,
        id: Uuid,
        req: UpdateTitleRequest,
    ) -> Result<Option<Title>, ApiError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        let category_id = match &req.category {
            Some(slug) => Some(inner.resolve_category(slug)?),
            None => None,
        };
        let genre_ids = match &req.genre {
            Some(slugs) => Some(inner.resolve_genres(slugs)?),
            None => None,
        };
        let Some(idx) = inner.titles.iter().position(|t| t.id == id) else {
            return Ok(None);
        };
        {
            let title = &mut inner.titles[idx];
            if let Some(name) = req.name {
                title.name = name;
            }
            if let Some(year) = req.year {
                title.year = year;
            }
            if let Some(description) = req.description {
                title.description = Some(description);
            }
            if let Some(category_id) = category_id {
                title.category_id = Some(category_id);
            }
            if let Some(genre_ids) = genre_ids {
                title.genre_ids = genre_ids;
            }
        }
        let stored = inner.titles[idx].clone();
        Ok(Some(inner.title_model(&stored)))
    }

    async fn delete_title(&self, id: Uuid) -> Result<bool, ApiError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        if !inner.titles.iter().any(|t| t.id == id) {
            return Ok(false);
        }
        inner.titles.retain(|t| t.id != id);
        inner.drop_reviews(|r| r.title_id == id);
        Ok(true)
    }

    // --- Reviews ---

    async fn list_reviews(&self, title_id: Uuid) -> Result<Vec<Review>, ApiError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        let mut reviews: Vec<Review> = inner
            .reviews
            .iter()
            .filter(|r| r.title_id == title_id)
            .map(|r| inner.review_model(r))
            .collect();
        reviews.sort_by(|a, b| b.post.pub_date.cmp(&a.post.pub_date));
        Ok(reviews)
    }

    async fn get_review(
        &self,
        title_id: Uuid,
        review_id: Uuid,
    ) -> Result<Option<Review>, ApiError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        Ok(inner
            .reviews
            .iter()
            .find(|r| r.id == review_id && r.title_id == title_id)
            .map(|r| inner.review_model(r)))
    }

    async fn create_review(
        &self,
        title_id: Uuid,
        author_id: Uuid,
        text: String,
        score: i32,
    ) -> Result<Review, ApiError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        if inner
            .reviews
            .iter()
            .any(|r| r.title_id == title_id && r.author_id == author_id)
        {
            return Err(ApiError::conflict(DOUBLE_REVIEW_ERROR));
        }
        let stored = StoredReview {
            id: Uuid::new_v4(),
            title_id,
            author_id,
            text,
            score,
            pub_date: Utc::now(),
        };
        inner.reviews.push(stored.clone());
        Ok(inner.review_model(&stored))
    }

    async fn update_review(
        &self,
        review_id: Uuid,
        text: Option<String>,
        score: Option<i32>,
    ) -> Result<Option<Review>, ApiError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        let Some(idx) = inner.reviews.iter().position(|r| r.id == review_id) else {
            return Ok(None);
        };
        {
            let review = &mut inner.reviews[idx];
            if let Some(text) = text {
                review.text = text;
            }
            if let Some(score) = score {
                review.score = score;
            }
        }
        let stored = inner.reviews[idx].clone();
        Ok(Some(inner.review_model(&stored)))
    }

    async fn delete_review(&self, review_id: Uuid) -> Result<bool, ApiError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        if !inner.reviews.iter().any(|r| r.id == review_id) {
            return Ok(false);
        }
        inner.drop_reviews(|r| r.id == review_id);
        Ok(true)
    }

    // --- Comments ---

    async fn list_comments(&self, review_id: Uuid) -> Result<Vec<Comment>, ApiError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        let mut comments: Vec<Comment> = inner
            .comments
            .iter()
            .filter(|c| c.review_id == review_id)
            .map(|c| inner.comment_model(c))
            .collect();
        comments.sort_by(|a, b| b.post.pub_date.cmp(&a.post.pub_date));
        Ok(comments)
    }

    async fn get_comment(
        &self,
        review_id: Uuid,
        comment_id: Uuid,
    ) -> Result<Option<Comment>, ApiError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        Ok(inner
            .comments
            .iter()
            .find(|c| c.id == comment_id && c.review_id == review_id)
            .map(|c| inner.comment_model(c)))
    }

    async fn create_comment(
        &self,
        review_id: Uuid,
        author_id: Uuid,
        text: String,
    ) -> Result<Comment, ApiError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        if !inner.reviews.iter().any(|r| r.id == review_id) {
            return Err(ApiError::NotFound);
        }
        let stored = StoredComment {
            id: Uuid::new_v4(),
            review_id,
            author_id,
            text,
            pub_date: Utc::now(),
        };
        inner.comments.push(stored.clone());
        Ok(inner.comment_model(&stored))
    }

    async fn update_comment(
        &self,
        comment_id: Uuid,
        text: String,
    ) -> Result<Option<Comment>, ApiError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        let Some(idx) = inner.comments.iter().position(|c| c.id == comment_id) else {
            return Ok(None);
        };
        inner.comments[idx].text = text;
        let stored = inner.comments[idx].clone();
        Ok(Some(inner.comment_model(&stored)))
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool, ApiError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        let before = inner.comments.len();
        inner.comments.retain(|c| c.id != comment_id);
        Ok(inner.comments.len() < before)
    }
}
