use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The RBAC role stored on every user record. Roles are a flat set with
/// explicit capability checks; there is no inheritance between them
/// (moderator is neither a superset nor a subset of admin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "moderator" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

// The `role` column is plain TEXT; route `Role` through the &str codecs so
// the runtime query API can bind and decode it directly.
impl sqlx::Type<sqlx::Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        s.parse::<Self>().map_err(Into::into)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for Role {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

/// User
///
/// The canonical identity record. `confirmation_code` holds the single
/// outstanding verification code awaiting exchange for a token; `is_staff`
/// is an elevation flag independent of `role` (either one grants the admin
/// capability). Internal fields never reach response bodies.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct User {
    #[serde(skip_serializing)]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
    #[serde(skip_serializing, default)]
    pub is_staff: bool,
    #[serde(skip_serializing, default)]
    pub confirmation_code: Option<i32>,
}

/// TermFields
///
/// The value shape shared by Category and Genre: a display name plus a
/// unique slug. Embedded by value rather than inherited.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct TermFields {
    pub name: String,
    pub slug: String,
}

/// Category
///
/// A taxonomy entry a title belongs to (at most one). Serialized without its
/// surrogate id; clients address categories by slug.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Category {
    #[serde(skip_serializing, default)]
    pub id: Uuid,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub fields: TermFields,
}

/// Genre
///
/// A taxonomy entry a title can carry many of.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Genre {
    #[serde(skip_serializing, default)]
    pub id: Uuid,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub fields: TermFields,
}

/// Title
///
/// A catalog entry as returned by the API. `rating` is derived at read time
/// (mean of review scores) and is `null` for titles without reviews — never
/// stored, never reported as zero.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct Title {
    pub id: Uuid,
    pub name: String,
    pub year: i32,
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub genre: Vec<Genre>,
    pub category: Option<Category>,
}

/// TitleRow
///
/// Flat row produced by the title queries (category joined in, rating
/// aggregated). Converted into [`Title`] once genres are stitched on.
#[derive(Debug, Clone, FromRow)]
pub struct TitleRow {
    pub id: Uuid,
    pub name: String,
    pub year: i32,
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
}

impl TitleRow {
    /// Combines the flat row with its genre list into the API shape.
    pub fn into_title(self, genre: Vec<Genre>) -> Title {
        let category = match (self.category_id, self.category_name, self.category_slug) {
            (Some(id), Some(name), Some(slug)) => Some(Category {
                id,
                fields: TermFields { name, slug },
            }),
            _ => None,
        };
        Title {
            id: self.id,
            name: self.name,
            year: self.year,
            rating: self.rating,
            description: self.description,
            genre,
            category,
        }
    }
}

/// PostFields
///
/// The value shape shared by Review and Comment: author username, body text
/// and the immutable publication timestamp. Embedded by value.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct PostFields {
    /// Author's username, joined in by the repository queries.
    pub author: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
}

/// Review
///
/// A scored review of a title. At most one per (author, title); the unique
/// constraint in storage is the authority for that invariant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Review {
    pub id: Uuid,
    #[serde(skip_serializing, default)]
    pub title_id: Uuid,
    #[serde(skip_serializing, default)]
    pub author_id: Uuid,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub post: PostFields,
    pub score: i32,
}

/// Comment
///
/// A comment on a review. Addressable only through its parent review and
/// that review's parent title.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Comment {
    pub id: Uuid,
    #[serde(skip_serializing, default)]
    pub review_id: Uuid,
    #[serde(skip_serializing, default)]
    pub author_id: Uuid,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub post: PostFields,
}

// --- Request Payloads (Input Schemas) ---

/// SignupRequest
///
/// Input for POST /auth/signup. The response echoes these two fields and
/// never includes the issued code.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
}

/// TokenRequest
///
/// Input for POST /auth/token: exchanges the emailed confirmation code for a
/// bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct TokenRequest {
    pub username: String,
    pub confirmation_code: i32,
}

/// TokenResponse
///
/// The minted bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct TokenResponse {
    pub token: String,
}

/// UpdateProfileRequest
///
/// Partial update payload for PATCH /users/me. A `role` value may be present
/// in the payload but is ignored on this path regardless of the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// CreateUserRequest
///
/// Admin-only payload for creating a user directly (no signup flow).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub role: Role,
}

/// UserPatch
///
/// Field-level patch applied by the repository with COALESCE semantics: only
/// `Some` fields touch their column. Built by both the profile and the admin
/// update handlers; the former never sets `role`.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
}

/// TermRequest
///
/// Admin payload for creating a category or genre.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct TermRequest {
    pub name: String,
    pub slug: String,
}

/// CreateTitleRequest
///
/// Admin payload for adding a title. `genre` and `category` reference
/// existing taxonomy entries by slug.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateTitleRequest {
    pub name: String,
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// UpdateTitleRequest
///
/// Partial update payload for a title. A present `genre` list replaces the
/// title's genre set wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateTitleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// CreateReviewRequest
///
/// Input for posting a review on a title.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateReviewRequest {
    pub text: String,
    pub score: i32,
}

/// UpdateReviewRequest
///
/// Partial update for an existing review. `pub_date` is immutable.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateReviewRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
}

/// CommentRequest
///
/// Input for posting or editing a comment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CommentRequest {
    pub text: String,
}
