//! Pure field validation shared by the request payload types.
//!
//! Each payload calls these free functions directly; there is no shared base
//! type. All messages come from [`crate::constants`].

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{
    CODE_MAX, CODE_MIN, EMAIL_MAX_LEN, INVALID_CHARACTER_ERROR, RESERVED_USERNAME, SCORE_ERROR,
    SCORE_MAX, SCORE_MIN, TERM_NAME_MAX_LEN, TERM_SLUG_MAX_LEN, USERNAME_MAX_LEN,
    USERNAME_ME_ERROR, USERNAME_TOO_LONG_ERROR, EMAIL_TOO_LONG_ERROR, YEAR_IN_FUTURE_ERROR,
};
use crate::errors::ApiError;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username regex"));

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug regex"));

/// Validates a username against the pattern, length and reserved-word rules.
///
/// Rejects the reserved value `me` (it collides with the current-user alias
/// route), anything longer than 150 characters, and any character outside
/// `[\w.@+-]`.
pub fn validate_username(value: &str) -> Result<(), ApiError> {
    if value == RESERVED_USERNAME {
        return Err(ApiError::validation(USERNAME_ME_ERROR));
    }
    if value.chars().count() > USERNAME_MAX_LEN {
        return Err(ApiError::validation(USERNAME_TOO_LONG_ERROR));
    }
    if !USERNAME_RE.is_match(value) {
        return Err(ApiError::validation(INVALID_CHARACTER_ERROR));
    }
    Ok(())
}

/// Validates an email address length. Format checking beyond a non-empty
/// value with an `@` is left to the mailer, which will fail delivery anyway.
pub fn validate_email(value: &str) -> Result<(), ApiError> {
    if value.chars().count() > EMAIL_MAX_LEN {
        return Err(ApiError::validation(EMAIL_TOO_LONG_ERROR));
    }
    if value.is_empty() || !value.contains('@') {
        return Err(ApiError::validation("email address is not valid"));
    }
    Ok(())
}

/// Validates a review score to the inclusive [1, 10] domain.
pub fn validate_score(score: i32) -> Result<(), ApiError> {
    if !(SCORE_MIN..=SCORE_MAX).contains(&score) {
        return Err(ApiError::validation(SCORE_ERROR));
    }
    Ok(())
}

/// The current calendar year, evaluated at request time.
pub fn current_year() -> i32 {
    Utc::now().year()
}

/// Validates a title's release year against the current calendar year.
pub fn validate_year(year: i32) -> Result<(), ApiError> {
    if year > current_year() {
        return Err(ApiError::validation(YEAR_IN_FUTURE_ERROR));
    }
    Ok(())
}

/// Validates a taxonomy term (category or genre) payload: display name and
/// slug lengths plus the slug alphabet.
pub fn validate_term(name: &str, slug: &str) -> Result<(), ApiError> {
    if name.is_empty() || name.chars().count() > TERM_NAME_MAX_LEN {
        return Err(ApiError::validation(format!(
            "name must be between 1 and {TERM_NAME_MAX_LEN} characters"
        )));
    }
    if slug.chars().count() > TERM_SLUG_MAX_LEN {
        return Err(ApiError::validation(format!(
            "slug must be at most {TERM_SLUG_MAX_LEN} characters"
        )));
    }
    if !SLUG_RE.is_match(slug) {
        return Err(ApiError::validation(
            "slug may only contain letters, digits, hyphens and underscores",
        ));
    }
    Ok(())
}

/// True if the code lies in the issued range.
pub fn code_in_range(code: i32) -> bool {
    (CODE_MIN..=CODE_MAX).contains(&code)
}
