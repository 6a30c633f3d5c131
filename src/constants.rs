//! Process-wide constants: field limits, the confirmation-code range, and the
//! canonical error message strings surfaced to API clients. Immutable for the
//! lifetime of the process; no other module defines user-facing text.

/// Maximum accepted length for a username.
pub const USERNAME_MAX_LEN: usize = 150;
/// Maximum accepted length for an email address.
pub const EMAIL_MAX_LEN: usize = 254;
/// Maximum accepted length for a taxonomy display name.
pub const TERM_NAME_MAX_LEN: usize = 256;
/// Maximum accepted length for a taxonomy slug.
pub const TERM_SLUG_MAX_LEN: usize = 50;

/// Username reserved for the current-user alias route (`/users/me`).
pub const RESERVED_USERNAME: &str = "me";

/// Inclusive bounds of the emailed confirmation code.
pub const CODE_MIN: i32 = 1111;
pub const CODE_MAX: i32 = 9999;

/// Inclusive bounds of a review score.
pub const SCORE_MIN: i32 = 1;
pub const SCORE_MAX: i32 = 10;

// --- Client-facing messages ---

pub const USERNAME_ME_ERROR: &str = "username 'me' is reserved";
pub const INVALID_CHARACTER_ERROR: &str =
    "username may only contain letters, digits and @/./+/-/_";
pub const USERNAME_TOO_LONG_ERROR: &str = "username must be at most 150 characters";
pub const EMAIL_TOO_LONG_ERROR: &str = "email must be at most 254 characters";
pub const DOUBLE_REVIEW_ERROR: &str = "a review for this title already exists";
pub const DOUBLE_USERNAME_ERROR: &str = "this username is already in use with another email";
pub const DOUBLE_EMAIL_ERROR: &str = "this email is already in use with another username";
pub const SCORE_ERROR: &str = "score must be an integer between 1 and 10";
pub const YEAR_IN_FUTURE_ERROR: &str = "year may not be later than the current year";
pub const CODE_MISMATCH_ERROR: &str = "invalid confirmation code";
pub const CONFIRMATION_SUBJECT: &str = "Confirmation code";
