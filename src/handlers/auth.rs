use axum::{Json, extract::State};
use rand::Rng;
use uuid::Uuid;

use crate::{
    AppState,
    auth::issue_token,
    constants::{
        CODE_MAX, CODE_MIN, CODE_MISMATCH_ERROR, CONFIRMATION_SUBJECT, DOUBLE_EMAIL_ERROR,
        DOUBLE_USERNAME_ERROR,
    },
    errors::ApiError,
    models::{SignupRequest, TokenRequest, TokenResponse, User},
    validation::{validate_email, validate_username},
};

/// signup
///
/// [Public Route] Registers a (username, email) pair and emails a fresh
/// confirmation code.
///
/// *Idempotency*: repeating the exact pair is not an error; the account is
/// reused and a new code is issued, replacing the previous one. Only a
/// partial collision (one half of the pair already bound to a different
/// record) is rejected.
///
/// *Ordering*: the code is persisted before the email is handed to the
/// relay, so a delivery failure (502) leaves a valid code behind.
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Code issued and emailed", body = SignupRequest),
        (status = 400, description = "Validation or pairing conflict"),
        (status = 502, description = "Email delivery failed")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<SignupRequest>, ApiError> {
    validate_username(&payload.username)?;
    validate_email(&payload.email)?;

    let user = match state
        .repo
        .find_user_by_pair(&payload.username, &payload.email)
        .await?
    {
        // Exact pair already registered: re-issue, never conflict.
        Some(existing) => existing,
        None => {
            let user = User {
                id: Uuid::new_v4(),
                username: payload.username.clone(),
                email: payload.email.clone(),
                ..Default::default()
            };
            match state.repo.create_user(user).await {
                Ok(created) => created,
                Err(ApiError::Conflict(_)) => {
                    // Partial collision: the pair as a whole is wrong, so both
                    // halves are reported rather than leaking which one is taken.
                    return Err(ApiError::Conflict(vec![
                        DOUBLE_USERNAME_ERROR.to_string(),
                        DOUBLE_EMAIL_ERROR.to_string(),
                    ]));
                }
                Err(e) => return Err(e),
            }
        }
    };

    let code = rand::thread_rng().gen_range(CODE_MIN..=CODE_MAX);
    state.repo.set_confirmation_code(user.id, code).await?;

    let body = format!("{code} - your confirmation code");
    state
        .mailer
        .send(CONFIRMATION_SUBJECT, &body, &payload.email)
        .await?;

    // The response echoes the accepted pair; the code travels only by email.
    Ok(Json(payload))
}

/// token
///
/// [Public Route] Exchanges an emailed confirmation code for a signed bearer
/// token.
///
/// *Contract*: an unknown username is 404 (the identity does not exist);
/// a wrong code for a known username is a 400 with a uniform message,
/// revealing nothing about the expected value.
#[utoipa::path(
    post,
    path = "/auth/token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token minted", body = TokenResponse),
        (status = 400, description = "Code mismatch"),
        (status = 404, description = "Unknown username")
    )
)]
pub async fn token(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .repo
        .find_user_by_username(&payload.username)
        .await?
        .ok_or(ApiError::NotFound)?;

    // Exact equality against the stored code; a missing stored code can
    // never match.
    if user.confirmation_code != Some(payload.confirmation_code) {
        return Err(ApiError::validation(CODE_MISMATCH_ERROR));
    }

    let token = issue_token(&user, &state.config.jwt_secret)?;
    Ok(Json(TokenResponse { token }))
}
