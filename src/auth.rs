use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    errors::ApiError,
    models::{Role, User},
    repository::RepositoryState,
};

/// Validity window of an issued token, in seconds.
const TOKEN_TTL_SECS: i64 = 60 * 60 * 24;

/// Claims
///
/// The payload of a minted bearer token. The claims are a capability
/// snapshot taken at issuance: `role` and `staff` are embedded as they were
/// when the confirmation code was exchanged, so a later role change neither
/// revokes nor upgrades tokens already in flight within their validity
/// window.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's UUID.
    pub sub: Uuid,
    /// Username at issuance; also used for the existence re-check.
    pub username: String,
    /// Role at issuance.
    pub role: Role,
    /// Staff elevation flag at issuance.
    pub staff: bool,
    /// Expiration time (unix seconds).
    pub exp: usize,
    /// Issued-at time (unix seconds).
    pub iat: usize,
}

/// Mints a signed bearer token for a verified identity.
pub fn issue_token(user: &User, secret: &str) -> Result<String, ApiError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role,
        staff: user.is_staff,
        exp: (now + TOKEN_TTL_SECS) as usize,
        iat: now as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("token signing failed: {e}");
        ApiError::Unauthorized
    })
}

/// AuthUser
///
/// The resolved identity of an authenticated request, carried into handlers
/// and into the access-control engine. Fields come from the token claims
/// (capability snapshot), with a storage lookup only confirming the account
/// still exists.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub is_staff: bool,
}

impl AuthUser {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username.clone(),
            role: claims.role,
            is_staff: claims.staff,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's FromRequestParts, making AuthUser usable as a handler
/// argument on every authenticated route. The flow:
/// 1. Dependency resolution: Repository and AppConfig from the app state.
/// 2. Local bypass: in `Env::Local` only, an `x-debug-username` header
///    resolves directly against storage to speed up development.
/// 3. Bearer extraction and JWT decoding (expiry always validated).
/// 4. Existence re-check: a token for a since-deleted account is rejected.
///
/// Rejection: 401 on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // Local development bypass, guarded by the Env check.
        if config.env == Env::Local {
            if let Some(value) = parts.headers.get("x-debug-username") {
                if let Ok(username) = value.to_str() {
                    if let Ok(Some(user)) = repo.find_user_by_username(username).await {
                        return Ok(AuthUser {
                            id: user.id,
                            username: user.username,
                            role: user.role,
                            is_staff: user.is_staff,
                        });
                    }
                }
            }
        }

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|_| StatusCode::UNAUTHORIZED)?;

        // The claims stay authoritative for role/staff; storage only confirms
        // the account was not deleted after issuance.
        let exists = repo
            .find_user_by_username(&token_data.claims.username)
            .await
            .map_err(|_| StatusCode::UNAUTHORIZED)?
            .is_some();
        if !exists {
            return Err(StatusCode::UNAUTHORIZED);
        }

        Ok(AuthUser::from_claims(&token_data.claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "a@x.com".into(),
            role: Role::Moderator,
            is_staff: false,
            ..Default::default()
        }
    }

    #[test]
    fn issued_token_round_trips_claims() {
        let user = sample_user();
        let token = issue_token(&user, "test-secret").unwrap();

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(data.claims.sub, user.id);
        assert_eq!(data.claims.username, "alice");
        assert_eq!(data.claims.role, Role::Moderator);
        assert!(!data.claims.staff);
        assert!(data.claims.exp > data.claims.iat);
    }

    #[test]
    fn token_rejected_with_wrong_secret() {
        let user = sample_user();
        let token = issue_token(&user, "right-secret").unwrap();
        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"wrong-secret"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn claims_snapshot_survives_role_change() {
        // A token minted before a role change keeps its issuance-time role.
        let mut user = sample_user();
        let token = issue_token(&user, "test-secret").unwrap();
        user.role = Role::Admin;

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.role, Role::Moderator);
    }
}
