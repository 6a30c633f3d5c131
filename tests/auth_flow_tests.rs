use axum::{Json, extract::State};
use media_catalog::{
    AppState, MemoryRepository, MockMailer,
    config::AppConfig,
    errors::ApiError,
    handlers,
    models::{SignupRequest, TokenRequest},
    repository::Repository,
    validation::code_in_range,
};
use std::sync::Arc;
use tokio::test;

// --- TEST UTILITIES ---

// Builds an AppState over the in-memory repository and the recording mailer,
// handing back the concrete components so tests can inspect them.
fn create_test_state(mailer: MockMailer) -> (AppState, Arc<MemoryRepository>, Arc<MockMailer>) {
    let repo = Arc::new(MemoryRepository::new());
    let mailer = Arc::new(mailer);
    let state = AppState {
        repo: repo.clone(),
        mailer: mailer.clone(),
        config: AppConfig::default(),
    };
    (state, repo, mailer)
}

fn signup_payload(username: &str, email: &str) -> SignupRequest {
    SignupRequest {
        username: username.to_string(),
        email: email.to_string(),
    }
}

// --- SIGNUP ---

#[test]
async fn signup_creates_account_and_emails_code() {
    let (state, repo, mailer) = create_test_state(MockMailer::new());

    let result = handlers::signup(
        State(state),
        Json(signup_payload("alice", "alice@example.com")),
    )
    .await;

    let Json(echo) = result.unwrap();
    assert_eq!(echo.username, "alice");
    assert_eq!(echo.email, "alice@example.com");

    // The code travels only by email, within its issued range.
    let code = mailer.last_code().expect("a code should be emailed");
    assert!(code_in_range(code));
    assert_eq!(mailer.sent()[0].to, "alice@example.com");

    let stored = repo
        .find_user_by_username("alice")
        .await
        .unwrap()
        .expect("account should exist");
    assert_eq!(stored.confirmation_code, Some(code));
}

#[test]
async fn repeated_signup_reissues_instead_of_conflicting() {
    let (state, repo, mailer) = create_test_state(MockMailer::new());

    for _ in 0..2 {
        let result = handlers::signup(
            State(state.clone()),
            Json(signup_payload("alice", "alice@example.com")),
        )
        .await;
        assert!(result.is_ok());
    }

    // Two emails, one account, and the stored code is the latest one sent.
    assert_eq!(mailer.sent().len(), 2);
    let users = repo.list_users(None).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].confirmation_code, mailer.last_code());
}

#[test]
async fn partial_pair_collision_reports_both_halves() {
    let (state, _repo, _mailer) = create_test_state(MockMailer::new());

    handlers::signup(
        State(state.clone()),
        Json(signup_payload("alice", "alice@example.com")),
    )
    .await
    .unwrap();

    // Same username, different email.
    let err = handlers::signup(
        State(state.clone()),
        Json(signup_payload("alice", "other@example.com")),
    )
    .await
    .unwrap_err();
    let ApiError::Conflict(messages) = err else {
        panic!("expected a conflict");
    };
    assert_eq!(messages.len(), 2);

    // Same email, different username.
    let err = handlers::signup(
        State(state),
        Json(signup_payload("bob", "alice@example.com")),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(m) if m.len() == 2));
}

#[test]
async fn signup_rejects_invalid_usernames() {
    let (state, repo, _mailer) = create_test_state(MockMailer::new());

    for username in ["me", "has space", &"a".repeat(151)] {
        let err = handlers::signup(
            State(state.clone()),
            Json(signup_payload(username, "x@example.com")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)), "{username}");
    }

    // Nothing was created along the way.
    assert!(repo.list_users(None).await.unwrap().is_empty());
}

#[test]
async fn delivery_failure_surfaces_but_keeps_the_code() {
    let (state, repo, _mailer) = create_test_state(MockMailer::new_failing());

    let err = handlers::signup(
        State(state),
        Json(signup_payload("alice", "alice@example.com")),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Delivery(_)));

    // The code was persisted before the send, so the account is not stranded.
    let stored = repo
        .find_user_by_username("alice")
        .await
        .unwrap()
        .expect("account should exist despite the failed send");
    assert!(stored.confirmation_code.is_some());
}

// --- TOKEN EXCHANGE ---

#[test]
async fn token_exchange_mints_a_decodable_token() {
    let (state, _repo, mailer) = create_test_state(MockMailer::new());

    handlers::signup(
        State(state.clone()),
        Json(signup_payload("alice", "alice@example.com")),
    )
    .await
    .unwrap();
    let code = mailer.last_code().unwrap();

    let result = handlers::token(
        State(state),
        Json(TokenRequest {
            username: "alice".to_string(),
            confirmation_code: code,
        }),
    )
    .await;

    let Json(response) = result.unwrap();
    // HS256 JWT: three dot-separated segments.
    assert_eq!(response.token.split('.').count(), 3);
}

#[test]
async fn token_for_unknown_username_is_not_found() {
    let (state, _repo, _mailer) = create_test_state(MockMailer::new());

    let err = handlers::token(
        State(state),
        Json(TokenRequest {
            username: "ghost".to_string(),
            confirmation_code: 1234,
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::NotFound));
}

#[test]
async fn wrong_code_is_a_uniform_validation_error() {
    let (state, _repo, mailer) = create_test_state(MockMailer::new());

    handlers::signup(
        State(state.clone()),
        Json(signup_payload("alice", "alice@example.com")),
    )
    .await
    .unwrap();
    let code = mailer.last_code().unwrap();
    let wrong = if code == 9999 { 1111 } else { code + 1 };

    let err = handlers::token(
        State(state),
        Json(TokenRequest {
            username: "alice".to_string(),
            confirmation_code: wrong,
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[test]
async fn stale_code_stops_working_after_reissue() {
    let (state, _repo, mailer) = create_test_state(MockMailer::new());

    handlers::signup(
        State(state.clone()),
        Json(signup_payload("alice", "alice@example.com")),
    )
    .await
    .unwrap();
    let first_code = mailer.last_code().unwrap();

    // Second signup replaces the pending code.
    handlers::signup(
        State(state.clone()),
        Json(signup_payload("alice", "alice@example.com")),
    )
    .await
    .unwrap();
    let second_code = mailer.last_code().unwrap();

    if first_code != second_code {
        let err = handlers::token(
            State(state.clone()),
            Json(TokenRequest {
                username: "alice".to_string(),
                confirmation_code: first_code,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    // The latest code always works.
    let result = handlers::token(
        State(state),
        Json(TokenRequest {
            username: "alice".to_string(),
            confirmation_code: second_code,
        }),
    )
    .await;
    assert!(result.is_ok());
}
