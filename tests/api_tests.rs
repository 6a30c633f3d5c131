use media_catalog::{
    AppConfig, AppState, MemoryRepository, MockMailer, create_router,
    models::{Role, User, UserPatch},
    repository::Repository,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub repo: Arc<MemoryRepository>,
    pub mailer: Arc<MockMailer>,
}

// Spawns the full router over the in-memory repository and the recording
// mailer, so the whole HTTP surface (middleware, extractors, status mapping)
// is exercised without external infrastructure.
async fn spawn_app() -> TestApp {
    let repo = Arc::new(MemoryRepository::new());
    let mailer = Arc::new(MockMailer::new());

    let state = AppState {
        repo: repo.clone(),
        mailer: mailer.clone(),
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        mailer,
    }
}

// Runs the signup + token exchange over HTTP and returns a bearer token.
async fn obtain_token(app: &TestApp, client: &reqwest::Client, username: &str) -> String {
    let response = client
        .post(format!("{}/auth/signup", app.address))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{username}@example.com"),
        }))
        .send()
        .await
        .expect("signup request failed");
    assert!(response.status().is_success());

    let code = app.mailer.last_code().expect("code should be emailed");

    let response = client
        .post(format!("{}/auth/token", app.address))
        .json(&serde_json::json!({
            "username": username,
            "confirmation_code": code,
        }))
        .send()
        .await
        .expect("token request failed");
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.unwrap();
    body["token"].as_str().expect("token field").to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_catalog_reads_are_anonymous() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    for path in ["/categories", "/genres", "/titles"] {
        let response = client
            .get(format!("{}{}", app.address, path))
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), 200, "{path}");
    }

    let response = client
        .get(format!("{}/titles/{}", app.address, Uuid::new_v4()))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_anonymous_writes_are_rejected_with_401() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Self-service profile (middleware-guarded).
    let response = client
        .get(format!("{}/users/me", app.address))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 401);

    // Content mutation (extractor-guarded).
    let response = client
        .post(format!(
            "{}/titles/{}/reviews",
            app.address,
            Uuid::new_v4()
        ))
        .json(&serde_json::json!({ "text": "hi", "score": 5 }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 401);

    // Admin surface.
    let response = client
        .post(format!("{}/admin/categories", app.address))
        .json(&serde_json::json!({ "name": "Films", "slug": "films" }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_signup_token_profile_flow() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let token = obtain_token(&app, &client, "alice").await;

    let response = client
        .get(format!("{}/users/me", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);

    let profile: serde_json::Value = response.json().await.unwrap();
    assert_eq!(profile["username"], "alice");
    assert_eq!(profile["role"], "user");
    // Internal fields never serialize.
    assert!(profile.get("confirmation_code").is_none());
    assert!(profile.get("is_staff").is_none());
}

#[tokio::test]
async fn test_plain_user_gets_403_on_the_admin_surface() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let token = obtain_token(&app, &client, "alice").await;
    let response = client
        .get(format!("{}/admin/users", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_admin_token_carries_the_capability() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Promote the account before the token is minted: the claims snapshot
    // the capability at issuance.
    app.repo
        .create_user(User {
            id: Uuid::new_v4(),
            username: "root".into(),
            email: "root@example.com".into(),
            role: Role::Admin,
            ..Default::default()
        })
        .await
        .unwrap();
    let token = obtain_token(&app, &client, "root").await;

    let response = client
        .post(format!("{}/admin/categories", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "name": "Films", "slug": "films" }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 201);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["slug"], "films");
}

#[tokio::test]
async fn test_review_lifecycle_over_http() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Seed an admin, a catalog entry, and a reviewing user.
    app.repo
        .create_user(User {
            id: Uuid::new_v4(),
            username: "root".into(),
            email: "root@example.com".into(),
            role: Role::Admin,
            ..Default::default()
        })
        .await
        .unwrap();
    let admin_token = obtain_token(&app, &client, "root").await;
    let user_token = obtain_token(&app, &client, "alice").await;

    let response = client
        .post(format!("{}/admin/titles", app.address))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "name": "Dune", "year": 1984 }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 201);
    let title: serde_json::Value = response.json().await.unwrap();
    let title_id = title["id"].as_str().unwrap().to_string();

    // Post a review, read it back anonymously, observe the rating.
    let response = client
        .post(format!("{}/titles/{}/reviews", app.address, title_id))
        .bearer_auth(&user_token)
        .json(&serde_json::json!({ "text": "classic", "score": 9 }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 201);

    let response = client
        .get(format!("{}/titles/{}", app.address, title_id))
        .send()
        .await
        .expect("req fail");
    let fetched: serde_json::Value = response.json().await.unwrap();
    assert_eq!(fetched["rating"], 9.0);

    // A second review from the same author is a 400 conflict.
    let response = client
        .post(format!("{}/titles/{}/reviews", app.address, title_id))
        .bearer_auth(&user_token)
        .json(&serde_json::json!({ "text": "again", "score": 2 }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_deleted_account_token_stops_working() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let token = obtain_token(&app, &client, "alice").await;
    app.repo.delete_user("alice").await.unwrap();

    let response = client
        .get(format!("{}/users/me", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_role_change_after_issuance_does_not_upgrade_the_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let token = obtain_token(&app, &client, "alice").await;

    // Promote the account after the token was minted.
    app.repo
        .update_user(
            "alice",
            UserPatch {
                role: Some(Role::Admin),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // The in-flight token still carries the issuance-time capability.
    let response = client
        .get(format!("{}/admin/users", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 403);
}
