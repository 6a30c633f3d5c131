use axum::{
    Json,
    extract::{Path, Query, RawQuery, State},
    http::StatusCode,
};
use media_catalog::{
    AppState, MemoryRepository, MockMailer,
    auth::AuthUser,
    config::AppConfig,
    errors::ApiError,
    handlers::{self, SearchFilter},
    models::{CreateTitleRequest, Role, TermRequest, UpdateTitleRequest},
    repository::Repository,
};
use std::sync::Arc;
use tokio::test;
use uuid::Uuid;

// --- TEST UTILITIES ---

fn create_test_state() -> (AppState, Arc<MemoryRepository>) {
    let repo = Arc::new(MemoryRepository::new());
    let state = AppState {
        repo: repo.clone(),
        mailer: Arc::new(MockMailer::new()),
        config: AppConfig::default(),
    };
    (state, repo)
}

fn admin_user() -> AuthUser {
    AuthUser {
        id: Uuid::from_u128(1),
        username: "admin".to_string(),
        role: Role::Admin,
        is_staff: false,
    }
}

fn plain_user() -> AuthUser {
    AuthUser {
        id: Uuid::from_u128(2),
        username: "plain".to_string(),
        role: Role::User,
        is_staff: false,
    }
}

fn term(name: &str, slug: &str) -> TermRequest {
    TermRequest {
        name: name.to_string(),
        slug: slug.to_string(),
    }
}

fn no_search() -> Query<SearchFilter> {
    Query(SearchFilter { search: None })
}

async fn seed_title(
    repo: &Arc<MemoryRepository>,
    name: &str,
    year: i32,
    genres: &[&str],
    category: Option<&str>,
) -> Uuid {
    let title = repo
        .create_title(CreateTitleRequest {
            name: name.to_string(),
            year,
            description: None,
            genre: genres.iter().map(|s| s.to_string()).collect(),
            category: category.map(|s| s.to_string()),
        })
        .await
        .unwrap();
    title.id
}

// --- TAXONOMY ---

#[test]
async fn category_crud_round_trip() {
    let (state, _repo) = create_test_state();

    let (status, Json(created)) = handlers::create_category(
        admin_user(),
        State(state.clone()),
        Json(term("Films", "films")),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created.fields.slug, "films");

    let Json(listed) = handlers::list_categories(State(state.clone()), no_search())
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    let status = handlers::delete_category(admin_user(), State(state.clone()), Path("films".into()))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let err = handlers::delete_category(admin_user(), State(state), Path("films".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound));
}

#[test]
async fn non_admin_cannot_touch_the_taxonomy() {
    let (state, _repo) = create_test_state();

    let err = handlers::create_category(
        plain_user(),
        State(state.clone()),
        Json(term("Films", "films")),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden));

    let err = handlers::delete_genre(plain_user(), State(state), Path("x".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden));
}

#[test]
async fn staff_flag_grants_catalog_write() {
    let (state, _repo) = create_test_state();
    let staff = AuthUser {
        id: Uuid::from_u128(3),
        username: "staffer".to_string(),
        role: Role::User,
        is_staff: true,
    };

    let result =
        handlers::create_genre(staff, State(state), Json(term("Science Fiction", "sci-fi"))).await;
    assert!(result.is_ok());
}

#[test]
async fn duplicate_slug_is_a_conflict() {
    let (state, _repo) = create_test_state();

    handlers::create_genre(admin_user(), State(state.clone()), Json(term("Noir", "noir")))
        .await
        .unwrap();
    let err = handlers::create_genre(
        admin_user(),
        State(state),
        Json(term("Film Noir", "noir")),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[test]
async fn bad_slug_is_rejected_before_storage() {
    let (state, repo) = create_test_state();

    let err = handlers::create_category(
        admin_user(),
        State(state),
        Json(term("Bad", "no spaces")),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert!(repo.list_categories(None).await.unwrap().is_empty());
}

// --- TITLES ---

#[test]
async fn title_create_resolves_slugs_and_rejects_unknown_ones() {
    let (state, repo) = create_test_state();
    repo.create_category(term("Films", "films")).await.unwrap();
    repo.create_genre(term("Drama", "drama")).await.unwrap();

    let (status, Json(title)) = handlers::create_title(
        admin_user(),
        State(state.clone()),
        Json(CreateTitleRequest {
            name: "Dune".to_string(),
            year: 1984,
            description: Some("Desert planet".to_string()),
            genre: vec!["drama".to_string()],
            category: Some("films".to_string()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(title.genre.len(), 1);
    assert_eq!(title.category.as_ref().unwrap().fields.slug, "films");
    assert_eq!(title.rating, None);

    let err = handlers::create_title(
        admin_user(),
        State(state),
        Json(CreateTitleRequest {
            name: "Ghost".to_string(),
            year: 1990,
            description: None,
            genre: vec!["unknown".to_string()],
            category: None,
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[test]
async fn future_year_is_rejected_on_create_and_update() {
    let (state, repo) = create_test_state();
    let future = media_catalog::validation::current_year() + 1;

    let err = handlers::create_title(
        admin_user(),
        State(state.clone()),
        Json(CreateTitleRequest {
            name: "Time Machine".to_string(),
            year: future,
            description: None,
            genre: vec![],
            category: None,
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    let id = seed_title(&repo, "Old", 1990, &[], None).await;
    let err = handlers::update_title(
        admin_user(),
        State(state),
        Path(id),
        Json(UpdateTitleRequest {
            year: Some(future),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[test]
async fn deleting_a_category_detaches_titles_instead_of_deleting_them() {
    let (state, repo) = create_test_state();
    repo.create_category(term("Films", "films")).await.unwrap();
    let id = seed_title(&repo, "Dune", 1984, &[], Some("films")).await;

    handlers::delete_category(admin_user(), State(state.clone()), Path("films".into()))
        .await
        .unwrap();

    let Json(title) = handlers::get_title(State(state), Path(id)).await.unwrap();
    assert!(title.category.is_none());
}

#[test]
async fn title_filters_combine_as_and_with_genre_or() {
    let (state, repo) = create_test_state();
    repo.create_category(term("Films", "films")).await.unwrap();
    repo.create_category(term("Books", "books")).await.unwrap();
    repo.create_genre(term("Sci-Fi", "scifi")).await.unwrap();
    repo.create_genre(term("Noir", "noir")).await.unwrap();
    repo.create_genre(term("Drama", "drama")).await.unwrap();

    seed_title(&repo, "Dune", 1984, &["scifi"], Some("films")).await;
    seed_title(&repo, "Blade Runner", 1982, &["scifi", "noir"], Some("films")).await;
    seed_title(&repo, "Dune (novel)", 1965, &["scifi"], Some("books")).await;
    seed_title(&repo, "Casablanca", 1942, &["drama"], Some("films")).await;

    let list = |q: &str| {
        let state = state.clone();
        let q = q.to_string();
        async move {
            let Json(titles) = handlers::list_titles(State(state), RawQuery(Some(q)))
                .await
                .unwrap();
            titles.into_iter().map(|t| t.name).collect::<Vec<_>>()
        }
    };

    // Repeated genre ORs across slugs.
    let names = list("genre=noir&genre=drama").await;
    assert_eq!(names, vec!["Blade Runner", "Casablanca"]);

    // Other filters AND together.
    let names = list("genre=scifi&category=films&year=1984").await;
    assert_eq!(names, vec!["Dune"]);

    // Substring name match is case-insensitive.
    let names = list("name=dune").await;
    assert_eq!(names, vec!["Dune", "Dune (novel)"]);

    // No filters: everything, ordered by name.
    let names = list("").await;
    assert_eq!(names.len(), 4);
}

#[test]
async fn rating_is_the_mean_and_null_without_reviews() {
    let (state, repo) = create_test_state();
    let id = seed_title(&repo, "Dune", 1984, &[], None).await;
    let alice = repo
        .create_user(media_catalog::models::User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "a@x.com".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let bob = repo
        .create_user(media_catalog::models::User {
            id: Uuid::new_v4(),
            username: "bob".into(),
            email: "b@x.com".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let Json(title) = handlers::get_title(State(state.clone()), Path(id))
        .await
        .unwrap();
    assert_eq!(title.rating, None);

    repo.create_review(id, alice.id, "good".into(), 7).await.unwrap();
    repo.create_review(id, bob.id, "great".into(), 8).await.unwrap();

    let Json(title) = handlers::get_title(State(state), Path(id)).await.unwrap();
    assert_eq!(title.rating, Some(7.5));
}

#[test]
async fn update_title_replaces_the_genre_set_wholesale() {
    let (state, repo) = create_test_state();
    repo.create_genre(term("Sci-Fi", "scifi")).await.unwrap();
    repo.create_genre(term("Noir", "noir")).await.unwrap();
    let id = seed_title(&repo, "Blade Runner", 1982, &["scifi"], None).await;

    let Json(title) = handlers::update_title(
        admin_user(),
        State(state),
        Path(id),
        Json(UpdateTitleRequest {
            genre: Some(vec!["noir".to_string()]),
            ..Default::default()
        }),
    )
    .await
    .unwrap();

    let slugs: Vec<_> = title.genre.iter().map(|g| g.fields.slug.as_str()).collect();
    assert_eq!(slugs, vec!["noir"]);
}

#[test]
async fn missing_title_is_not_found_everywhere() {
    let (state, _repo) = create_test_state();
    let ghost = Uuid::new_v4();

    let err = handlers::get_title(State(state.clone()), Path(ghost))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound));

    let err = handlers::delete_title(admin_user(), State(state), Path(ghost))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound));
}
