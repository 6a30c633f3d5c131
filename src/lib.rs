use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod constants;
pub mod errors;
pub mod filters;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod permissions;
pub mod repository;
pub mod validation;

// Module for routing segregation (Public, Content, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, content, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry
// point and to the integration tests.
pub use config::AppConfig;
pub use errors::ApiError;
pub use mailer::{MailerState, MockMailer, SmtpMailer};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the service,
/// aggregating every handler decorated with `#[utoipa::path]` and every
/// schema carrying `#[derive(utoipa::ToSchema)]`. Served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::signup, handlers::auth::token,
        handlers::users::get_me, handlers::users::update_me,
        handlers::users::admin_list_users, handlers::users::admin_create_user,
        handlers::users::admin_get_user, handlers::users::admin_update_user,
        handlers::users::admin_delete_user,
        handlers::catalog::list_categories, handlers::catalog::create_category,
        handlers::catalog::delete_category, handlers::catalog::list_genres,
        handlers::catalog::create_genre, handlers::catalog::delete_genre,
        handlers::catalog::list_titles, handlers::catalog::get_title,
        handlers::catalog::create_title, handlers::catalog::update_title,
        handlers::catalog::delete_title,
        handlers::content::list_reviews, handlers::content::get_review,
        handlers::content::create_review, handlers::content::update_review,
        handlers::content::delete_review, handlers::content::list_comments,
        handlers::content::get_comment, handlers::content::create_comment,
        handlers::content::update_comment, handlers::content::delete_comment,
    ),
    components(
        schemas(
            models::Role, models::User, models::Category, models::Genre,
            models::Title, models::Review, models::Comment,
            models::SignupRequest, models::TokenRequest, models::TokenResponse,
            models::UpdateProfileRequest, models::CreateUserRequest,
            models::TermRequest, models::CreateTitleRequest,
            models::UpdateTitleRequest, models::CreateReviewRequest,
            models::UpdateReviewRequest, models::CommentRequest,
        )
    ),
    tags(
        (name = "media-catalog", description = "Crowd-reviewed media catalog API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all application
/// services and configuration, shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository layer: all persistence behind the `Repository` trait.
    pub repo: RepositoryState,
    /// Outbound email: confirmation-code delivery behind the `Mailer` trait.
    pub mailer: MailerState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These let extractors (notably AuthUser) pull individual components out of
// the shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for MailerState {
    fn from_ref(app_state: &AppState) -> MailerState {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the routers it wraps by running the
/// `AuthUser` extractor. A failed extraction (missing/expired token, deleted
/// account) rejects with 401 before the handler runs; on success the request
/// proceeds and handlers re-extract the identity as an argument.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the full routing structure, applies global and scoped
/// middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS configuration.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base router assembly.
    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes: no middleware applied.
        .merge(public::public_routes())
        // Content routes: mixed-tier paths; mutating handlers authenticate
        // via the AuthUser extractor themselves (see routes::content).
        .merge(content::content_routes())
        // Authenticated routes: protected by the auth middleware.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Admin routes, nested under '/admin' and protected by the auth
        // middleware. The admin capability check itself is performed inside
        // the handlers through the access-control engine.
        .nest(
            "/admin",
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .with_state(state);

    // 3. Observability and correlation layers (outermost).
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID generation: a UUID for every request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request tracing: span per request, correlated by ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS layer.
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes the tracing span created per request: method, URI and the
/// generated `x-request-id`, so every log line of one request correlates.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
