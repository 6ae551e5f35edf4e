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

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod policy;
pub mod repository;

// Public, authenticated and admin routers.
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use memory::InMemoryRepository;
pub use repository::{PostgresRepository, Repository, RepositoryState};

/// ApiDoc
///
/// The OpenAPI document served at `/api-docs/openapi.json`, built from every
/// `#[utoipa::path]` handler and `ToSchema` model.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::users::register_user, handlers::users::login, handlers::users::login_form,
        handlers::users::get_me, handlers::users::list_users, handlers::users::get_user,
        handlers::users::update_user,
        handlers::statuses::list_statuses, handlers::statuses::create_status,
        handlers::statuses::update_status,
        handlers::red_flags::list_red_flags, handlers::red_flags::get_red_flag,
        handlers::red_flags::create_red_flag, handlers::red_flags::update_red_flag,
        handlers::red_flags::update_red_flag_location, handlers::red_flags::change_red_flag_status,
        handlers::red_flags::delete_red_flag,
        handlers::interventions::list_interventions, handlers::interventions::get_intervention,
        handlers::interventions::create_intervention, handlers::interventions::update_intervention,
        handlers::interventions::update_intervention_location,
        handlers::interventions::change_intervention_status,
        handlers::interventions::delete_intervention,
        handlers::attachments::add_red_flag_image, handlers::attachments::list_red_flag_images,
        handlers::attachments::add_red_flag_video, handlers::attachments::list_red_flag_videos,
        handlers::attachments::tag_red_flag, handlers::attachments::list_red_flag_tags,
        handlers::attachments::add_intervention_image, handlers::attachments::list_intervention_images,
        handlers::attachments::add_intervention_video, handlers::attachments::list_intervention_videos,
        handlers::attachments::tag_intervention, handlers::attachments::list_intervention_tags,
        handlers::notifications::list_notifications, handlers::notifications::create_notification,
        handlers::admin_actions::list_admin_actions
    ),
    components(
        schemas(
            models::Role, models::UserResponse, models::UserCreate, models::UserUpdate,
            models::LoginRequest, models::TokenResponse, models::Status, models::StatusInput,
            models::StatusChange, models::RedFlag, models::RedFlagInput, models::Intervention,
            models::InterventionInput, models::Geolocation, models::Media, models::MediaInput,
            models::Tag, models::TagInterventionRequest, models::TagRedFlagRequest,
            models::Notification, models::NotificationCreate, models::AdminAction,
            models::MessageResponse,
        )
    ),
    tags(
        (name = "redflag", description = "Red-flag and intervention reporting API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared state handed to every handler: the registry handle and the
/// immutable configuration.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self { repo, config }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with 401 unless `AuthUser` resolves. Handlers extract
/// `AuthUser` again for the caller's identity.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing tree, the bearer-token layer, and the observability and CORS
/// layers around it.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let protected = authenticated::authenticated_routes()
        .merge(admin::admin_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(protected)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// One span per request, carrying method, URI and the `x-request-id` set above.
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
