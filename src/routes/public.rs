use crate::{
    AppState,
    handlers::{attachments, interventions, red_flags, statuses, users},
    routes::collection,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no token: the gateway functions (registration and login) and
/// read access to users, statuses and reports. Soft-deleted interventions are already
/// filtered out by the registry.
pub fn public_routes() -> Router<AppState> {
    let router = Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /token (OAuth2 password form) and POST /login (JSON)
        .route("/token", post(users::login_form))
        .route("/login", post(users::login))
        .route("/users/{id}", get(users::get_user))
        .route("/red_flags/{id}", get(red_flags::get_red_flag))
        .route("/red_flags/{id}/images", get(attachments::list_red_flag_images))
        .route("/red_flags/{id}/videos", get(attachments::list_red_flag_videos))
        .route("/red_flags/{id}/tags", get(attachments::list_red_flag_tags))
        .route("/interventions/{id}", get(interventions::get_intervention))
        .route("/interventions/{id}/images", get(attachments::list_intervention_images))
        .route("/interventions/{id}/videos", get(attachments::list_intervention_videos))
        .route("/interventions/{id}/tags", get(attachments::list_intervention_tags));

    // POST /users/ registers; GET /users/ lists public profiles.
    let router = collection(
        router,
        "/users",
        post(users::register_user).get(users::list_users),
    );
    let router = collection(router, "/statuses", get(statuses::list_statuses));
    let router = collection(router, "/red_flags", get(red_flags::list_red_flags));
    collection(router, "/interventions", get(interventions::list_interventions))
}
