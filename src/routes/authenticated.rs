use crate::{
    AppState,
    handlers::{attachments, interventions, notifications, red_flags, users},
    routes::collection,
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Routes for any caller holding a valid bearer token. Handlers receive the resolved
/// `AuthUser` and apply the ownership rule themselves: the owner of a report, or an
/// admin, may change it.
pub fn authenticated_routes() -> Router<AppState> {
    let router = Router::<AppState>::new()
        // GET /users/me
        .route("/users/me", get(users::get_me))
        // PUT /users/{id}
        // Self-service profile edits; role changes are admin-only.
        .route("/users/{id}", put(users::update_user))
        // --- Red flags ---
        // PUT/DELETE /red_flags/{id}
        // Delete is permanent and cascades to media and tags.
        .route(
            "/red_flags/{id}",
            put(red_flags::update_red_flag).delete(red_flags::delete_red_flag),
        )
        .route(
            "/red_flags/{id}/update_location",
            put(red_flags::update_red_flag_location),
        )
        .route("/red_flags/{id}/images", post(attachments::add_red_flag_image))
        .route("/red_flags/{id}/videos", post(attachments::add_red_flag_video))
        .route("/red_flags/{id}/tags", post(attachments::tag_red_flag))
        // --- Interventions ---
        // DELETE only stamps deleted_by/deleted_at.
        .route(
            "/interventions/{id}",
            put(interventions::update_intervention).delete(interventions::delete_intervention),
        )
        .route(
            "/interventions/{id}/update_location",
            put(interventions::update_intervention_location),
        )
        .route("/interventions/{id}/images", post(attachments::add_intervention_image))
        .route("/interventions/{id}/videos", post(attachments::add_intervention_video))
        .route("/interventions/{id}/tags", post(attachments::tag_intervention));

    let router = collection(router, "/red_flags", post(red_flags::create_red_flag));
    let router = collection(
        router,
        "/interventions",
        post(interventions::create_intervention),
    );
    // GET /notifications/
    // The caller's own inbox.
    collection(router, "/notifications", get(notifications::list_notifications))
}
