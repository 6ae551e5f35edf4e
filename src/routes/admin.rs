use crate::{
    AppState,
    handlers::{admin_actions, interventions, notifications, red_flags, statuses},
    routes::collection,
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Moderation endpoints. Every handler here calls `policy::require_admin` before it
/// touches the registry, so a non-admin gets 403 even for ids that do not exist.
/// Each successful call leaves an `admin_actions` row.
pub fn admin_routes() -> Router<AppState> {
    let router = Router::<AppState>::new()
        // PUT|POST /red_flags/{id}/change_status
        // Body `{id?, name}`; the status is resolved by name. The owner is notified.
        .route(
            "/red_flags/{id}/change_status",
            put(red_flags::change_red_flag_status).post(red_flags::change_red_flag_status),
        )
        .route(
            "/interventions/{id}/change_status",
            put(interventions::change_intervention_status)
                .post(interventions::change_intervention_status),
        )
        // PUT /statuses/{id}
        .route("/statuses/{id}", put(statuses::update_status));

    let router = collection(router, "/statuses", post(statuses::create_status));
    let router = collection(
        router,
        "/notifications",
        post(notifications::create_notification),
    );
    collection(router, "/admin_actions", get(admin_actions::list_admin_actions))
}
