/// Router Module Index
///
/// Routes are split by who may call them. `lib.rs` wraps the authenticated and admin
/// routers in the bearer-token layer; the admin role itself is checked inside the
/// handlers, after the target has been resolved where that matters.
use crate::AppState;
use axum::{Router, routing::MethodRouter};

/// Anonymous access: health, registration, login and every read.
pub mod public;

/// Any valid bearer token.
pub mod authenticated;

/// Bearer token plus the admin role.
pub mod admin;

/// Registers a collection route both with and without the trailing slash.
pub(crate) fn collection(
    router: Router<AppState>,
    path: &str,
    method_router: MethodRouter<AppState>,
) -> Router<AppState> {
    router
        .route(path, method_router.clone())
        .route(&format!("{path}/"), method_router)
}
