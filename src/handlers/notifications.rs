use axum::{
    Json,
    extract::State,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    handlers::ValidQuery,
    models::{Notification, NotificationCreate, Page},
    policy,
    repository::Effects,
};

/// list_notifications
///
/// [Authenticated Route] The caller's own notifications, oldest first.
#[utoipa::path(
    get,
    path = "/notifications/",
    params(Page),
    responses((status = 200, description = "Inbox", body = [Notification]))
)]
pub async fn list_notifications(
    caller: AuthUser,
    State(state): State<AppState>,
    ValidQuery(page): ValidQuery<Page>,
) -> AppResult<Json<Vec<Notification>>> {
    Ok(Json(state.repo.list_notifications(caller.id, page).await?))
}

/// create_notification
///
/// [Admin Route] Stores a notification for any user. Nothing is sent; the email/sms
/// flags only record the intended channel.
#[utoipa::path(
    post,
    path = "/notifications/",
    request_body = NotificationCreate,
    responses(
        (status = 200, description = "Stored", body = Notification),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Recipient not found")
    )
)]
pub async fn create_notification(
    caller: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<NotificationCreate>,
) -> AppResult<Json<Notification>> {
    policy::require_admin(&caller)?;

    if state.repo.get_user(payload.user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let audit = policy::admin_audit(&caller, "notification.create");
    let notification = state
        .repo
        .create_notification(payload, Effects::none().audited(Some(audit)))
        .await?;
    Ok(Json(notification))
}
