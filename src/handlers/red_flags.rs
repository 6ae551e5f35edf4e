use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    handlers::{ValidQuery, fetch_red_flag, initial_status},
    models::{Geolocation, MessageResponse, NotificationCreate, Page, RedFlag, RedFlagInput, StatusChange},
    policy,
    repository::Effects,
};

/// list_red_flags
///
/// [Public Route] All red flags in filing order.
#[utoipa::path(
    get,
    path = "/red_flags/",
    params(Page),
    responses((status = 200, description = "Red flags", body = [RedFlag]))
)]
pub async fn list_red_flags(
    State(state): State<AppState>,
    ValidQuery(page): ValidQuery<Page>,
) -> AppResult<Json<Vec<RedFlag>>> {
    Ok(Json(state.repo.list_red_flags(page).await?))
}

/// get_red_flag
///
/// [Public Route] A single red flag.
#[utoipa::path(
    get,
    path = "/red_flags/{id}",
    params(("id" = i64, Path, description = "Red flag ID")),
    responses(
        (status = 200, description = "Found", body = RedFlag),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_red_flag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<RedFlag>> {
    Ok(Json(fetch_red_flag(&*state.repo, id).await?))
}

/// create_red_flag
///
/// [Authenticated Route] Files a new red flag owned by the caller, starting in the
/// "pending" status. The owner is always taken from the token, never the payload.
#[utoipa::path(
    post,
    path = "/red_flags/",
    request_body = RedFlagInput,
    responses((status = 200, description = "Created", body = RedFlag))
)]
pub async fn create_red_flag(
    caller: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<RedFlagInput>,
) -> AppResult<Json<RedFlag>> {
    let status = initial_status(&*state.repo).await?;
    let flag = state
        .repo
        .create_red_flag(payload, caller.id, status.id)
        .await?;
    tracing::info!(red_flag_id = flag.id, user_id = caller.id, "red flag filed");
    Ok(Json(flag))
}

/// update_red_flag
///
/// [Authenticated Route] Replaces the editable fields of a red flag.
///
/// *Authorization*: owner or admin.
#[utoipa::path(
    put,
    path = "/red_flags/{id}",
    params(("id" = i64, Path, description = "Red flag ID")),
    request_body = RedFlagInput,
    responses(
        (status = 200, description = "Updated", body = RedFlag),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_red_flag(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<RedFlagInput>,
) -> AppResult<Json<RedFlag>> {
    let mut flag = fetch_red_flag(&*state.repo, id).await?;
    let access = policy::require_owner_or_admin(&caller, flag.user_id)?;

    flag.apply(payload);

    let effects = Effects::none().audited(access.audit(&caller, "red_flag.update"));
    Ok(Json(state.repo.save_red_flag(&flag, effects).await?))
}

/// update_red_flag_location
///
/// [Authenticated Route] Moves a red flag to a new county/location.
///
/// *Authorization*: owner or admin.
#[utoipa::path(
    put,
    path = "/red_flags/{id}/update_location",
    params(("id" = i64, Path, description = "Red flag ID")),
    request_body = Geolocation,
    responses(
        (status = 200, description = "Relocated", body = RedFlag),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_red_flag_location(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<Geolocation>,
) -> AppResult<Json<RedFlag>> {
    let mut flag = fetch_red_flag(&*state.repo, id).await?;
    let access = policy::require_owner_or_admin(&caller, flag.user_id)?;

    flag.relocate(payload);

    let effects = Effects::none().audited(access.audit(&caller, "red_flag.update_location"));
    Ok(Json(state.repo.save_red_flag(&flag, effects).await?))
}

/// change_red_flag_status
///
/// [Admin Route] Moves a red flag to another named status, records the admin action and
/// leaves a notification for the owner.
///
/// *RBAC*: the admin rule is checked before anything else, so non-admins get 403 whether
/// or not the red flag exists.
#[utoipa::path(
    put,
    path = "/red_flags/{id}/change_status",
    params(("id" = i64, Path, description = "Red flag ID")),
    request_body = StatusChange,
    responses(
        (status = 200, description = "Status changed", body = RedFlag),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Red flag or status not found")
    )
)]
pub async fn change_red_flag_status(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<StatusChange>,
) -> AppResult<Json<RedFlag>> {
    policy::require_admin(&caller)?;

    let mut flag = fetch_red_flag(&*state.repo, id).await?;
    let status = policy::resolve_status(&*state.repo, &payload.name).await?;

    flag.status_id = status.id;

    let effects = Effects::none()
        .audited(Some(policy::admin_audit(
            &caller,
            format!("red_flag.change_status:{}", status.name),
        )))
        .notify(NotificationCreate::in_app(
            flag.user_id,
            format!("Your red flag #{} is now '{}'", flag.id, status.name),
        ));
    Ok(Json(state.repo.save_red_flag(&flag, effects).await?))
}

/// delete_red_flag
///
/// [Authenticated Route] Permanently removes a red flag together with its media rows and
/// tags.
///
/// *Authorization*: owner or admin.
#[utoipa::path(
    delete,
    path = "/red_flags/{id}",
    params(("id" = i64, Path, description = "Red flag ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_red_flag(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    let flag = fetch_red_flag(&*state.repo, id).await?;
    let access = policy::require_owner_or_admin(&caller, flag.user_id)?;

    let effects = Effects::none().audited(access.audit(&caller, "red_flag.delete"));
    if !state.repo.delete_red_flag(flag.id, effects).await? {
        // Someone else deleted it between the fetch and now.
        return Err(AppError::not_found("Red flag not found"));
    }

    Ok(Json(MessageResponse {
        message: "Red flag deleted".to_string(),
    }))
}
