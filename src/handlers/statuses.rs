use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    handlers::ValidQuery,
    models::{Page, Status, StatusInput},
    policy,
    repository::Effects,
};

/// list_statuses
///
/// [Public Route] The status vocabulary in creation order.
#[utoipa::path(
    get,
    path = "/statuses/",
    params(Page),
    responses((status = 200, description = "Statuses", body = [Status]))
)]
pub async fn list_statuses(
    State(state): State<AppState>,
    ValidQuery(page): ValidQuery<Page>,
) -> AppResult<Json<Vec<Status>>> {
    Ok(Json(state.repo.list_statuses(page).await?))
}

/// create_status
///
/// [Admin Route] Adds a named status to the vocabulary.
#[utoipa::path(
    post,
    path = "/statuses/",
    request_body = StatusInput,
    responses(
        (status = 200, description = "Created", body = Status),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn create_status(
    caller: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<StatusInput>,
) -> AppResult<Json<Status>> {
    policy::require_admin(&caller)?;

    let audit = policy::admin_audit(&caller, format!("status.create:{}", payload.name));
    let status = state
        .repo
        .create_status(payload, Effects::none().audited(Some(audit)))
        .await?;
    Ok(Json(status))
}

/// update_status
///
/// [Admin Route] Renames a status or changes its record type. Records pointing at it
/// follow along, since they reference it by id.
#[utoipa::path(
    put,
    path = "/statuses/{id}",
    params(("id" = i64, Path, description = "Status ID")),
    request_body = StatusInput,
    responses(
        (status = 200, description = "Updated", body = Status),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_status(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<StatusInput>,
) -> AppResult<Json<Status>> {
    policy::require_admin(&caller)?;

    let mut status = state
        .repo
        .get_status(id)
        .await?
        .ok_or_else(|| AppError::not_found("Status not found"))?;

    let audit = policy::admin_audit(&caller, format!("status.update:{}", payload.name));
    status.apply(payload);

    let saved = state
        .repo
        .update_status(&status, Effects::none().audited(Some(audit)))
        .await?;
    Ok(Json(saved))
}
