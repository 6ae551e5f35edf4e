use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;

use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    handlers::{ValidQuery, fetch_intervention, initial_status},
    models::{Geolocation, Intervention, InterventionInput, NotificationCreate, Page, StatusChange},
    policy,
    repository::Effects,
};

/// list_interventions
///
/// [Public Route] Interventions that have not been deleted, in filing order.
#[utoipa::path(
    get,
    path = "/interventions/",
    params(Page),
    responses((status = 200, description = "Interventions", body = [Intervention]))
)]
pub async fn list_interventions(
    State(state): State<AppState>,
    ValidQuery(page): ValidQuery<Page>,
) -> AppResult<Json<Vec<Intervention>>> {
    Ok(Json(state.repo.list_interventions(page).await?))
}

/// get_intervention
///
/// [Public Route] A single intervention. Deleted ones answer 404.
#[utoipa::path(
    get,
    path = "/interventions/{id}",
    params(("id" = i64, Path, description = "Intervention ID")),
    responses(
        (status = 200, description = "Found", body = Intervention),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_intervention(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Intervention>> {
    Ok(Json(fetch_intervention(&*state.repo, id).await?))
}

/// create_intervention
///
/// [Authenticated Route] Files a new intervention request owned by the caller.
#[utoipa::path(
    post,
    path = "/interventions/",
    request_body = InterventionInput,
    responses((status = 200, description = "Created", body = Intervention))
)]
pub async fn create_intervention(
    caller: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<InterventionInput>,
) -> AppResult<Json<Intervention>> {
    let status = initial_status(&*state.repo).await?;
    let intervention = state
        .repo
        .create_intervention(payload, caller.id, status.id)
        .await?;
    tracing::info!(intervention_id = intervention.id, user_id = caller.id, "intervention filed");
    Ok(Json(intervention))
}

/// update_intervention
///
/// [Authenticated Route] Replaces the editable fields of an intervention.
///
/// *Authorization*: owner or admin.
#[utoipa::path(
    put,
    path = "/interventions/{id}",
    params(("id" = i64, Path, description = "Intervention ID")),
    request_body = InterventionInput,
    responses(
        (status = 200, description = "Updated", body = Intervention),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_intervention(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<InterventionInput>,
) -> AppResult<Json<Intervention>> {
    let mut intervention = fetch_intervention(&*state.repo, id).await?;
    let access = policy::require_owner_or_admin(&caller, intervention.user_id)?;

    intervention.apply(payload);

    let effects = Effects::none().audited(access.audit(&caller, "intervention.update"));
    Ok(Json(state.repo.save_intervention(&intervention, effects).await?))
}

/// update_intervention_location
///
/// [Authenticated Route] Moves an intervention to a new county/location.
#[utoipa::path(
    put,
    path = "/interventions/{id}/update_location",
    params(("id" = i64, Path, description = "Intervention ID")),
    request_body = Geolocation,
    responses(
        (status = 200, description = "Relocated", body = Intervention),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_intervention_location(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<Geolocation>,
) -> AppResult<Json<Intervention>> {
    let mut intervention = fetch_intervention(&*state.repo, id).await?;
    let access = policy::require_owner_or_admin(&caller, intervention.user_id)?;

    intervention.relocate(payload);

    let effects = Effects::none().audited(access.audit(&caller, "intervention.update_location"));
    Ok(Json(state.repo.save_intervention(&intervention, effects).await?))
}

/// change_intervention_status
///
/// [Admin Route] Moves an intervention to another named status.
#[utoipa::path(
    put,
    path = "/interventions/{id}/change_status",
    params(("id" = i64, Path, description = "Intervention ID")),
    request_body = StatusChange,
    responses(
        (status = 200, description = "Status changed", body = Intervention),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Intervention or status not found")
    )
)]
pub async fn change_intervention_status(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<StatusChange>,
) -> AppResult<Json<Intervention>> {
    policy::require_admin(&caller)?;

    let mut intervention = fetch_intervention(&*state.repo, id).await?;
    let status = policy::resolve_status(&*state.repo, &payload.name).await?;

    intervention.status_id = status.id;

    let effects = Effects::none()
        .audited(Some(policy::admin_audit(
            &caller,
            format!("intervention.change_status:{}", status.name),
        )))
        .notify(NotificationCreate::in_app(
            intervention.user_id,
            format!("Your intervention #{} is now '{}'", intervention.id, status.name),
        ));
    Ok(Json(state.repo.save_intervention(&intervention, effects).await?))
}

/// delete_intervention
///
/// [Authenticated Route] Soft-deletes an intervention: the row stays, stamped with who
/// deleted it and when, and disappears from every read.
///
/// *Authorization*: owner or admin.
#[utoipa::path(
    delete,
    path = "/interventions/{id}",
    params(("id" = i64, Path, description = "Intervention ID")),
    responses(
        (status = 200, description = "Soft-deleted", body = Intervention),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_intervention(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Intervention>> {
    let mut intervention = fetch_intervention(&*state.repo, id).await?;
    let access = policy::require_owner_or_admin(&caller, intervention.user_id)?;

    intervention.soft_delete(caller.id, Utc::now());

    let effects = Effects::none().audited(access.audit(&caller, "intervention.delete"));
    Ok(Json(state.repo.save_intervention(&intervention, effects).await?))
}
