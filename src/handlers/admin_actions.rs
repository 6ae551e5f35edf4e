use axum::{
    Json,
    extract::State,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    handlers::ValidQuery,
    models::{AdminAction, Page},
    policy,
};

/// list_admin_actions
///
/// [Admin Route] The audit trail of privileged mutations, oldest first.
#[utoipa::path(
    get,
    path = "/admin_actions/",
    params(Page),
    responses(
        (status = 200, description = "Audit trail", body = [AdminAction]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_admin_actions(
    caller: AuthUser,
    State(state): State<AppState>,
    ValidQuery(page): ValidQuery<Page>,
) -> AppResult<Json<Vec<AdminAction>>> {
    policy::require_admin(&caller)?;
    Ok(Json(state.repo.list_admin_actions(page).await?))
}
