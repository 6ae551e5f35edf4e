//! Images, videos and tags hanging off red flags and interventions.
//!
//! Listing is public; attaching requires the caller to own the parent record or be an
//! admin. The parent must exist either way.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    handlers::{fetch_intervention, fetch_red_flag},
    models::{Media, MediaInput, MediaKind, RecordRef, Tag, TagInterventionRequest, TagRedFlagRequest},
    policy,
    repository::{Effects, Repository},
};

/// Confirms the parent exists and returns its owner.
async fn parent_owner(repo: &dyn Repository, parent: RecordRef) -> AppResult<i64> {
    let owner = match parent {
        RecordRef::RedFlag(id) => fetch_red_flag(repo, id).await?.user_id,
        RecordRef::Intervention(id) => fetch_intervention(repo, id).await?.user_id,
    };
    Ok(owner)
}

async fn attach(
    state: &AppState,
    caller: &AuthUser,
    kind: MediaKind,
    parent: RecordRef,
    input: MediaInput,
) -> AppResult<Media> {
    let owner = parent_owner(&*state.repo, parent).await?;
    let access = policy::require_owner_or_admin(caller, owner)?;

    let action = match kind {
        MediaKind::Image => format!("{}.add_image", parent.label()),
        MediaKind::Video => format!("{}.add_video", parent.label()),
    };
    let effects = Effects::none().audited(access.audit(caller, action));

    Ok(state
        .repo
        .add_media(kind, parent, input.file_path, effects)
        .await?)
}

async fn list(state: &AppState, kind: MediaKind, parent: RecordRef) -> AppResult<Vec<Media>> {
    parent_owner(&*state.repo, parent).await?;
    Ok(state.repo.list_media(kind, parent).await?)
}

/// Links a red flag and an intervention. The caller needs rights over `anchor`, the
/// record whose route was hit; the other side only has to exist.
async fn link(
    state: &AppState,
    caller: &AuthUser,
    anchor: RecordRef,
    red_flag_id: i64,
    intervention_id: i64,
) -> AppResult<Tag> {
    let owner = parent_owner(&*state.repo, anchor).await?;
    let access = policy::require_owner_or_admin(caller, owner)?;

    fetch_red_flag(&*state.repo, red_flag_id).await?;
    fetch_intervention(&*state.repo, intervention_id).await?;

    let effects = Effects::none().audited(access.audit(caller, format!("{}.tag", anchor.label())));
    Ok(state
        .repo
        .create_tag(red_flag_id, intervention_id, effects)
        .await?)
}

// --- Red flags ---

/// [Authenticated Route] Registers an image for a red flag.
#[utoipa::path(
    post,
    path = "/red_flags/{id}/images",
    params(("id" = i64, Path, description = "Red flag ID")),
    request_body = MediaInput,
    responses(
        (status = 200, description = "Attached", body = Media),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn add_red_flag_image(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<MediaInput>,
) -> AppResult<Json<Media>> {
    let media = attach(&state, &caller, MediaKind::Image, RecordRef::RedFlag(id), payload).await?;
    Ok(Json(media))
}

/// [Public Route] Images attached to a red flag.
#[utoipa::path(
    get,
    path = "/red_flags/{id}/images",
    params(("id" = i64, Path, description = "Red flag ID")),
    responses(
        (status = 200, description = "Images", body = [Media]),
        (status = 404, description = "Not Found")
    )
)]
pub async fn list_red_flag_images(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<Media>>> {
    Ok(Json(list(&state, MediaKind::Image, RecordRef::RedFlag(id)).await?))
}

/// [Authenticated Route] Registers a video for a red flag.
#[utoipa::path(
    post,
    path = "/red_flags/{id}/videos",
    params(("id" = i64, Path, description = "Red flag ID")),
    request_body = MediaInput,
    responses(
        (status = 200, description = "Attached", body = Media),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn add_red_flag_video(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<MediaInput>,
) -> AppResult<Json<Media>> {
    let media = attach(&state, &caller, MediaKind::Video, RecordRef::RedFlag(id), payload).await?;
    Ok(Json(media))
}

#[utoipa::path(
    get,
    path = "/red_flags/{id}/videos",
    params(("id" = i64, Path, description = "Red flag ID")),
    responses(
        (status = 200, description = "Videos", body = [Media]),
        (status = 404, description = "Not Found")
    )
)]
pub async fn list_red_flag_videos(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<Media>>> {
    Ok(Json(list(&state, MediaKind::Video, RecordRef::RedFlag(id)).await?))
}

/// [Authenticated Route] Links a red flag to an intervention.
#[utoipa::path(
    post,
    path = "/red_flags/{id}/tags",
    params(("id" = i64, Path, description = "Red flag ID")),
    request_body = TagInterventionRequest,
    responses(
        (status = 200, description = "Linked", body = Tag),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Red flag or intervention not found")
    )
)]
pub async fn tag_red_flag(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<TagInterventionRequest>,
) -> AppResult<Json<Tag>> {
    let tag = link(&state, &caller, RecordRef::RedFlag(id), id, payload.intervention_id).await?;
    Ok(Json(tag))
}

#[utoipa::path(
    get,
    path = "/red_flags/{id}/tags",
    params(("id" = i64, Path, description = "Red flag ID")),
    responses(
        (status = 200, description = "Tags", body = [Tag]),
        (status = 404, description = "Not Found")
    )
)]
pub async fn list_red_flag_tags(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<Tag>>> {
    let parent = RecordRef::RedFlag(id);
    parent_owner(&*state.repo, parent).await?;
    Ok(Json(state.repo.list_tags(parent).await?))
}

// --- Interventions ---

/// [Authenticated Route] Registers an image for an intervention.
#[utoipa::path(
    post,
    path = "/interventions/{id}/images",
    params(("id" = i64, Path, description = "Intervention ID")),
    request_body = MediaInput,
    responses(
        (status = 200, description = "Attached", body = Media),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn add_intervention_image(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<MediaInput>,
) -> AppResult<Json<Media>> {
    let media = attach(&state, &caller, MediaKind::Image, RecordRef::Intervention(id), payload).await?;
    Ok(Json(media))
}

#[utoipa::path(
    get,
    path = "/interventions/{id}/images",
    params(("id" = i64, Path, description = "Intervention ID")),
    responses(
        (status = 200, description = "Images", body = [Media]),
        (status = 404, description = "Not Found")
    )
)]
pub async fn list_intervention_images(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<Media>>> {
    Ok(Json(list(&state, MediaKind::Image, RecordRef::Intervention(id)).await?))
}

/// [Authenticated Route] Registers a video for an intervention.
#[utoipa::path(
    post,
    path = "/interventions/{id}/videos",
    params(("id" = i64, Path, description = "Intervention ID")),
    request_body = MediaInput,
    responses(
        (status = 200, description = "Attached", body = Media),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn add_intervention_video(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<MediaInput>,
) -> AppResult<Json<Media>> {
    let media = attach(&state, &caller, MediaKind::Video, RecordRef::Intervention(id), payload).await?;
    Ok(Json(media))
}

#[utoipa::path(
    get,
    path = "/interventions/{id}/videos",
    params(("id" = i64, Path, description = "Intervention ID")),
    responses(
        (status = 200, description = "Videos", body = [Media]),
        (status = 404, description = "Not Found")
    )
)]
pub async fn list_intervention_videos(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<Media>>> {
    Ok(Json(list(&state, MediaKind::Video, RecordRef::Intervention(id)).await?))
}

/// [Authenticated Route] Links an intervention to a red flag.
#[utoipa::path(
    post,
    path = "/interventions/{id}/tags",
    params(("id" = i64, Path, description = "Intervention ID")),
    request_body = TagRedFlagRequest,
    responses(
        (status = 200, description = "Linked", body = Tag),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Red flag or intervention not found")
    )
)]
pub async fn tag_intervention(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<TagRedFlagRequest>,
) -> AppResult<Json<Tag>> {
    let tag = link(&state, &caller, RecordRef::Intervention(id), payload.red_flag_id, id).await?;
    Ok(Json(tag))
}

#[utoipa::path(
    get,
    path = "/interventions/{id}/tags",
    params(("id" = i64, Path, description = "Intervention ID")),
    responses(
        (status = 200, description = "Tags", body = [Tag]),
        (status = 404, description = "Not Found")
    )
)]
pub async fn list_intervention_tags(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<Tag>>> {
    let parent = RecordRef::Intervention(id);
    parent_owner(&*state.repo, parent).await?;
    Ok(Json(state.repo.list_tags(parent).await?))
}
