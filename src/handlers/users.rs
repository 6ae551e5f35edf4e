use axum::{
    Form, Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    auth::{self, AuthUser},
    credentials,
    error::{AppError, AppResult},
    handlers::ValidQuery,
    models::{LoginRequest, Page, Role, TokenResponse, UserChanges, UserCreate, UserResponse, UserUpdate},
    policy,
    repository::Effects,
};

/// register_user
///
/// [Public Route] Creates a new identity. The password is hashed before it reaches the
/// registry, and a role other than "user"/"admin" is silently downgraded to "user".
#[utoipa::path(
    post,
    path = "/users/",
    request_body = UserCreate,
    responses(
        (status = 200, description = "Registered", body = UserResponse),
        (status = 400, description = "Username or email already registered")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<UserCreate>,
) -> AppResult<Json<UserResponse>> {
    let user = credentials::register(&*state.repo, payload).await?;
    Ok(Json(user.into()))
}

/// login
///
/// [Public Route] Exchanges a JSON username/password pair for a bearer token.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    issue_for(&state, payload).await
}

/// login_form
///
/// [Public Route] Same as `login`, for OAuth2 password-flow clients that post
/// `application/x-www-form-urlencoded`.
#[utoipa::path(
    post,
    path = "/token",
    request_body(content = LoginRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login_form(
    State(state): State<AppState>,
    Form(payload): Form<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    issue_for(&state, payload).await
}

async fn issue_for(state: &AppState, login: LoginRequest) -> AppResult<Json<TokenResponse>> {
    let user = credentials::verify(&*state.repo, &login.username, &login.password).await?;
    let token = auth::issue_token(&state.config, user.id, &user.username)?;
    tracing::info!(user_id = user.id, "access token issued");
    Ok(Json(token))
}

/// get_me
///
/// [Authenticated Route] The caller's own public profile.
#[utoipa::path(
    get,
    path = "/users/me",
    responses((status = 200, description = "Profile", body = UserResponse))
)]
pub async fn get_me(
    caller: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .repo
        .get_user(caller.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(user.into()))
}

/// list_users
///
/// [Public Route] Public fields of every user, `skip`/`limit` paginated.
#[utoipa::path(
    get,
    path = "/users/",
    params(Page),
    responses((status = 200, description = "Users", body = [UserResponse]))
)]
pub async fn list_users(
    State(state): State<AppState>,
    ValidQuery(page): ValidQuery<Page>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = state.repo.list_users(page).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// get_user
///
/// [Public Route] Public fields of one user.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(user.into()))
}

/// update_user
///
/// [Authenticated Route] Changes a user's identity fields.
///
/// *Authorization*: users may edit themselves; admins may edit anyone. Changing a role
/// is an admin-only operation and is always audited.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Updated", body = UserResponse),
        (status = 400, description = "Username or email already registered"),
        (status = 403, description = "Not yourself and not an admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UserUpdate>,
) -> AppResult<Json<UserResponse>> {
    let mut user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let access = policy::require_owner_or_admin(&caller, user.id)?;

    let role = payload
        .role
        .as_deref()
        .map(|requested| Role::from_requested(Some(requested)))
        .filter(|role| *role != user.role);
    if role.is_some() {
        policy::require_admin(&caller)?;
    }

    let password_hash = payload
        .password
        .as_deref()
        .map(credentials::hash_password)
        .transpose()?;

    let audit = match role {
        Some(new_role) => Some(policy::admin_audit(&caller, format!("user.role:{}", new_role.as_str()))),
        None => access.audit(&caller, "user.update"),
    };

    user.apply(UserChanges {
        username: payload.username,
        email: payload.email,
        password_hash,
        role,
    });

    let saved = state
        .repo
        .update_user(&user, Effects::none().audited(audit))
        .await?;
    Ok(Json(saved.into()))
}
