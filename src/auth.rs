use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{Role, TokenResponse, User},
    repository::RepositoryState,
};

/// Claims
///
/// Payload of an access token. The token carries no role, so role changes take effect
/// on the next request. A token only resolves while `uid` still carries the username in
/// `sub`; renaming an account retires its outstanding tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the username the token was issued to.
    pub sub: String,
    /// Id of the account the token was issued to. Usernames can be reused, ids cannot.
    pub uid: i64,
    /// Expiration Time (exp): absolute unix timestamp after which the token is refused.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

/// issue_token
///
/// Signs an HS256 token for account `user_id` (currently named `username`) that expires
/// `token_ttl_minutes` from now. There is no refresh and no revocation.
pub fn issue_token(config: &AppConfig, user_id: i64, username: &str) -> AppResult<TokenResponse> {
    let now = Utc::now();
    let expires = now + Duration::minutes(config.token_ttl_minutes);
    let claims = Claims {
        sub: username.to_string(),
        uid: user_id,
        iat: now.timestamp() as usize,
        exp: expires.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("token encoding failed: {e}")))?;

    Ok(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    })
}

/// decode_token
///
/// Checks the signature and expiry of `token` and returns its claims.
pub fn decode_token(secret: &str, token: &str) -> AppResult<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    // The expiry window is exact.
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::unauthorized("Token has expired"),
        _ => AppError::unauthorized("Could not validate credentials"),
    })
}

/// Pulls the token out of an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> AppResult<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("Not authenticated"))
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument. The process is:
/// 1. Token extraction from the bearer header.
/// 2. Signature and expiry validation against the configured secret.
/// 3. Account lookup by `uid`; the account must still be named `sub`.
///
/// Rejection: `AppError::Unauthorized` (401 with a `WWW-Authenticate` challenge).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let token = bearer_token(parts)?;
        let claims = decode_token(&config.jwt_secret, token)?;

        let user = repo
            .get_user(claims.uid)
            .await?
            .filter(|user| user.username == claims.sub)
            .ok_or_else(|| {
                tracing::warn!(subject = %claims.sub, uid = claims.uid, "token subject no longer resolves");
                AppError::unauthorized("Could not validate credentials")
            })?;

        Ok(AuthUser::from(user))
    }
}
