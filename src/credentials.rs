use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::{
    error::{AppError, AppResult},
    models::{Role, User, UserCreate},
    repository::{NewUser, Repository},
};

/// Hashes a password into a self-describing PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// register
///
/// Stores a new identity. The requested role is clamped to the known set and only the
/// password hash is persisted.
///
/// Fails with `Conflict` when the username or email is already taken.
pub async fn register(repo: &dyn Repository, request: UserCreate) -> AppResult<User> {
    let role = Role::from_requested(request.role.as_deref());
    let password_hash = hash_password(&request.password)?;

    let user = repo
        .create_user(NewUser {
            username: request.username,
            email: request.email,
            password_hash,
            role,
        })
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, role = role.as_str(), "user registered");
    Ok(user)
}

/// verify
///
/// Checks a username/password pair. Unknown users and wrong passwords fail the same way.
pub async fn verify(repo: &dyn Repository, username: &str, password: &str) -> AppResult<User> {
    let invalid = || AppError::unauthorized("Incorrect username or password");

    let Some(user) = repo.find_user_by_username(username).await? else {
        tracing::warn!(%username, "login attempt for unknown user");
        return Err(invalid());
    };

    if !verify_password(password, &user.password_hash)? {
        tracing::warn!(%username, "login attempt with wrong password");
        return Err(invalid());
    }

    Ok(user)
}
