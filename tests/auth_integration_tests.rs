use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use redflag_api::{
    AppConfig, AppState, InMemoryRepository,
    auth::{self, AuthUser, Claims},
    credentials,
    models::{Role, UserCreate},
    repository::Effects,
};
use std::sync::Arc;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    }
}

fn signup(username: &str, role: Option<&str>) -> UserCreate {
    UserCreate {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password: "correct horse".to_string(),
        role: role.map(str::to_string),
    }
}

/// State with one registered user, "alice". Returns her id alongside.
async fn create_app_state() -> (AppState, i64) {
    let repo = Arc::new(InMemoryRepository::new());
    let alice = credentials::register(&*repo, signup("alice", None))
        .await
        .unwrap();
    (AppState::new(repo, test_config()), alice.id)
}

/// Signs arbitrary claims with the test secret.
fn sign(sub: &str, uid: i64, iat: i64, exp: i64) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        uid,
        iat: iat as usize,
        exp: exp as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

fn request_parts(token: Option<&str>) -> Parts {
    let mut builder = Request::builder().method(Method::GET).uri("/users/me");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let (parts, _) = builder.body(axum::body::Body::empty()).unwrap().into_parts();
    parts
}

async fn extract(state: &AppState, token: Option<&str>) -> Result<AuthUser, StatusCode> {
    let mut parts = request_parts(token);
    AuthUser::from_request_parts(&mut parts, state)
        .await
        .map_err(|e| e.status_code())
}

// --- Token issuer/verifier ---

#[tokio::test]
async fn test_auth_success_with_issued_token() {
    let (state, alice_id) = create_app_state().await;
    let token = auth::issue_token(&state.config, alice_id, "alice").unwrap();

    assert_eq!(token.token_type, "bearer");

    let user = extract(&state, Some(&token.access_token)).await.unwrap();
    assert_eq!(user.id, alice_id);
    assert_eq!(user.username, "alice");
    assert_eq!(user.role, Role::User);
}

#[test]
fn test_issued_token_embeds_subject_and_window() {
    let config = test_config();
    let before = Utc::now().timestamp() as usize;
    let token = auth::issue_token(&config, 7, "alice").unwrap();

    let claims = auth::decode_token(TEST_JWT_SECRET, &token.access_token).unwrap();
    assert_eq!(claims.sub, "alice");
    assert_eq!(claims.uid, 7);
    assert!(claims.iat >= before);
    assert_eq!(claims.exp - claims.iat, 30 * 60);
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let (state, _) = create_app_state().await;
    assert_eq!(extract(&state, None).await.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_expired_token() {
    let (state, alice_id) = create_app_state().await;
    let now = Utc::now().timestamp();
    let token = sign("alice", alice_id, now - 7200, now - 3600);

    assert_eq!(
        extract(&state, Some(&token)).await.unwrap_err(),
        StatusCode::UNAUTHORIZED
    );
}

#[test]
fn test_expired_token_reports_expiry() {
    let now = Utc::now().timestamp();
    let token = sign("alice", 1, now - 120, now - 60);

    let err = auth::decode_token(TEST_JWT_SECRET, &token).unwrap_err();
    assert_eq!(err.to_string(), "Token has expired");
}

#[tokio::test]
async fn test_auth_failure_with_tampered_signature() {
    let (state, alice_id) = create_app_state().await;
    let token = auth::issue_token(&state.config, alice_id, "alice").unwrap().access_token;

    // Flip the first character of the signature segment.
    let signature_start = token.rfind('.').unwrap() + 1;
    let replacement = if token[signature_start..].starts_with('A') { "B" } else { "A" };
    let mut tampered = token.clone();
    tampered.replace_range(signature_start..signature_start + 1, replacement);

    assert_eq!(
        extract(&state, Some(&tampered)).await.unwrap_err(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_auth_failure_with_foreign_secret() {
    let (state, alice_id) = create_app_state().await;
    let foreign = AppConfig {
        jwt_secret: "someone-elses-secret".to_string(),
        ..AppConfig::default()
    };
    let token = auth::issue_token(&foreign, alice_id, "alice").unwrap().access_token;

    assert_eq!(
        extract(&state, Some(&token)).await.unwrap_err(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_auth_failure_with_unknown_subject() {
    let (state, _) = create_app_state().await;
    let token = auth::issue_token(&state.config, 9999, "ghost").unwrap().access_token;

    assert_eq!(
        extract(&state, Some(&token)).await.unwrap_err(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_auth_failure_when_uid_names_someone_else() {
    let (state, alice_id) = create_app_state().await;
    let bob = credentials::register(&*state.repo, signup("bob", None)).await.unwrap();

    // Signed correctly, but the id belongs to bob while the subject says alice.
    let now = Utc::now().timestamp();
    let token = sign("alice", bob.id, now, now + 600);
    assert_eq!(
        extract(&state, Some(&token)).await.unwrap_err(),
        StatusCode::UNAUTHORIZED
    );

    let token = sign("alice", alice_id, now, now + 600);
    assert_eq!(extract(&state, Some(&token)).await.unwrap().id, alice_id);
}

#[tokio::test]
async fn test_renamed_account_token_does_not_pass_to_new_holder_of_name() {
    let (state, alice_id) = create_app_state().await;
    let old_token = auth::issue_token(&state.config, alice_id, "alice").unwrap().access_token;

    let mut alice = state.repo.get_user(alice_id).await.unwrap().unwrap();
    alice.username = "alice2".to_string();
    state.repo.update_user(&alice, Effects::none()).await.unwrap();

    let newcomer = credentials::register(&*state.repo, signup("alice", None)).await.unwrap();
    assert_ne!(newcomer.id, alice_id);

    assert_eq!(
        extract(&state, Some(&old_token)).await.unwrap_err(),
        StatusCode::UNAUTHORIZED
    );

    // Fresh tokens for both accounts resolve to their own ids.
    let renamed = auth::issue_token(&state.config, alice_id, "alice2").unwrap().access_token;
    assert_eq!(extract(&state, Some(&renamed)).await.unwrap().id, alice_id);
    let fresh = auth::issue_token(&state.config, newcomer.id, "alice").unwrap().access_token;
    assert_eq!(extract(&state, Some(&fresh)).await.unwrap().id, newcomer.id);
}

#[tokio::test]
async fn test_auth_failure_with_malformed_header() {
    let (state, _) = create_app_state().await;
    let mut parts = request_parts(None);
    parts
        .headers
        .insert(header::AUTHORIZATION, "Basic YWxpY2U6cHc=".parse().unwrap());

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert_eq!(result.unwrap_err().status_code(), StatusCode::UNAUTHORIZED);
}

// --- Credential store ---

#[tokio::test]
async fn test_register_then_verify() {
    let repo = InMemoryRepository::new();
    let user = credentials::register(&repo, signup("bob", None)).await.unwrap();

    assert_ne!(user.password_hash, "correct horse");
    assert!(user.password_hash.starts_with("$argon2"));

    let verified = credentials::verify(&repo, "bob", "correct horse").await.unwrap();
    assert_eq!(verified.id, user.id);
}

#[tokio::test]
async fn test_verify_rejects_wrong_password_and_unknown_user() {
    let repo = InMemoryRepository::new();
    credentials::register(&repo, signup("bob", None)).await.unwrap();

    let wrong = credentials::verify(&repo, "bob", "battery staple").await.unwrap_err();
    assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);

    let unknown = credentials::verify(&repo, "carol", "correct horse").await.unwrap_err();
    assert_eq!(unknown.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.to_string(), unknown.to_string());
}

#[tokio::test]
async fn test_register_conflicts_on_username_and_email() {
    let repo = InMemoryRepository::new();
    credentials::register(&repo, signup("bob", None)).await.unwrap();

    let same_name = credentials::register(&repo, signup("bob", None)).await.unwrap_err();
    assert_eq!(same_name.status_code(), StatusCode::BAD_REQUEST);

    let mut same_email = signup("robert", None);
    same_email.email = "bob@example.com".to_string();
    let err = credentials::register(&repo, same_email).await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_clamps_unknown_roles() {
    let repo = InMemoryRepository::new();

    let admin = credentials::register(&repo, signup("root", Some("admin"))).await.unwrap();
    assert_eq!(admin.role, Role::Admin);

    let clamped = credentials::register(&repo, signup("mallory", Some("superuser")))
        .await
        .unwrap();
    assert_eq!(clamped.role, Role::User);
}

#[test]
fn test_password_hashes_are_salted() {
    let first = credentials::hash_password("same").unwrap();
    let second = credentials::hash_password("same").unwrap();

    assert_ne!(first, second);
    assert!(credentials::verify_password("same", &first).unwrap());
    assert!(!credentials::verify_password("other", &second).unwrap());
}
