use std::env;

/// Fallback signing secret for local development only.
const LOCAL_JWT_SECRET: &str = "local-development-secret-change-me";

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// immutable afterwards; handlers and the `AuthUser` extractor pull it out of the
/// shared state through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker.
    pub env: Env,
    // Postgres connection string. Only optional in local mode, where the in-memory
    // registry takes over.
    pub db_url: Option<String>,
    pub db_max_connections: u32,
    // HS256 secret used to sign and verify access tokens.
    pub jwt_secret: String,
    // Fixed lifetime of an access token.
    pub token_ttl_minutes: i64,
    pub bind_addr: String,
    pub port: u16,
}

/// Env
///
/// Switches between developer conveniences (pretty logs, optional database) and the
/// strict production setup (JSON logs, every secret mandatory).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Non-panicking configuration for tests.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            db_max_connections: 5,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            token_ttl_minutes: 30,
            bind_addr: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables (after `.env` has been
    /// applied by `main`).
    ///
    /// # Panics
    /// Panics if a variable required in production (`DATABASE_URL`, `JWT_SECRET`) is
    /// missing, so the service never starts half-configured.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let (db_url, jwt_secret) = match env {
            Env::Production => (
                Some(env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod")),
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production."),
            ),
            Env::Local => (
                env::var("DATABASE_URL").ok(),
                env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
            ),
        };

        Self {
            env,
            db_url,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5),
            jwt_secret,
            token_ttl_minutes: parse_var("ACCESS_TOKEN_EXPIRE_MINUTES", 30),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 8000),
        }
    }

    /// The socket address the HTTP server listens on.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

// Unset or unparsable values fall back to the default.
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
