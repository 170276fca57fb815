// src/config.rs

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use dotenvy::dotenv;
use url::Url;

/// Number of questions drawn for one attempt.
pub const EXAM_QUESTION_COUNT: i64 = 25;

/// Length of an attempt in seconds (8 minutes).
pub const EXAM_DURATION_SECS: u32 = 8 * 60;

/// Minimum percentage for a pass.
pub const PASSING_SCORE_PERCENTAGE: f64 = 90.0;

/// Attempts after which a retake requires feedback.
pub const FEEDBACK_REQUIRED_AFTER: i64 = 3;

/// Ratings below this also go to the operator channel.
pub const LOW_RATING_THRESHOLD: i16 = 4;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without it the server keeps data in memory.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    /// Base of the public bucket holding question pictures.
    pub media_base_url: Option<Url>,
    /// Upper bound for a single store call.
    pub store_timeout: Duration,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .expect("BIND_ADDR must be a socket address");

        let media_base_url = env::var("MEDIA_BASE_URL")
            .ok()
            .map(|raw| parse_media_base(&raw).expect("MEDIA_BASE_URL must be a valid URL"));

        let store_timeout = env::var("STORE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(5));

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            media_base_url,
            store_timeout,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        }
    }
}

/// Parses the media base, forcing a trailing slash so `Url::join` appends
/// object keys instead of replacing the last path segment.
pub fn parse_media_base(raw: &str) -> Result<Url, url::ParseError> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("{}/", trimmed))
    }
}
