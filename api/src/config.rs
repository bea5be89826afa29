use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub cors_origin: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    /// Only staff accounts may post notices.
    pub staff_only_notices: bool,
}

impl Config {
    /// Reads settings from the environment, falling back to development defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: try_load("DATABASE_URL", "noticeboard.db")?,
            bind_addr: try_load("BIND_ADDR", "0.0.0.0:8080")?,
            jwt_secret: try_load("JWT_SECRET", "dev-secret-change-me")?,
            cors_origin: try_load("CORS_ORIGIN", "http://localhost:3000")?,
            upload_dir: try_load("UPLOAD_DIR", "static/uploads")?,
            max_upload_bytes: try_load("MAX_UPLOAD_BYTES", "10485760")?,
            access_token_ttl_minutes: try_load("ACCESS_TOKEN_TTL_MINUTES", "30")?,
            refresh_token_ttl_days: try_load("REFRESH_TOKEN_TTL_DAYS", "7")?,
            staff_only_notices: try_load("STAFF_ONLY_NOTICES", "false")?,
        })
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        message: e.to_string(),
    })
}
