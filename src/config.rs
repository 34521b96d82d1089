//! Portal configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_SESSION_TTL_HOURS: i32 = 168;
pub const DEFAULT_DOCUMENT_STORAGE_DIR: &str = "./data/documents";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 900;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("invalid {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Resend credentials. Both must be present for email delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResendConfig {
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub cookie_secure: bool,
    pub session_ttl_hours: i32,
    pub document_storage_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub base_url: String,
    pub sweep_interval_secs: u64,
    pub resend: Option<ResendConfig>,
}

impl PortalConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `DATABASE_URL`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `COOKIE_SECURE`: default false
    /// - `SESSION_TTL_HOURS`: default 168
    /// - `DOCUMENT_STORAGE_DIR`: default `./data/documents`
    /// - `MAX_UPLOAD_BYTES`: default 25 MiB
    /// - `PORTAL_BASE_URL`: default `http://localhost:3000`
    /// - `SESSION_SWEEP_INTERVAL_SECS`: default 900
    /// - `RESEND_API_KEY` + `RESEND_FROM`: email disabled unless both are set
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or `PORT` does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value: raw })?,
            Err(_) => DEFAULT_PORT,
        };

        let resend = match (non_empty_var("RESEND_API_KEY"), non_empty_var("RESEND_FROM")) {
            (Some(api_key), Some(from)) => Some(ResendConfig { api_key, from }),
            _ => None,
        };

        Ok(Self {
            database_url,
            port,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(false),
            session_ttl_hours: env_parse("SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS).max(1),
            document_storage_dir: non_empty_var("DOCUMENT_STORAGE_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_DOCUMENT_STORAGE_DIR), PathBuf::from),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            base_url: non_empty_var("PORTAL_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned())
                .trim_end_matches('/')
                .to_owned(),
            sweep_interval_secs: env_parse("SESSION_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS).max(1),
            resend,
        })
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
