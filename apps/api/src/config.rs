use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

/// Which bucket `DELETE /api/favorites` empties.
///
/// `Identity` clears whatever store the caller's identity resolves to.
/// `Session` always clears the guest bucket, even for signed-in callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearScope {
    Identity,
    Session,
}

impl FromStr for ClearScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identity" => Ok(ClearScope::Identity),
            "session" => Ok(ClearScope::Session),
            other => Err(anyhow!(
                "FAVORITES_CLEAR_SCOPE must be 'identity' or 'session', got '{other}'"
            )),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Guest sessions fall back to process memory when unset.
    pub redis_url: Option<String>,
    /// Base URL of the AI service including the `/api` prefix,
    /// e.g. `http://localhost:5001/api`.
    pub ai_service_url: String,
    pub ai_service_timeout_secs: Option<u64>,
    pub history_limit: usize,
    pub saved_search_limit: usize,
    pub session_ttl_secs: u64,
    pub favorites_clear_scope: ClearScope,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: std::env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
            ai_service_url: require_env("AI_SERVICE_URL")?
                .trim_end_matches('/')
                .to_string(),
            ai_service_timeout_secs: match std::env::var("AI_SERVICE_TIMEOUT_SECS") {
                Ok(raw) => Some(
                    raw.parse::<u64>()
                        .context("AI_SERVICE_TIMEOUT_SECS must be a whole number of seconds")?,
                ),
                Err(_) => None,
            },
            history_limit: env_or("HISTORY_LIMIT", 10)?,
            saved_search_limit: env_or("SAVED_SEARCH_LIMIT", 10)?,
            session_ttl_secs: env_or("SESSION_TTL_SECS", 86_400)?,
            favorites_clear_scope: env_or("FAVORITES_CLEAR_SCOPE", ClearScope::Identity)?,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow!("{key} has an invalid value '{raw}': {e}"))
}
