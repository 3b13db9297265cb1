use anyhow::{anyhow, Context};
use chrono::Duration;
use std::env;

use crate::utils::cookies::SameSite;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SESSION_TTL_HOURS: i64 = 7 * 24;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_COOKIE_NAME: &str = "sid";
const DEFAULT_SESSION_PURGE_INTERVAL_SECS: u64 = 15 * 60;

/// A login account accepted by the built-in credential verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCredential {
    pub identifier: String,
    /// Argon2 PHC string.
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. `None` selects the in-memory backends.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub port: u16,
    pub session_ttl_hours: i64,
    /// Period of the background sweep of expired sessions.
    pub session_purge_interval_secs: u64,
    pub session_cookie_name: String,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    /// Explicit CORS allow list; empty mirrors the request origin.
    pub cors_allow_origins: Vec<String>,
    pub auth_users: Vec<UserCredential>,
    pub production_mode: bool,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let production_mode = var("PRODUCTION_MODE")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || var("NODE_ENV").as_deref() == Some("production");

        let database_url = var("DATABASE_URL");

        let database_max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value
                .parse()
                .with_context(|| format!("Invalid DATABASE_MAX_CONNECTIONS value: {}", value))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let port = match var("PORT") {
            Some(value) => value
                .parse()
                .with_context(|| format!("Invalid PORT value: {}", value))?,
            None => DEFAULT_PORT,
        };

        let session_ttl_hours = var("SESSION_TTL_HOURS")
            .and_then(|value| value.parse().ok())
            .filter(|hours: &i64| *hours > 0)
            .unwrap_or(DEFAULT_SESSION_TTL_HOURS);

        let session_purge_interval_secs = var("SESSION_PURGE_INTERVAL_SECONDS")
            .and_then(|value| value.parse().ok())
            .filter(|secs: &u64| *secs > 0)
            .unwrap_or(DEFAULT_SESSION_PURGE_INTERVAL_SECS);

        let session_cookie_name =
            var("SESSION_COOKIE_NAME").unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string());

        let cookie_secure = var("COOKIE_SECURE")
            .map(|value| parse_bool(&value))
            .unwrap_or(production_mode);

        let cookie_same_site = match var("COOKIE_SAME_SITE") {
            Some(value) => value.parse()?,
            None if production_mode => SameSite::None,
            None => SameSite::Lax,
        };
        if cookie_same_site == SameSite::None && !cookie_secure {
            return Err(anyhow!("COOKIE_SAME_SITE=None requires COOKIE_SECURE=true"));
        }

        let cors_allow_origins = var("CORS_ALLOW_ORIGINS")
            .or_else(|| var("CORS_ORIGIN"))
            .map(|value| {
                value
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let auth_users = match var("AUTH_USERS") {
            Some(value) => parse_auth_users(&value)?,
            None => Vec::new(),
        };

        Ok(Config {
            database_url,
            database_max_connections,
            port,
            session_ttl_hours,
            session_purge_interval_secs,
            session_cookie_name,
            cookie_secure,
            cookie_same_site,
            cors_allow_origins,
            auth_users,
            production_mode,
        })
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.session_ttl_hours)
    }

    pub fn session_purge_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.session_purge_interval_secs)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parses `identifier=hash` entries separated by `;`.
///
/// Argon2 PHC strings contain `=` and `,`, so only the first `=` of an entry splits it.
fn parse_auth_users(raw: &str) -> anyhow::Result<Vec<UserCredential>> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (identifier, hash) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("AUTH_USERS entry is missing '=': {}", entry))?;
            let identifier = identifier.trim();
            let hash = hash.trim();
            if identifier.is_empty() || hash.is_empty() {
                return Err(anyhow!("AUTH_USERS entry is incomplete: {}", entry));
            }
            Ok(UserCredential {
                identifier: identifier.to_string(),
                password_hash: hash.to_string(),
            })
        })
        .collect()
}
