use std::str::FromStr;

use anyhow::anyhow;
use axum::http::{header, HeaderMap};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{config::Config, types::SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl FromStr for SameSite {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lax" => Ok(SameSite::Lax),
            "strict" => Ok(SameSite::Strict),
            "none" => Ok(SameSite::None),
            other => Err(anyhow!("Invalid COOKIE_SAME_SITE value: {}", other)),
        }
    }
}

pub const SESSION_COOKIE_PATH: &str = "/";

/// Issues, clears and reads the session cookie.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    name: String,
    max_age: Duration,
    secure: bool,
    same_site: SameSite,
}

impl SessionCookie {
    pub fn from_config(config: &Config) -> Self {
        Self {
            name: config.session_cookie_name.clone(),
            max_age: config.session_ttl(),
            secure: config.cookie_secure,
            same_site: config.cookie_same_site,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Set-Cookie` value binding the client to `session_id`.
    pub fn issue(&self, session_id: &SessionId) -> String {
        self.build(session_id.as_str(), self.max_age.num_seconds())
    }

    /// `Set-Cookie` value that makes the client drop the session cookie.
    pub fn clear(&self) -> String {
        self.build("", 0)
    }

    /// Session cookie value carried by a request, if any.
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|raw| extract_cookie_value(raw, &self.name))
            .filter(|value| !value.is_empty())
    }

    fn build(&self, value: &str, max_age_secs: i64) -> String {
        let mut cookie = format!(
            "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite={}",
            self.name,
            value,
            SESSION_COOKIE_PATH,
            max_age_secs.max(0),
            same_site_value(self.same_site)
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

pub fn extract_cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key.trim() == name {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}

fn same_site_value(same_site: SameSite) -> &'static str {
    match same_site {
        SameSite::Lax => "Lax",
        SameSite::Strict => "Strict",
        SameSite::None => "None",
    }
}
