use std::collections::HashMap;

use anyhow::anyhow;
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;

use crate::{config::Config, models::user::AuthenticatedUser, types::UserId};

const DEMO_IDENTIFIER: &str = "demo";
const DEMO_SECRET: &str = "demo";

/// Checks a login identifier and secret.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialVerifierTrait: Send + Sync {
    /// `Ok(None)` means the credentials were rejected.
    async fn verify(
        &self,
        identifier: &str,
        secret: &str,
    ) -> anyhow::Result<Option<AuthenticatedUser>>;
}

/// Verifier backed by a fixed list of argon2 hashes.
pub struct StaticCredentialVerifier {
    accounts: HashMap<String, String>,
}

impl StaticCredentialVerifier {
    pub fn new(accounts: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            accounts: accounts.into_iter().collect(),
        }
    }

    /// Accounts from `AUTH_USERS`; outside production an empty list falls back to `demo`/`demo`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        if !config.auth_users.is_empty() {
            return Ok(Self::new(config.auth_users.iter().map(|user| {
                (user.identifier.clone(), user.password_hash.clone())
            })));
        }
        if config.production_mode {
            return Err(anyhow!("AUTH_USERS must be set in production"));
        }
        tracing::warn!(
            identifier = DEMO_IDENTIFIER,
            "AUTH_USERS is empty; enabling the demo account"
        );
        let hash = hash_secret(DEMO_SECRET)?;
        Ok(Self::new([(DEMO_IDENTIFIER.to_string(), hash)]))
    }
}

#[async_trait]
impl CredentialVerifierTrait for StaticCredentialVerifier {
    async fn verify(
        &self,
        identifier: &str,
        secret: &str,
    ) -> anyhow::Result<Option<AuthenticatedUser>> {
        let Some(hash) = self.accounts.get(identifier).cloned() else {
            return Ok(None);
        };
        let secret = secret.to_owned();
        let matches = tokio::task::spawn_blocking(move || verify_secret(&secret, &hash)).await??;
        if !matches {
            return Ok(None);
        }
        Ok(Some(AuthenticatedUser {
            id: UserId::new(identifier)?,
            identifier: identifier.to_string(),
        }))
    }
}

pub fn hash_secret(secret: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash secret: {}", e))?;
    Ok(password_hash.to_string())
}

pub fn verify_secret(secret: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow!("Invalid password hash: {}", e))?;
    match Argon2::default().verify_password(secret.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("Password verification error: {}", e)),
    }
}
