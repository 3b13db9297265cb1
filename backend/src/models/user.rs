//! Authentication payloads and the user identity attached to sessions.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Identity produced by credential verification and stored on a session payload.
pub struct AuthenticatedUser {
    /// Stable user key used by the session authority.
    pub id: UserId,
    /// Login name the user authenticated with.
    pub identifier: String,
}

#[derive(Debug, Deserialize, Validate)]
/// Body of `POST /api/auth/login`.
pub struct LoginRequest {
    #[serde(alias = "email", alias = "username")]
    #[validate(length(min = 1, max = 256))]
    pub identifier: String,
    #[serde(alias = "password")]
    #[validate(length(min = 1, max = 1024))]
    pub secret: String,
}

#[derive(Debug, Serialize)]
/// Successful login or identity lookup.
pub struct AuthResponse {
    pub ok: bool,
    pub user: AuthenticatedUser,
}

impl AuthResponse {
    pub fn new(user: AuthenticatedUser) -> Self {
        Self { ok: true, user }
    }
}
