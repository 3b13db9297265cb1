//! Session payloads owned by the session store.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{types::Json, FromRow};

use crate::models::user::AuthenticatedUser;
use crate::types::{SessionId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A session as seen by request handlers.
pub struct SessionPayload {
    pub id: SessionId,
    /// Identity attached at login; `None` for anonymous sessions.
    pub user: Option<AuthenticatedUser>,
    /// Free-form attributes carried alongside the identity.
    #[serde(default)]
    pub attributes: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionPayload {
    pub fn new(id: SessionId, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id,
            user: None,
            attributes: Map::new(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn with_user(mut self, user: AuthenticatedUser) -> Self {
        self.user = Some(user);
        self
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user.as_ref().map(|user| &user.id)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, FromRow)]
/// Row layout of the `sessions` table.
pub struct SessionRow {
    pub id: SessionId,
    pub user_id: Option<UserId>,
    pub identifier: Option<String>,
    pub attributes: Json<Map<String, Value>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<SessionRow> for SessionPayload {
    fn from(row: SessionRow) -> Self {
        let user = row.user_id.map(|id| AuthenticatedUser {
            identifier: row.identifier.unwrap_or_else(|| id.to_string()),
            id,
        });
        Self {
            id: row.id,
            user,
            attributes: row.attributes.0,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}
