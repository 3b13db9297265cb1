//! Model for the per-user active session claim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::{SessionId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
/// Database representation of the single session allowed to act for a user.
pub struct ActiveSessionRecord {
    /// User the claim belongs to. At most one record exists per user.
    pub user_id: UserId,
    /// The only session identifier honored for `user_id`.
    pub session_id: SessionId,
    /// Timestamp of the last activation that wrote this record.
    pub updated_at: DateTime<Utc>,
}

impl ActiveSessionRecord {
    pub fn new(user_id: UserId, session_id: SessionId) -> Self {
        Self {
            user_id,
            session_id,
            updated_at: Utc::now(),
        }
    }

    /// Returns true when `session_id` is the canonical session of this record.
    pub fn matches(&self, session_id: &SessionId) -> bool {
        &self.session_id == session_id
    }
}
