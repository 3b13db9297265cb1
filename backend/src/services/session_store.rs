use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::Instrument;

use crate::{
    error::StorageError, models::session::SessionPayload, repositories::session as session_repo,
    types::SessionId,
};

/// Keyed storage of session payloads.
///
/// Expired payloads are never returned by `get`; they linger until `purge_expired` runs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStoreTrait: Send + Sync {
    /// Stores `payload` under its identifier, replacing whatever was there.
    async fn create(&self, payload: &SessionPayload) -> Result<(), StorageError>;
    async fn get(&self, session_id: &SessionId) -> Result<Option<SessionPayload>, StorageError>;
    /// Rewrites a live payload. Returns false when none exists.
    async fn update(&self, payload: &SessionPayload) -> Result<bool, StorageError>;
    /// Returns whether a payload was removed.
    async fn destroy(&self, session_id: &SessionId) -> Result<bool, StorageError>;
    async fn purge_expired(&self) -> Result<u64, StorageError>;
}

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStoreTrait for PgSessionStore {
    async fn create(&self, payload: &SessionPayload) -> Result<(), StorageError> {
        let span = tracing::debug_span!("session_store_create", session = %payload.id.short());
        session_repo::upsert_session(&self.pool, payload)
            .instrument(span)
            .await
    }

    async fn get(&self, session_id: &SessionId) -> Result<Option<SessionPayload>, StorageError> {
        session_repo::find_session(&self.pool, session_id, Utc::now()).await
    }

    async fn update(&self, payload: &SessionPayload) -> Result<bool, StorageError> {
        session_repo::update_session(&self.pool, payload, Utc::now()).await
    }

    async fn destroy(&self, session_id: &SessionId) -> Result<bool, StorageError> {
        let span = tracing::debug_span!("session_store_destroy", session = %session_id.short());
        session_repo::delete_session(&self.pool, session_id)
            .instrument(span)
            .await
    }

    async fn purge_expired(&self) -> Result<u64, StorageError> {
        session_repo::delete_expired_sessions(&self.pool, Utc::now()).await
    }
}

/// Process-local store for single-instance deployments and tests.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SessionPayload>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of payloads held, expired ones included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStoreTrait for MemorySessionStore {
    async fn create(&self, payload: &SessionPayload) -> Result<(), StorageError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(payload.id.clone(), payload.clone());
        Ok(())
    }

    async fn get(&self, session_id: &SessionId) -> Result<Option<SessionPayload>, StorageError> {
        let sessions = self.sessions.read().await;
        let now = Utc::now();
        Ok(sessions
            .get(session_id)
            .filter(|payload| !payload.is_expired_at(now))
            .cloned())
    }

    async fn update(&self, payload: &SessionPayload) -> Result<bool, StorageError> {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        match sessions.get_mut(&payload.id) {
            Some(existing) if !existing.is_expired_at(now) => {
                *existing = payload.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn destroy(&self, session_id: &SessionId) -> Result<bool, StorageError> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(session_id).is_some())
    }

    async fn purge_expired(&self) -> Result<u64, StorageError> {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, payload| !payload.is_expired_at(now));
        let purged = (before - sessions.len()) as u64;
        if purged > 0 {
            tracing::debug!(purged, "Purged expired sessions");
        }
        Ok(purged)
    }
}
