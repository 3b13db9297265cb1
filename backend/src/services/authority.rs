//! The single-active-session authority.
//!
//! For every user the authority keeps at most one [`ActiveSessionRecord`] naming the only
//! session identifier allowed to act for that user. Logging in activates a session and thereby
//! supersedes the previous one; the request gate asks [`SessionAuthorityTrait::is_active`] on
//! every identity-trusting request.
//!
//! `activate` and `deactivate` are each a single atomic storage operation. Neither backend
//! exposes a state where a successful login leaves the user without an active session.

use std::collections::{hash_map::Entry, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::Instrument;

use crate::{
    error::StorageError,
    models::active_session::ActiveSessionRecord,
    repositories::active_session as active_session_repo,
    services::session_store::SessionStoreTrait,
    types::{SessionId, UserId},
};

#[async_trait]
pub trait SessionAuthorityTrait: Send + Sync {
    /// Makes `session_id` the canonical session of `user_id`.
    ///
    /// Returns the superseded session identifier when a different one was active. Destroying
    /// its payload is left to the caller and is not required for correctness.
    async fn activate(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
    ) -> Result<Option<SessionId>, StorageError>;

    /// True iff `session_id` is the canonical session of `user_id`.
    async fn is_active(&self, user_id: &UserId, session_id: &SessionId)
        -> Result<bool, StorageError>;

    /// Clears the record of `user_id`.
    ///
    /// With `Some(session_id)` the record is only removed while it still names that session,
    /// so a late logout cannot erase a newer login. With `None` the removal is unconditional.
    /// Returns whether a record was removed; a missing record is not an error.
    async fn deactivate(
        &self,
        user_id: &UserId,
        session_id: Option<&SessionId>,
    ) -> Result<bool, StorageError>;

    async fn find(&self, user_id: &UserId) -> Result<Option<ActiveSessionRecord>, StorageError>;

    /// Drops records whose session payload is gone from `store` or has expired.
    async fn purge_orphaned(&self, store: &dyn SessionStoreTrait) -> Result<u64, StorageError>;
}

pub struct PgSessionAuthority {
    pool: PgPool,
}

impl PgSessionAuthority {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionAuthorityTrait for PgSessionAuthority {
    async fn activate(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
    ) -> Result<Option<SessionId>, StorageError> {
        let span = tracing::debug_span!("authority_activate", %user_id);
        let previous =
            active_session_repo::upsert_active_session(&self.pool, user_id, session_id, Utc::now())
                .instrument(span)
                .await?;
        Ok(previous.filter(|previous| previous != session_id))
    }

    async fn is_active(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
    ) -> Result<bool, StorageError> {
        active_session_repo::is_active_session(&self.pool, user_id, session_id).await
    }

    async fn deactivate(
        &self,
        user_id: &UserId,
        session_id: Option<&SessionId>,
    ) -> Result<bool, StorageError> {
        match session_id {
            Some(session_id) => {
                active_session_repo::delete_active_session_if_current(
                    &self.pool, user_id, session_id,
                )
                .await
            }
            None => active_session_repo::delete_active_session_for_user(&self.pool, user_id).await,
        }
    }

    async fn find(&self, user_id: &UserId) -> Result<Option<ActiveSessionRecord>, StorageError> {
        active_session_repo::find_active_session(&self.pool, user_id).await
    }

    /// Payloads live in the same database, so the check runs as one statement.
    async fn purge_orphaned(&self, _store: &dyn SessionStoreTrait) -> Result<u64, StorageError> {
        active_session_repo::delete_orphaned_active_sessions(&self.pool, Utc::now()).await
    }
}

/// Process-local authority. Every write holds the map's write lock for its whole
/// read-modify-write, which gives the same per-user atomicity as the Postgres backend.
#[derive(Default)]
pub struct MemorySessionAuthority {
    records: RwLock<HashMap<UserId, ActiveSessionRecord>>,
}

impl MemorySessionAuthority {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionAuthorityTrait for MemorySessionAuthority {
    async fn activate(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
    ) -> Result<Option<SessionId>, StorageError> {
        let mut records = self.records.write().await;
        let record = ActiveSessionRecord::new(user_id.clone(), session_id.clone());
        let previous = records.insert(user_id.clone(), record);
        Ok(previous
            .map(|previous| previous.session_id)
            .filter(|previous| previous != session_id))
    }

    async fn is_active(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
    ) -> Result<bool, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .get(user_id)
            .map(|record| record.matches(session_id))
            .unwrap_or(false))
    }

    async fn deactivate(
        &self,
        user_id: &UserId,
        session_id: Option<&SessionId>,
    ) -> Result<bool, StorageError> {
        let mut records = self.records.write().await;
        match records.entry(user_id.clone()) {
            Entry::Occupied(entry) => {
                let clear = session_id
                    .map(|session_id| entry.get().matches(session_id))
                    .unwrap_or(true);
                if clear {
                    entry.remove();
                }
                Ok(clear)
            }
            Entry::Vacant(_) => Ok(false),
        }
    }

    async fn find(&self, user_id: &UserId) -> Result<Option<ActiveSessionRecord>, StorageError> {
        Ok(self.records.read().await.get(user_id).cloned())
    }

    async fn purge_orphaned(&self, store: &dyn SessionStoreTrait) -> Result<u64, StorageError> {
        let snapshot: Vec<ActiveSessionRecord> =
            self.records.read().await.values().cloned().collect();

        let mut orphaned = Vec::new();
        for record in snapshot {
            if store.get(&record.session_id).await?.is_none() {
                orphaned.push(record);
            }
        }

        // A record re-activated since the snapshot names a new session and is kept.
        let mut records = self.records.write().await;
        let mut purged = 0;
        for record in orphaned {
            if let Entry::Occupied(entry) = records.entry(record.user_id) {
                if entry.get().matches(&record.session_id) {
                    entry.remove();
                    purged += 1;
                }
            }
        }
        Ok(purged)
    }
}
