//! Transaction helpers shared by the session repositories.

use crate::error::StorageError;
use sqlx::postgres::PgTransaction;
use sqlx::PgPool;

/// Begin a new database transaction.
///
/// Dropping the returned handle without calling [`commit_transaction`] rolls it back.
pub async fn begin_transaction(db: &PgPool) -> Result<PgTransaction<'static>, StorageError> {
    Ok(db.begin().await?)
}

/// Commit a transaction.
pub async fn commit_transaction(tx: PgTransaction<'_>) -> Result<(), StorageError> {
    Ok(tx.commit().await?)
}

/// Take a transaction-scoped advisory lock keyed by `key`.
///
/// Concurrent transactions locking the same key queue behind each other until the holder
/// commits or rolls back, which serializes read-modify-write sequences on rows that may not
/// exist yet.
pub async fn lock_key(tx: &mut PgTransaction<'_>, key: &str) -> Result<(), StorageError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(key)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
