use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::StorageError;
use crate::models::active_session::ActiveSessionRecord;
use crate::repositories::transaction::{begin_transaction, commit_transaction, lock_key};
use crate::types::{SessionId, UserId};

/// Makes `session_id` the active session of `user_id`, returning the session it replaced.
///
/// The lookup of the previous value and the upsert run in one transaction holding a per-user
/// advisory lock, so concurrent activations for the same user are applied one after another
/// and the last to commit wins.
pub async fn upsert_active_session(
    pool: &PgPool,
    user_id: &UserId,
    session_id: &SessionId,
    updated_at: DateTime<Utc>,
) -> Result<Option<SessionId>, StorageError> {
    let mut tx = begin_transaction(pool).await?;
    lock_key(&mut tx, &format!("active_session:{}", user_id)).await?;

    let previous = sqlx::query_scalar::<_, SessionId>(
        "SELECT session_id FROM active_sessions WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO active_sessions (user_id, session_id, updated_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id) DO UPDATE
        SET session_id = EXCLUDED.session_id,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(user_id)
    .bind(session_id)
    .bind(updated_at)
    .execute(&mut *tx)
    .await?;

    commit_transaction(tx).await?;
    Ok(previous)
}

pub async fn find_active_session(
    pool: &PgPool,
    user_id: &UserId,
) -> Result<Option<ActiveSessionRecord>, StorageError> {
    let record = sqlx::query_as::<_, ActiveSessionRecord>(
        r#"
        SELECT user_id, session_id, updated_at
        FROM active_sessions
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(record)
}

pub async fn is_active_session(
    pool: &PgPool,
    user_id: &UserId,
    session_id: &SessionId,
) -> Result<bool, StorageError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM active_sessions WHERE user_id = $1 AND session_id = $2)",
    )
    .bind(user_id)
    .bind(session_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Deletes the record of `user_id` only while it still names `session_id`.
pub async fn delete_active_session_if_current(
    pool: &PgPool,
    user_id: &UserId,
    session_id: &SessionId,
) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM active_sessions WHERE user_id = $1 AND session_id = $2")
        .bind(user_id)
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_active_session_for_user(
    pool: &PgPool,
    user_id: &UserId,
) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM active_sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Removes records whose session payload is gone or expired.
pub async fn delete_orphaned_active_sessions(
    pool: &PgPool,
    now: DateTime<Utc>,
) -> Result<u64, StorageError> {
    let result = sqlx::query(
        r#"
        DELETE FROM active_sessions a
        WHERE NOT EXISTS (
            SELECT 1 FROM sessions s
            WHERE s.id = a.session_id AND s.expires_at > $1
        )
        "#,
    )
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
