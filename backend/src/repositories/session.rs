use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};

use crate::error::StorageError;
use crate::models::session::{SessionPayload, SessionRow};
use crate::types::SessionId;

/// Stores `payload`, replacing any payload already kept under the same identifier.
pub async fn upsert_session(pool: &PgPool, payload: &SessionPayload) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, identifier, attributes, created_at, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE
        SET user_id = EXCLUDED.user_id,
            identifier = EXCLUDED.identifier,
            attributes = EXCLUDED.attributes,
            created_at = EXCLUDED.created_at,
            expires_at = EXCLUDED.expires_at
        "#,
    )
    .bind(&payload.id)
    .bind(payload.user_id())
    .bind(payload.user.as_ref().map(|user| user.identifier.as_str()))
    .bind(Json(&payload.attributes))
    .bind(payload.created_at)
    .bind(payload.expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Returns the payload stored under `session_id` unless it has expired by `now`.
pub async fn find_session(
    pool: &PgPool,
    session_id: &SessionId,
    now: DateTime<Utc>,
) -> Result<Option<SessionPayload>, StorageError> {
    let row = sqlx::query_as::<_, SessionRow>(
        r#"
        SELECT id, user_id, identifier, attributes, created_at, expires_at
        FROM sessions
        WHERE id = $1 AND expires_at > $2
        "#,
    )
    .bind(session_id)
    .bind(now)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(SessionPayload::from))
}

/// Rewrites a live payload in place. Returns false when no live payload exists.
pub async fn update_session(
    pool: &PgPool,
    payload: &SessionPayload,
    now: DateTime<Utc>,
) -> Result<bool, StorageError> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET user_id = $2,
            identifier = $3,
            attributes = $4,
            expires_at = $5
        WHERE id = $1 AND expires_at > $6
        "#,
    )
    .bind(&payload.id)
    .bind(payload.user_id())
    .bind(payload.user.as_ref().map(|user| user.identifier.as_str()))
    .bind(Json(&payload.attributes))
    .bind(payload.expires_at)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_session(pool: &PgPool, session_id: &SessionId) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_expired_sessions(
    pool: &PgPool,
    now: DateTime<Utc>,
) -> Result<u64, StorageError> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
