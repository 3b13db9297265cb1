use anyhow::anyhow;
use chrono::Utc;
use sessiongate_backend::{
    config::Config,
    db::connection::{create_pool, run_migrations},
    repositories::{active_session, session as session_repo},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_cleanup=info,sessiongate_backend=info".into()),
        )
        .init();

    let config = Config::load()?;
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow!("DATABASE_URL is required for session cleanup"))?;
    let pool = create_pool(database_url, config.database_max_connections).await?;
    run_migrations(&pool).await?;

    let now = Utc::now();
    let expired = session_repo::delete_expired_sessions(&pool, now).await?;
    if expired > 0 {
        tracing::info!("Deleted {} expired sessions", expired);
    }

    let orphaned = active_session::delete_orphaned_active_sessions(&pool, now).await?;
    if orphaned > 0 {
        tracing::info!("Deleted {} active session records without a live session", orphaned);
    }

    sqlx::query("VACUUM (ANALYZE) sessions")
        .execute(&pool)
        .await?;
    sqlx::query("VACUUM (ANALYZE) active_sessions")
        .execute(&pool)
        .await?;

    Ok(())
}
