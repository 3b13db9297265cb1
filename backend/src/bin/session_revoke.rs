//! Forced logout: `session_revoke <user_id>...` clears each user's active session record and
//! destroys the session payload it named.

use std::sync::Arc;

use anyhow::anyhow;
use sessiongate_backend::{
    config::Config,
    db::connection::{create_pool, run_migrations},
    services::{PgSessionAuthority, PgSessionStore, SessionAuthorityTrait, SessionStoreTrait},
    types::UserId,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_revoke=info,sessiongate_backend=info".into()),
        )
        .init();

    let user_ids = std::env::args()
        .skip(1)
        .map(UserId::new)
        .collect::<Result<Vec<_>, _>>()?;
    if user_ids.is_empty() {
        return Err(anyhow!("usage: session_revoke <user_id>..."));
    }

    let config = Config::load()?;
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow!("DATABASE_URL is required to revoke sessions"))?;
    let pool = create_pool(database_url, config.database_max_connections).await?;
    run_migrations(&pool).await?;

    let authority: Arc<dyn SessionAuthorityTrait> = Arc::new(PgSessionAuthority::new(pool.clone()));
    let store: Arc<dyn SessionStoreTrait> = Arc::new(PgSessionStore::new(pool));

    for user_id in user_ids {
        let record = authority.find(&user_id).await?;
        authority.deactivate(&user_id, None).await?;
        match record {
            Some(record) => {
                store.destroy(&record.session_id).await?;
                tracing::info!(%user_id, session = %record.session_id.short(), "Revoked session");
            }
            None => tracing::info!(%user_id, "No active session to revoke"),
        }
    }

    Ok(())
}
