use std::sync::Arc;

use crate::{
    config::Config,
    db::connection::{create_pool, run_migrations},
    services::{
        CredentialVerifierTrait, MemorySessionAuthority, MemorySessionStore, PgSessionAuthority,
        PgSessionStore, SessionAuthorityTrait, SessionStoreTrait, StaticCredentialVerifier,
    },
    utils::cookies::SessionCookie,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn SessionStoreTrait>,
    pub authority: Arc<dyn SessionAuthorityTrait>,
    pub credentials: Arc<dyn CredentialVerifierTrait>,
    pub cookie: SessionCookie,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn SessionStoreTrait>,
        authority: Arc<dyn SessionAuthorityTrait>,
        credentials: Arc<dyn CredentialVerifierTrait>,
    ) -> Self {
        let cookie = SessionCookie::from_config(&config);
        Self {
            config,
            store,
            authority,
            credentials,
            cookie,
        }
    }

    /// State backed by process-local stores.
    pub fn in_memory(config: Config) -> anyhow::Result<Self> {
        let credentials = Arc::new(StaticCredentialVerifier::from_config(&config)?);
        Ok(Self::new(
            config,
            Arc::new(MemorySessionStore::new()),
            Arc::new(MemorySessionAuthority::new()),
            credentials,
        ))
    }

    /// Postgres-backed state when `DATABASE_URL` is set, in-memory otherwise.
    pub async fn connect(config: Config) -> anyhow::Result<Self> {
        let Some(database_url) = config.database_url.clone() else {
            tracing::warn!("DATABASE_URL is not set; sessions are kept in memory");
            return Self::in_memory(config);
        };

        let pool = create_pool(&database_url, config.database_max_connections).await?;
        run_migrations(&pool).await?;

        let credentials = Arc::new(StaticCredentialVerifier::from_config(&config)?);
        Ok(Self::new(
            config,
            Arc::new(PgSessionStore::new(pool.clone())),
            Arc::new(PgSessionAuthority::new(pool)),
            credentials,
        ))
    }
}
