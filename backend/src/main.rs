use std::net::SocketAddr;

use sessiongate_backend::{app, config::Config, services::spawn_session_sweeper, state::AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn mask_database_url(url: Option<&str>) -> String {
    let Some(url) = url else {
        return "<memory>".into();
    };
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sessiongate_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        database_url = %mask_database_url(config.database_url.as_deref()),
        port = config.port,
        session_ttl_hours = config.session_ttl_hours,
        session_purge_interval_secs = config.session_purge_interval_secs,
        session_cookie_name = %config.session_cookie_name,
        cookie_secure = config.cookie_secure,
        cookie_same_site = ?config.cookie_same_site,
        cors_allow_origins = ?config.cors_allow_origins,
        auth_users = config.auth_users.len(),
        production_mode = config.production_mode,
        "Loaded configuration from environment/.env"
    );

    let state = AppState::connect(config.clone()).await?;
    let _sweeper = spawn_session_sweeper(
        state.store.clone(),
        state.authority.clone(),
        config.session_purge_interval(),
    );
    let app = app::router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
