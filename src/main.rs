//! Blur authentication server
//!
//! Loads configuration from the environment, connects PostgreSQL (and Redis
//! when `REDIS_URL` is set), runs migrations and serves the `/v1/auth` API.

use blur_auth::config::ServerConfig;
use blur_auth::store::run_migrations;
use blur_auth::{
    create_routes, AuthConfig, AuthService, LogMailer, Mailer, MemoryCache, PgAccountRepository,
    RedisCache, SmtpMailer, TtlCache,
};

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{prelude::*, EnvFilter};

fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,blur_auth=debug,sqlx=warn"))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;

    let server = ServerConfig::from_env()?;
    let config = AuthConfig::from_env()?;

    let db = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&server.database_url)
        .await?;
    run_migrations(&db).await?;

    let cache: Arc<dyn TtlCache> = match &server.redis_url {
        Some(url) => Arc::new(RedisCache::connect(url).await?),
        None => {
            tracing::warn!("REDIS_URL not set, using in-process cache");
            let cache = Arc::new(MemoryCache::new());
            cache.clone().spawn_sweeper(Duration::from_secs(60));
            cache
        }
    };

    let mailer: Arc<dyn Mailer> = match &server.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
        None => {
            tracing::warn!("SMTP_HOST not set, verification codes will only be logged");
            Arc::new(LogMailer)
        }
    };

    let auth = Arc::new(AuthService::new(
        config,
        Arc::new(PgAccountRepository::new(db)),
        cache,
        mailer,
    )?);

    let app = create_routes(auth)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&server.bind_addr).await?;
    tracing::info!(addr = %server.bind_addr, "Blur auth server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
