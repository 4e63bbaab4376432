use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use cur8tr::auth::session;
use cur8tr::config::{Cli, Config};
use cur8tr::db;
use cur8tr::routes;
use cur8tr::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;
    tracing::info!("Environment: {}", config.environment.as_str());

    // Initialize database
    let pool = db::create_pool(&config.db_path(), &config.pool_profile())?;
    db::run_migrations(&pool)?;

    if config.seed_admin {
        db::seed_admin(&pool, config.auth.bcrypt_cost)?;
    }

    let purged = session::purge_expired(&*pool.get()?)?;
    if purged > 0 {
        tracing::info!("Purged {} expired sessions", purged);
    }

    let state = AppState::new(pool, config.clone());
    let app = routes::router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
