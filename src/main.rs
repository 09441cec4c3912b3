use anyhow::Result;

use buildplan_backend::{app, config, db, logging, services};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        "Starting BuildPlan backend"
    );

    // Create database pool and bring the schema up to date
    let pool = db::create_pool(&settings).await?;
    db::run_migrations(&pool).await?;

    // Create Redis cache
    let cache =
        services::RedisCache::new(&settings.redis_url, settings.redis_cache_ttl_seconds).await?;

    // Background progress sweep over ongoing projects
    services::spawn_progress_sweep(
        pool.clone(),
        settings.progress_sweep_interval_hours,
        settings.progress_sweep_on_startup,
    );
    tracing::info!(
        interval_hours = settings.progress_sweep_interval_hours,
        on_startup = settings.progress_sweep_on_startup,
        "Progress sweep scheduled"
    );

    // Create application state
    let state = app::AppState::new(pool, settings.clone(), cache);

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
