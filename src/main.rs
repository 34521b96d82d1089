mod config;
mod db;
mod routes;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // A missing .env is normal outside local development.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::PortalConfig::from_env().expect("invalid configuration");

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");

    tokio::fs::create_dir_all(&config.document_storage_dir)
        .await
        .expect("document storage dir not writable");

    if config.resend.is_some() {
        tracing::info!("resend email delivery configured");
    } else {
        tracing::warn!("RESEND_API_KEY/RESEND_FROM not set: emails will be logged as failed");
    }

    let port = config.port;
    let sweep_interval_secs = config.sweep_interval_secs;
    let state = state::AppState::from_config(pool, config);

    // Periodic cleanup of expired sessions and login codes.
    let _sweeper = services::session::spawn_session_sweeper(state.pool.clone(), sweep_interval_secs);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "portal listening");
    axum::serve(listener, app).await.expect("server failed");
}
