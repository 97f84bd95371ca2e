use std::error::Error;
use std::net::SocketAddr;

use eas_server::{config::Config, migrator, routes, state::AppState, worker};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    eas_server::telemetry::init_telemetry("eas-server")?;

    let config = Config::from_env()?;

    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    let db = Database::connect(&config.database_url).await?;

    if config.run_migrations {
        migrator::Migrator::up(&db, None).await?;
        tracing::info!("Migrations applied");
    }

    eas_server::metrics::init_metrics(&db).await;

    let port = config.port;
    let sync_interval = config.profile_sync_interval;
    let (state, profile_changes) = AppState::from_config(db, config)?;

    // Startup pass, interval pass and change feed run for the life of the process
    let _sync_tasks = worker::spawn_profile_sync(state.mirror.clone(), sync_interval, profile_changes);

    let app = routes::with_metrics(routes::app(state), prometheus_layer, metric_handle);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    eas_server::telemetry::shutdown_telemetry();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
