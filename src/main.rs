use std::net::SocketAddr;

use cona_backend::{
    build_router,
    config::{get_config, init_config},
    database::pool::{create_pool, run_migrations},
    logging::init_tracing,
    services::{maintenance, realtime},
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(config.log_format);

    let pool = create_pool().await?;
    run_migrations(&pool).await?;
    tokio::fs::create_dir_all(&config.uploads_dir).await?;

    let app_state = AppState::new(pool.clone());

    tokio::spawn(realtime::run_listener(pool, app_state.events.clone()));

    match maintenance::run_once(&app_state.job_service).await {
        Ok(report) => info!(
            deactivated = report.deactivated,
            reconciled = report.reconciled,
            "startup maintenance finished"
        ),
        Err(e) => tracing::warn!(error = ?e, "startup maintenance failed"),
    }
    let _scheduler =
        maintenance::start(app_state.job_service.clone(), &config.maintenance_cron).await?;

    let app = build_router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
