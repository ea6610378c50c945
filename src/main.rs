use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};

use inventory_order_tracker as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    info!(environment = %cfg.environment, "Starting inventory-order-tracker");

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;
    let db_arc = Arc::new(db_pool);

    // Migrations run in the background so the listener is up (and /health
    // answers) while the database may still be starting.
    if cfg.auto_migrate {
        let pool = db_arc.clone();
        let attempts = cfg.migration_max_attempts;
        let delay = cfg.migration_retry_delay();
        tokio::spawn(async move {
            if let Err(e) = api::db::run_migrations_with_retry(&pool, attempts, delay).await {
                error!(error = %e, "Database migrations did not complete; requests touching the schema will fail");
            }
        });
    } else {
        info!("Automatic migrations disabled; run the migration binary before serving traffic");
    }

    let app_state = api::AppState::new(db_arc, cfg.clone());
    let app = api::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", cfg.host, cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("inventory-order-tracker listening on http://{}", addr);
    if cfg.is_development() {
        info!("Swagger UI available at http://{}/swagger-ui", addr);
    }

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received; draining connections");
}
