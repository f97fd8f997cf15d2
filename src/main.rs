use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use oylkka_backend::api::{self, AppState};
use oylkka_backend::config::AppConfig;
use oylkka_backend::database::application_repository::ApplicationRepository;
use oylkka_backend::database::init_pool_from_config;
use oylkka_backend::database::pending_application_repository::PendingApplicationRepository;
use oylkka_backend::database::repository::{ApplicationLedger, ReservationStore, TokenCache};
use oylkka_backend::database::token_cache_repository::TokenCacheRepository;
use oylkka_backend::health::HealthChecker;
use oylkka_backend::logging::init_tracing;
use oylkka_backend::payments::provider::CheckoutProvider;
use oylkka_backend::payments::providers::bkash::BkashProvider;
use oylkka_backend::services::cleanup::CleanupSweeper;
use oylkka_backend::services::reconciler::CallbackReconciler;
use oylkka_backend::storage::{HttpImageStore, ImageStore};

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env must be loaded before the subscriber reads its filter settings.
    dotenv().ok();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Oylkka backend service"
    );

    info!(
        host = %config.server.host,
        port = config.server.port,
        "Server configuration loaded"
    );

    info!("Initializing database connection pool...");
    let db_pool = init_pool_from_config(&config.database).await.map_err(|e| {
        error!("Failed to initialize database pool: {}", e);
        anyhow::anyhow!(e)
    })?;
    info!("Database connection pool initialized");

    let reservations: Arc<dyn ReservationStore> =
        Arc::new(PendingApplicationRepository::new(db_pool.clone()));
    let ledger: Arc<dyn ApplicationLedger> = Arc::new(ApplicationRepository::new(
        db_pool.clone(),
        config.payment.roll_base,
    ));
    let token_cache: Arc<dyn TokenCache> = Arc::new(TokenCacheRepository::new(db_pool.clone()));

    let gateway: Arc<dyn CheckoutProvider> =
        Arc::new(BkashProvider::new(config.bkash.clone(), token_cache).map_err(|e| {
            error!("Failed to initialize payment gateway: {}", e);
            anyhow::anyhow!(e)
        })?);
    info!(provider = gateway.name(), "Payment gateway initialized");

    let images: Arc<dyn ImageStore> =
        Arc::new(HttpImageStore::new(&config.storage).map_err(|e| {
            error!("Failed to initialize image store: {}", e);
            anyhow::anyhow!(e)
        })?);

    let reconciler = Arc::new(CallbackReconciler::new(
        gateway,
        reservations.clone(),
        ledger,
        images.clone(),
        config.payment.application_fee,
    ));
    let sweeper = Arc::new(CleanupSweeper::new(reservations, images));
    let health_checker = HealthChecker::new(db_pool.clone());

    let app = api::router(AppState {
        reconciler,
        sweeper,
        health_checker,
        site_url: config.payment.site_url.clone(),
        cleanup_threshold_minutes: config.payment.cleanup_threshold_minutes,
    })
    .layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id()),
    );

    info!("Routes configured");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(address = %addr, "Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
