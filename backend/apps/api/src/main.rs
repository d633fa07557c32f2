//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request errors are mapped inside `portcheck`.

mod config;

use axum::Router;
use config::AppConfig;
use platform::captcha::RecaptchaVerifier;
use platform::rate_limit::{InMemoryRateLimitStore, spawn_sweeper};
use portcheck::application::check_port::CheckPortUseCase;
use portcheck::{PortCheckState, RotatingFileLog, TcpPortProber, portcheck_router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "api=info,portcheck=info,platform=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let pc = &config.portcheck;

    tracing::info!(
        max_requests = pc.rate_limit.max_requests,
        window_secs = pc.rate_limit.window.as_secs(),
        probe_timeout_secs = pc.probe_timeout.as_secs(),
        log_file = %pc.log_file_path.display(),
        max_log_size_mb = pc.max_log_size_mb,
        trusted_header = pc.trusted_header().unwrap_or("-"),
        "Configuration loaded"
    );

    // Rate limiter with periodic eviction of expired windows
    let rate_limiter = Arc::new(InMemoryRateLimitStore::new(pc.rate_limit.clone()));
    let sweeper = spawn_sweeper(rate_limiter.clone(), pc.rate_limit.window);

    let audit_log = RotatingFileLog::open(&pc.log_file_path, pc.max_log_size_bytes())?;
    let captcha = RecaptchaVerifier::new(config.recaptcha_secret.clone())?;

    let use_case = CheckPortUseCase::new(
        rate_limiter,
        Arc::new(captcha),
        Arc::new(TcpPortProber::new(pc.probe_timeout)),
        Arc::new(audit_log),
    );
    let state = PortCheckState::new(use_case, pc.trusted_header());

    // Build router
    let app = Router::new()
        .route_service("/", ServeFile::new(config.static_dir.join("index.html")))
        .merge(portcheck_router(state))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.listen_addr;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.stop().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
