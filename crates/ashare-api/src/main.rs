//! A-share 데이터 엔지니어링 API 서버.

use ashare_api::{build_app, AppState};
use ashare_collector::SyncContext;
use ashare_core::{init_logging, AppConfig, LogConfig};
use ashare_data::Database;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config_path =
        std::env::var("ASHARE_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    let config = AppConfig::load(&config_path)?;

    init_logging(LogConfig::from_settings(&config.logging)).map_err(|e| e.to_string())?;

    info!(version = env!("CARGO_PKG_VERSION"), "A-share Data Engineering API 시작");

    let pool = Database::connect(&config.database).await?.into_pool();
    let ctx = SyncContext::from_config(&config, pool.clone())?;
    let state = Arc::new(AppState::new(ctx));

    let app = build_app(state, &config.server.cors_origins);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "서버 리스닝 시작");
    info!("Swagger UI: http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("서버 종료");

    Ok(())
}

/// Ctrl-C 또는 SIGTERM 대기.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C 핸들러 설치 실패");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM 핸들러 설치 실패");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Ctrl+C 수신, graceful shutdown 시작");
        }
        _ = terminate => {
            warn!("SIGTERM 수신, graceful shutdown 시작");
        }
    }
}
