//! A주 데이터 엔지니어링 REST API.
//!
//! 동기화 트리거와 개념 조회 엔드포인트를 `/data-engineering` 아래에 제공합니다.

pub mod error;
pub mod extract;
pub mod openapi;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResponse, ApiResult};
pub use state::AppState;

#[cfg(any(test, feature = "test-utils"))]
pub use state::create_test_state;

use axum::{http::HeaderValue, Router};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// CORS 레이어 생성. origin 목록이 비어 있으면 모든 origin을 허용합니다.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let allow_origin = if parsed.is_empty() {
        tracing::warn!("CORS origin이 설정되지 않아 모든 origin을 허용합니다");
        AllowOrigin::any()
    } else {
        tracing::info!(count = parsed.len(), "CORS 허용 origin 설정");
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .max_age(std::time::Duration::from_secs(3600))
}

/// 라우터, 문서, 미들웨어를 조립한 애플리케이션.
///
/// 동기화 요청은 오래 걸리므로 요청 타임아웃 레이어는 두지 않습니다.
pub fn build_app(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    routes::create_api_router()
        .merge(openapi::swagger_ui_router())
        .with_state(state)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}
