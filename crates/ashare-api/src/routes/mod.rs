//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/data-engineering/stock-basic` - 종목 기본 정보 동기화
//! - `/data-engineering/concepts` - 개념 섹터 동기화/조회
//! - `/data-engineering/stock-daily` - 일봉 이력/증분/재시도
//! - `/data-engineering/finance-indicator` - 재무 지표 동기화

pub mod concepts;
pub mod finance_indicator;
pub mod health;
pub mod stock_basic;
pub mod stock_daily;

pub use concepts::{
    concepts_router, ConceptResponse, ConceptStockResponse, ConceptSyncRequest,
    ConceptSyncResponse,
};
pub use finance_indicator::{finance_indicator_router, FinanceSyncRequest, FinanceSyncResponse};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use stock_basic::{stock_basic_router, StockBasicSyncResponse};
pub use stock_daily::{
    stock_daily_router, DailyHistoryResponse, DailyIncrementResponse, HistorySyncRequest,
    IncrementSyncRequest, RetryFailuresRequest, RetryFailuresResponse,
};

use ashare_core::is_ts_code;
use axum::Router;
use std::borrow::Cow;
use std::sync::Arc;
use validator::ValidationError;

use crate::state::AppState;

/// 종목 코드 목록 검증 (`000001.SZ` 형식).
pub(crate) fn validate_ts_codes(codes: &[String]) -> Result<(), ValidationError> {
    match codes.iter().find(|code| !is_ts_code(code.trim())) {
        Some(bad) => {
            let mut err = ValidationError::new("ts_code");
            err.message = Some(Cow::Owned(format!("Invalid ts_code: {}", bad)));
            Err(err)
        }
        None => Ok(()),
    }
}

/// 전체 API 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/health", health_router())
        .nest("/data-engineering/stock-basic", stock_basic_router())
        .nest("/data-engineering/concepts", concepts_router())
        .nest("/data-engineering/stock-daily", stock_daily_router())
        .nest("/data-engineering/finance-indicator", finance_indicator_router())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ts_codes() {
        assert!(validate_ts_codes(&["000001.SZ".into(), "600000.SH".into()]).is_ok());
        let err = validate_ts_codes(&["600000".into()]).unwrap_err();
        assert_eq!(err.message.as_deref(), Some("Invalid ts_code: 600000"));
    }
}
