//! 일봉 동기화 endpoint.
//!
//! 세 엔드포인트 모두 본문을 생략할 수 있습니다.

use ashare_collector::{modules, DailyHistoryReport, DailyIncrementReport, RetryReport};
use axum::{extract::State, routing::post, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use super::validate_ts_codes;
use crate::error::{ApiResponse, ApiResult};
use crate::extract::OptionalJson;
use crate::state::AppState;

// ==================== 요청 타입 ====================

/// 이력 동기화 요청.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct HistorySyncRequest {
    /// 대상 종목 (생략 시 상장 폐지, 거래 정지를 포함한 전체 종목)
    #[validate(custom(function = "validate_ts_codes"))]
    #[schema(example = json!(["000001.SZ", "600000.SH"]))]
    pub ts_codes: Option<Vec<String>>,
}

/// 증분 동기화 요청.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct IncrementSyncRequest {
    /// 거래일 (생략 시 어제)
    pub trade_date: Option<NaiveDate>,
}

/// 실패 재시도 요청.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct RetryFailuresRequest {
    /// 재시도 상한 (생략 시 설정값)
    #[validate(range(min = 1, message = "max_retries must be >= 1"))]
    pub max_retries: Option<i32>,
}

// ==================== 응답 타입 ====================

/// 이력 동기화 결과.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DailyHistoryResponse {
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub skipped_count: usize,
    pub synced_days: usize,
    pub duration_ms: u64,
}

impl From<DailyHistoryReport> for DailyHistoryResponse {
    fn from(r: DailyHistoryReport) -> Self {
        Self {
            total: r.total,
            success_count: r.success_count,
            failure_count: r.failure_count,
            skipped_count: r.skipped_count,
            synced_days: r.synced_days,
            duration_ms: r.duration_ms,
        }
    }
}

/// 증분 동기화 결과.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DailyIncrementResponse {
    pub trade_date: NaiveDate,
    pub synced_count: usize,
    pub duration_ms: u64,
}

impl From<DailyIncrementReport> for DailyIncrementResponse {
    fn from(r: DailyIncrementReport) -> Self {
        Self {
            trade_date: r.trade_date,
            synced_count: r.synced_count,
            duration_ms: r.duration_ms,
        }
    }
}

/// 실패 재시도 결과.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryFailuresResponse {
    pub total: usize,
    pub resolved_count: usize,
    pub still_failed_count: usize,
    pub duration_ms: u64,
}

impl From<RetryReport> for RetryFailuresResponse {
    fn from(r: RetryReport) -> Self {
        Self {
            total: r.total,
            resolved_count: r.resolved_count,
            still_failed_count: r.still_failed_count,
            duration_ms: r.duration_ms,
        }
    }
}

// ==================== 핸들러 ====================

/// 일봉 이력 동기화.
///
/// 종목별로 마지막 저장일 다음 날부터 오늘까지 가져옵니다. 실패한 종목은 실패 원장에 기록됩니다.
#[utoipa::path(
    post,
    path = "/data-engineering/stock-daily/sync/history",
    tag = "stock-daily",
    request_body(content = HistorySyncRequest, description = "생략 가능"),
    responses(
        (status = 200, description = "동기화 완료", body = DailyHistoryResponse),
        (status = 400, description = "잘못된 종목 코드"),
        (status = 422, description = "JSON 해석 실패")
    )
)]
pub async fn sync_history(
    State(state): State<Arc<AppState>>,
    OptionalJson(req): OptionalJson<HistorySyncRequest>,
) -> ApiResult<DailyHistoryResponse> {
    let report = modules::sync_daily_history(&state.ctx, req.ts_codes.as_deref()).await?;
    Ok(ApiResponse::success_with_message(
        report.into(),
        "History sync completed",
    ))
}

/// 일봉 증분 동기화 (단일 거래일).
#[utoipa::path(
    post,
    path = "/data-engineering/stock-daily/sync/increment",
    tag = "stock-daily",
    request_body(content = IncrementSyncRequest, description = "생략 가능"),
    responses(
        (status = 200, description = "동기화 완료", body = DailyIncrementResponse),
        (status = 422, description = "JSON 해석 실패")
    )
)]
pub async fn sync_increment(
    State(state): State<Arc<AppState>>,
    OptionalJson(req): OptionalJson<IncrementSyncRequest>,
) -> ApiResult<DailyIncrementResponse> {
    let report = modules::sync_daily_increment(&state.ctx, req.trade_date).await?;
    Ok(ApiResponse::success_with_message(
        report.into(),
        "Increment sync completed",
    ))
}

/// 실패 원장 재시도.
#[utoipa::path(
    post,
    path = "/data-engineering/stock-daily/sync/retry-failures",
    tag = "stock-daily",
    request_body(content = RetryFailuresRequest, description = "생략 가능"),
    responses(
        (status = 200, description = "재시도 완료", body = RetryFailuresResponse),
        (status = 400, description = "max_retries < 1")
    )
)]
pub async fn retry_failures(
    State(state): State<Arc<AppState>>,
    OptionalJson(req): OptionalJson<RetryFailuresRequest>,
) -> ApiResult<RetryFailuresResponse> {
    let max_retries = req
        .max_retries
        .unwrap_or(state.ctx.settings.default_max_retries);
    let report = modules::retry_daily_failures(&state.ctx, max_retries).await?;
    Ok(ApiResponse::success_with_message(
        report.into(),
        "Retry failures completed",
    ))
}

pub fn stock_daily_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sync/history", post(sync_history))
        .route("/sync/increment", post(sync_increment))
        .route("/sync/retry-failures", post(retry_failures))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_request_rejects_zero() {
        let req = RetryFailuresRequest {
            max_retries: Some(0),
        };
        assert!(req.validate().is_err());
        assert!(RetryFailuresRequest::default().validate().is_ok());
    }

    #[test]
    fn test_history_request_rejects_malformed_code() {
        let req = HistorySyncRequest {
            ts_codes: Some(vec!["000001.SZ".into(), "000001".into()]),
        };
        assert!(req.validate().is_err());
    }
}
