//! 재무 지표 동기화 endpoint.

use ashare_collector::{modules, FinanceSyncReport};
use axum::{
    extract::{Path, State},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use super::validate_ts_codes;
use crate::error::{ApiResponse, ApiResult};
use crate::extract::OptionalJson;
use crate::state::AppState;

/// 재무 지표 동기화 요청.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct FinanceSyncRequest {
    /// 대상 종목 (생략 시 전체 또는 상장 종목)
    #[validate(custom(function = "validate_ts_codes"))]
    pub ts_codes: Option<Vec<String>>,
}

/// 재무 지표 동기화 결과.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FinanceSyncResponse {
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// 저장한 보고기간 행 수
    pub synced_records: usize,
    pub duration_ms: u64,
}

impl From<FinanceSyncReport> for FinanceSyncResponse {
    fn from(r: FinanceSyncReport) -> Self {
        Self {
            total: r.total,
            success_count: r.success_count,
            failure_count: r.failure_count,
            synced_records: r.synced_records,
            duration_ms: r.duration_ms,
        }
    }
}

/// 전체 이력 동기화 (모든 종목).
#[utoipa::path(
    post,
    path = "/data-engineering/finance-indicator/sync/full",
    tag = "finance-indicator",
    request_body(content = FinanceSyncRequest, description = "생략 가능"),
    responses(
        (status = 200, description = "동기화 완료", body = FinanceSyncResponse),
        (status = 400, description = "잘못된 종목 코드")
    )
)]
pub async fn sync_full(
    State(state): State<Arc<AppState>>,
    OptionalJson(req): OptionalJson<FinanceSyncRequest>,
) -> ApiResult<FinanceSyncResponse> {
    let report = modules::sync_finance_full(&state.ctx, req.ts_codes.as_deref()).await?;
    Ok(ApiResponse::success(report.into()))
}

/// 증분 동기화 (상장 종목, 마지막 보고기간 이후).
#[utoipa::path(
    post,
    path = "/data-engineering/finance-indicator/sync/increment",
    tag = "finance-indicator",
    request_body(content = FinanceSyncRequest, description = "생략 가능"),
    responses(
        (status = 200, description = "동기화 완료", body = FinanceSyncResponse),
        (status = 400, description = "잘못된 종목 코드")
    )
)]
pub async fn sync_increment(
    State(state): State<Arc<AppState>>,
    OptionalJson(req): OptionalJson<FinanceSyncRequest>,
) -> ApiResult<FinanceSyncResponse> {
    let report = modules::sync_finance_increment(&state.ctx, req.ts_codes.as_deref()).await?;
    Ok(ApiResponse::success(report.into()))
}

/// 단일 종목 전체 동기화.
#[utoipa::path(
    post,
    path = "/data-engineering/finance-indicator/sync/by-stock/{ts_code}",
    tag = "finance-indicator",
    params(("ts_code" = String, Path, description = "종목 코드 (예: 600000.SH)")),
    responses(
        (status = 200, description = "동기화 완료", body = FinanceSyncResponse),
        (status = 400, description = "형식이 잘못된 종목 코드"),
        (status = 404, description = "종목 없음")
    )
)]
pub async fn sync_by_stock(
    State(state): State<Arc<AppState>>,
    Path(ts_code): Path<String>,
) -> ApiResult<FinanceSyncResponse> {
    let report = modules::sync_finance_by_stock(&state.ctx, &ts_code).await?;
    Ok(ApiResponse::success(report.into()))
}

pub fn finance_indicator_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sync/full", post(sync_full))
        .route("/sync/increment", post(sync_increment))
        .route("/sync/by-stock/{ts_code}", post(sync_by_stock))
}
