//! 종목 기본 정보 endpoint.

use ashare_collector::{modules, StockBasicSyncReport};
use axum::{extract::State, routing::post, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::{ApiResponse, ApiResult};
use crate::state::AppState;

/// 종목 기본 정보 동기화 결과.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StockBasicSyncResponse {
    /// 저장한 종목 수
    pub synced_count: usize,
    pub duration_ms: u64,
}

impl From<StockBasicSyncReport> for StockBasicSyncResponse {
    fn from(r: StockBasicSyncReport) -> Self {
        Self {
            synced_count: r.synced_count,
            duration_ms: r.duration_ms,
        }
    }
}

/// Tushare 종목 기본 정보 전체 동기화.
#[utoipa::path(
    post,
    path = "/data-engineering/stock-basic/sync",
    tag = "stock-basic",
    responses(
        (status = 200, description = "동기화 완료", body = StockBasicSyncResponse),
        (status = 500, description = "Tushare 조회 또는 저장 실패")
    )
)]
pub async fn sync_stock_basic(
    State(state): State<Arc<AppState>>,
) -> ApiResult<StockBasicSyncResponse> {
    let report = modules::sync_stock_basic(&state.ctx).await?;
    Ok(ApiResponse::success(report.into()))
}

pub fn stock_basic_router() -> Router<Arc<AppState>> {
    Router::new().route("/sync", post(sync_stock_basic))
}
