//! 개념 섹터 endpoint.
//!
//! - `POST /data-engineering/concepts/sync` 개념 동기화 (AKShare)
//! - `GET /data-engineering/concepts?source=AKSHARE` 개념 목록
//! - `GET /data-engineering/concepts/{id}/stocks` 구성 종목 목록

use ashare_collector::{modules, ConceptSyncReport};
use ashare_core::{ApplyMode, Concept, ConceptStock, DataSource};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::extract::OptionalJson;
use crate::state::AppState;

// ==================== 요청/응답 타입 ====================

/// 개념 동기화 요청 (본문 생략 가능).
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct ConceptSyncRequest {
    /// true면 전체 변경을 하나의 트랜잭션으로 반영
    pub atomic: bool,
}

/// 개념 동기화 결과.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConceptSyncResponse {
    pub total_concepts: usize,
    pub new_concepts: usize,
    pub modified_concepts: usize,
    pub deleted_concepts: usize,
    pub total_stocks: usize,
    pub new_stocks: usize,
    pub modified_stocks: usize,
    pub deleted_stocks: usize,
    pub failed_concepts: usize,
    pub duration_ms: u64,
}

impl From<ConceptSyncReport> for ConceptSyncResponse {
    fn from(r: ConceptSyncReport) -> Self {
        Self {
            total_concepts: r.total_concepts,
            new_concepts: r.new_concepts,
            modified_concepts: r.modified_concepts,
            deleted_concepts: r.deleted_concepts,
            total_stocks: r.total_stocks,
            new_stocks: r.new_stocks,
            modified_stocks: r.modified_stocks,
            deleted_stocks: r.deleted_stocks,
            failed_concepts: r.failed_concepts,
            duration_ms: r.duration_ms,
        }
    }
}

/// 개념 목록 조회 파라미터.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConceptListQuery {
    /// 데이터 출처 (기본값: AKSHARE)
    pub source: Option<String>,
}

/// 개념 항목.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConceptResponse {
    pub id: Option<i64>,
    /// 데이터 출처 ("AKSHARE" | "TUSHARE")
    pub source: String,
    pub third_code: String,
    pub name: String,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl From<Concept> for ConceptResponse {
    fn from(c: Concept) -> Self {
        Self {
            id: c.id,
            source: c.source.as_str().to_string(),
            third_code: c.third_code,
            name: c.name,
            last_synced_at: c.last_synced_at,
        }
    }
}

/// 개념 구성 종목 항목.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConceptStockResponse {
    pub id: Option<i64>,
    pub concept_id: Option<i64>,
    pub source: String,
    pub stock_third_code: String,
    pub stock_symbol: Option<String>,
    pub added_at: Option<DateTime<Utc>>,
}

impl From<ConceptStock> for ConceptStockResponse {
    fn from(s: ConceptStock) -> Self {
        Self {
            id: s.id,
            concept_id: s.concept_id,
            source: s.source.as_str().to_string(),
            stock_third_code: s.stock_third_code,
            stock_symbol: s.stock_symbol,
            added_at: s.added_at,
        }
    }
}

fn parse_source(source: Option<&str>) -> Result<DataSource, ApiError> {
    match source {
        None => Ok(DataSource::AkShare),
        Some(raw) => DataSource::from_str(raw)
            .map_err(|_| ApiError::BadRequest(format!("Unknown source: {}", raw))),
    }
}

// ==================== 핸들러 ====================

/// 개념 섹터와 구성 종목 동기화.
#[utoipa::path(
    post,
    path = "/data-engineering/concepts/sync",
    tag = "concepts",
    request_body(content = ConceptSyncRequest, description = "생략 가능"),
    responses(
        (status = 200, description = "동기화 완료", body = ConceptSyncResponse),
        (status = 500, description = "원격 개념 목록 조회 실패")
    )
)]
pub async fn sync_concepts(
    State(state): State<Arc<AppState>>,
    OptionalJson(req): OptionalJson<ConceptSyncRequest>,
) -> ApiResult<ConceptSyncResponse> {
    let mode = if req.atomic {
        ApplyMode::AtomicBatch
    } else {
        ApplyMode::PerUnit
    };
    let report = modules::sync_concepts(&state.ctx, mode).await?;
    Ok(ApiResponse::success(report.into()))
}

/// 출처별 개념 목록.
#[utoipa::path(
    get,
    path = "/data-engineering/concepts",
    tag = "concepts",
    params(ConceptListQuery),
    responses(
        (status = 200, description = "개념 목록", body = Vec<ConceptResponse>),
        (status = 400, description = "알 수 없는 source")
    )
)]
pub async fn list_concepts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConceptListQuery>,
) -> ApiResult<Vec<ConceptResponse>> {
    let source = parse_source(query.source.as_deref())?;
    let concepts = modules::list_concepts(state.ctx.store.as_ref(), source).await?;
    Ok(ApiResponse::success(
        concepts.into_iter().map(ConceptResponse::from).collect(),
    ))
}

/// 개념 구성 종목 목록.
#[utoipa::path(
    get,
    path = "/data-engineering/concepts/{id}/stocks",
    tag = "concepts",
    params(("id" = i64, Path, description = "개념 ID")),
    responses(
        (status = 200, description = "구성 종목 목록", body = Vec<ConceptStockResponse>),
        (status = 404, description = "개념 없음")
    )
)]
pub async fn list_concept_stocks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<ConceptStockResponse>> {
    let stocks = modules::list_concept_stocks(state.ctx.store.as_ref(), id).await?;
    Ok(ApiResponse::success(
        stocks.into_iter().map(ConceptStockResponse::from).collect(),
    ))
}

pub fn concepts_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_concepts))
        .route("/sync", post(sync_concepts))
        .route("/{id}/stocks", get(list_concept_stocks))
}
