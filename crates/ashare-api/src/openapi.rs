//! OpenAPI 문서화 설정.
//!
//! utoipa로 OpenAPI 3.0 스펙을 생성합니다. Swagger UI는 `/swagger-ui` 경로에서 사용 가능합니다.
//!
//! 새 엔드포인트를 추가할 때:
//!
//! 1. 요청/응답 타입에 `#[derive(ToSchema)]` 추가
//! 2. 핸들러에 `#[utoipa::path(...)]` 어노테이션 추가
//! 3. 이 파일의 `components(schemas(...))` 및 `paths(...)` 섹션에 추가
//!
//! 응답 스키마는 `data` 필드 안의 타입만 기술합니다. 모든 응답은 `{code, message, data}` 봉투로 감싸집니다.

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::routes::{
    ComponentHealth, ComponentStatus, ConceptResponse, ConceptStockResponse, ConceptSyncRequest,
    ConceptSyncResponse, DailyHistoryResponse, DailyIncrementResponse, FinanceSyncRequest,
    FinanceSyncResponse, HealthResponse, HistorySyncRequest, IncrementSyncRequest,
    RetryFailuresRequest, RetryFailuresResponse, StockBasicSyncResponse,
};

/// A-share 데이터 엔지니어링 API 문서.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "A-share Data Engineering API",
        version = "0.1.0",
        description = r#"
# A주 시세 데이터 동기화 API

Tushare/AKShare에서 A주 데이터를 가져와 PostgreSQL에 동기화합니다.

## 주요 기능

- **종목 기본 정보**: 전체 상장/상장폐지 종목 목록
- **개념 섹터**: 개념과 구성 종목 비교 동기화
- **일봉**: 이력/증분 동기화와 실패 재시도
- **재무 지표**: 보고기간별 재무 지표

## 응답 형식

`{ "code": 200, "message": "success", "data": { ... } }`
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8000", description = "로컬 개발 서버"),
    ),
    tags(
        (name = "health", description = "헬스 체크 - 서버 상태 확인"),
        (name = "stock-basic", description = "종목 기본 정보 - Tushare 동기화"),
        (name = "concepts", description = "개념 섹터 - AKShare 동기화 및 조회"),
        (name = "stock-daily", description = "일봉 - 이력/증분/재시도"),
        (name = "finance-indicator", description = "재무 지표 - 전체/증분/단일 종목")
    ),
    components(
        schemas(
            // ===== Health =====
            HealthResponse,
            ComponentHealth,
            ComponentStatus,

            // ===== Stock basic =====
            StockBasicSyncResponse,

            // ===== Concepts =====
            ConceptSyncRequest,
            ConceptSyncResponse,
            ConceptResponse,
            ConceptStockResponse,

            // ===== Stock daily =====
            HistorySyncRequest,
            IncrementSyncRequest,
            RetryFailuresRequest,
            DailyHistoryResponse,
            DailyIncrementResponse,
            RetryFailuresResponse,

            // ===== Finance indicator =====
            FinanceSyncRequest,
            FinanceSyncResponse,
        )
    ),
    paths(
        // ===== Health =====
        crate::routes::health::health_check,
        crate::routes::health::health_ready,

        // ===== Stock basic =====
        crate::routes::stock_basic::sync_stock_basic,

        // ===== Concepts =====
        crate::routes::concepts::sync_concepts,
        crate::routes::concepts::list_concepts,
        crate::routes::concepts::list_concept_stocks,

        // ===== Stock daily =====
        crate::routes::stock_daily::sync_history,
        crate::routes::stock_daily::sync_increment,
        crate::routes::stock_daily::retry_failures,

        // ===== Finance indicator =====
        crate::routes::finance_indicator::sync_full,
        crate::routes::finance_indicator::sync_increment,
        crate::routes::finance_indicator::sync_by_stock,
    )
)]
pub struct ApiDoc;

/// Swagger UI 라우터 생성.
///
/// - `/swagger-ui` - Swagger UI 대화형 문서
/// - `/api-docs/openapi.json` - OpenAPI JSON 스펙
pub fn swagger_ui_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_valid() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&spec).unwrap();

        assert!(json.contains("A-share Data Engineering API"));

        assert!(json.contains("/health/ready"));
        assert!(json.contains("/data-engineering/concepts/{id}/stocks"));
        assert!(json.contains("/data-engineering/stock-daily/sync/retry-failures"));
        assert!(json.contains("/data-engineering/finance-indicator/sync/by-stock/{ts_code}"));
    }

    #[test]
    fn test_openapi_contains_schemas() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();

        assert!(json.contains("ConceptSyncResponse"));
        assert!(json.contains("RetryFailuresRequest"));
        assert!(json.contains("FinanceSyncResponse"));
    }

    #[test]
    fn test_swagger_ui_router_creates() {
        let _router: Router<()> = swagger_ui_router();
    }
}
