//! 외부 데이터 Provider 모듈.
//!
//! 동기화 유스케이스는 아래 게이트웨이 trait에만 의존하고, 실제 구현은 이 모듈에 둡니다.
//!
//! ## Tushare Pro
//! - `TushareClient`: HTTP API 클라이언트 (토큰 필요, 분당 호출 한도를 토큰 버킷으로 제한)
//! - 종목 기본 정보, 일봉(daily + adj_factor + daily_basic), 재무 지표(fina_indicator)
//!
//! ## AKShare (AKTools)
//! - `AkShareClient`: AKTools HTTP 브리지 클라이언트
//! - 동방재부 개념 섹터 목록과 구성 종목 (중국어 컬럼명)

pub mod akshare;
pub mod tushare;
pub mod tushare_mapper;

use ashare_core::{Concept, StockBasic, StockDaily, StockFinancial};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use akshare::AkShareClient;
pub use tushare::TushareClient;

/// 개념 구성 종목 원본 (코드 매칭 전).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptMember {
    /// 출처 측 종목 코드 (예: 000001)
    pub code: String,
    /// 종목명
    pub name: String,
}

/// 종목 기본 정보 게이트웨이.
#[async_trait]
pub trait StockBasicGateway: Send + Sync {
    /// 전체 종목 기본 정보 조회 (상장/상장폐지/거래정지 모두).
    async fn fetch_stock_basics(&self) -> Result<Vec<StockBasic>>;
}

/// 일봉 시세 게이트웨이.
#[async_trait]
pub trait StockDailyGateway: Send + Sync {
    /// 한 종목의 기간 일봉 조회 (양 끝 포함).
    async fn fetch_stock_daily(
        &self,
        ts_code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<StockDaily>>;

    /// 특정 거래일의 전 종목 일봉 조회.
    async fn fetch_daily_all_by_date(&self, trade_date: NaiveDate) -> Result<Vec<StockDaily>>;
}

/// 재무 지표 게이트웨이.
#[async_trait]
pub trait FinancialIndicatorGateway: Send + Sync {
    /// 한 종목의 재무 지표 조회. `start_date`가 있으면 그 이후 공시분만.
    async fn fetch_by_stock(
        &self,
        ts_code: &str,
        start_date: Option<NaiveDate>,
    ) -> Result<Vec<StockFinancial>>;
}

/// 개념 섹터 게이트웨이.
#[async_trait]
pub trait ConceptGateway: Send + Sync {
    /// 전체 개념 목록 조회.
    async fn fetch_concepts(&self) -> Result<Vec<Concept>>;

    /// 개념 구성 종목 조회.
    async fn fetch_concept_stocks(
        &self,
        concept_code: &str,
        concept_name: &str,
    ) -> Result<Vec<ConceptMember>>;
}
