//! 유스케이스 실행 컨텍스트.
//!
//! 게이트웨이와 저장소를 trait 객체로 묶습니다. Tushare 클라이언트 하나가 세 게이트웨이
//! 역할을 함께 맡으므로 토큰 버킷도 하나를 공유합니다.

use ashare_core::{AppConfig, SyncConfig};
use ashare_data::{
    AkShareClient, ConceptGateway, FinancialIndicatorGateway, PgStore, StockBasicGateway,
    StockDailyGateway, SyncStore, TushareClient,
};
use sqlx::PgPool;
use std::future::Future;
use std::sync::Arc;

use crate::error::{CollectorError, Result};

/// 동기화 유스케이스 컨텍스트.
#[derive(Clone)]
pub struct SyncContext {
    pub store: Arc<dyn SyncStore>,
    pub stock_basic_gateway: Arc<dyn StockBasicGateway>,
    pub daily_gateway: Arc<dyn StockDailyGateway>,
    pub financial_gateway: Arc<dyn FinancialIndicatorGateway>,
    pub concept_gateway: Arc<dyn ConceptGateway>,
    pub settings: SyncConfig,
}

impl SyncContext {
    /// 설정과 연결 풀로 실제 게이트웨이/저장소를 구성합니다.
    pub fn from_config(config: &AppConfig, pool: PgPool) -> Result<Self> {
        let tushare = Arc::new(TushareClient::from_config(&config.provider)?);
        let akshare = Arc::new(AkShareClient::from_config(&config.provider)?);

        Ok(Self {
            store: Arc::new(PgStore::new(pool)),
            stock_basic_gateway: tushare.clone(),
            daily_gateway: tushare.clone(),
            financial_gateway: tushare,
            concept_gateway: akshare,
            settings: config.sync.clone(),
        })
    }

    /// 단위 작업을 타임아웃 안에서 실행합니다. 시간이 지나면 `Timeout` 에러입니다.
    pub async fn run_unit<T, F>(&self, unit: &str, task: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let limit = self.settings.unit_timeout();
        match tokio::time::timeout(limit, task).await {
            Ok(result) => result,
            Err(_) => Err(CollectorError::Timeout(format!(
                "{} exceeded {}s",
                unit,
                limit.as_secs()
            ))),
        }
    }
}
