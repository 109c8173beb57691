//! 동기화 유스케이스가 의존하는 저장소 경계.
//!
//! 유스케이스는 이 trait들만 보고, PostgreSQL 구현은 [`PgStore`]가 담당합니다.
//! 여러 테이블에 걸친 쓰기는 메서드 하나가 트랜잭션 하나에 대응합니다.

use ashare_core::{
    Concept, ConceptStock, DataSource, NewSyncFailure, StockBasic, StockDaily, StockFinancial,
    SyncFailure,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::debug;

use crate::error::Result;
use crate::storage::{
    ConceptRepository, ConceptStockRepository, Database, StockBasicRepository,
    StockDailyRepository, StockFinancialRepository, SyncFailureRepository,
};

/// 개념 하나에 대한 변경.
#[derive(Debug, Clone, PartialEq)]
pub enum ConceptChange {
    /// 개념을 upsert하고 구성 종목을 반영합니다.
    Upsert {
        concept: Concept,
        stock_upserts: Vec<ConceptStock>,
        /// 삭제할 구성 종목 ID
        stock_deletes: Vec<i64>,
    },
    /// 내용이 같은 개념의 동기화 시각만 갱신합니다.
    Touch {
        concept_id: i64,
        synced_at: DateTime<Utc>,
    },
    /// 원격에서 사라진 개념을 구성 종목과 함께 삭제합니다.
    Delete { concept_id: i64 },
}

/// 종목 기본 정보 저장소.
#[async_trait]
pub trait StockBasicStore: Send + Sync {
    /// 한 트랜잭션으로 upsert합니다.
    async fn upsert_stock_basics(&self, stocks: &[StockBasic]) -> Result<u64>;

    async fn find_all_stocks(&self, source: DataSource) -> Result<Vec<StockBasic>>;

    async fn find_listed_stocks(&self, source: DataSource) -> Result<Vec<StockBasic>>;

    /// 코드 목록으로 조회합니다. 없는 코드는 빠집니다.
    async fn find_stocks_by_codes(
        &self,
        source: DataSource,
        third_codes: &[String],
    ) -> Result<Vec<StockBasic>>;

    async fn find_stock(&self, source: DataSource, third_code: &str) -> Result<Option<StockBasic>>;
}

/// 개념 섹터 저장소.
#[async_trait]
pub trait ConceptStore: Send + Sync {
    async fn find_concepts(&self, source: DataSource) -> Result<Vec<Concept>>;

    async fn find_concept(&self, id: i64) -> Result<Option<Concept>>;

    async fn find_concept_stocks(&self, concept_id: i64) -> Result<Vec<ConceptStock>>;

    /// 변경 목록 전체를 한 트랜잭션으로 반영합니다. 하나라도 실패하면 모두 롤백됩니다.
    async fn apply_concept_changes(&self, changes: &[ConceptChange]) -> Result<()>;
}

/// 일봉 저장소.
#[async_trait]
pub trait StockDailyStore: Send + Sync {
    async fn latest_trade_date(&self, source: DataSource, third_code: &str)
        -> Result<Option<NaiveDate>>;

    /// 한 트랜잭션으로 upsert합니다.
    async fn upsert_daily(&self, rows: &[StockDaily]) -> Result<u64>;

    /// 일봉 upsert와 실패 기록 해결을 한 트랜잭션으로 처리합니다.
    async fn upsert_daily_and_resolve(&self, rows: &[StockDaily], failure_id: i64) -> Result<u64>;
}

/// 동기화 실패 기록.
#[async_trait]
pub trait FailureLedger: Send + Sync {
    async fn record_failure(&self, failure: &NewSyncFailure) -> Result<i64>;

    async fn find_unresolved_failures(&self, max_retries: i32) -> Result<Vec<SyncFailure>>;

    async fn mark_resolved(&self, id: i64) -> Result<()>;

    async fn record_retry_failure(&self, id: i64, error_message: &str) -> Result<()>;
}

/// 재무 지표 저장소.
#[async_trait]
pub trait FinancialStore: Send + Sync {
    async fn latest_end_date(&self, source: DataSource, third_code: &str)
        -> Result<Option<NaiveDate>>;

    /// 한 트랜잭션으로 upsert합니다.
    async fn upsert_financials(&self, rows: &[StockFinancial]) -> Result<u64>;
}

/// 저장소 상태 확인.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn health_check(&self) -> Result<()>;
}

/// 동기화 전체가 쓰는 저장소 묶음.
pub trait SyncStore:
    StockBasicStore + ConceptStore + StockDailyStore + FailureLedger + FinancialStore + StoreHealth
{
}

impl<T> SyncStore for T where
    T: StockBasicStore
        + ConceptStore
        + StockDailyStore
        + FailureLedger
        + FinancialStore
        + StoreHealth
{
}

// =============================================================================
// PostgreSQL
// =============================================================================

/// PostgreSQL 구현.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<Database> for PgStore {
    fn from(db: Database) -> Self {
        Self::new(db.into_pool())
    }
}

#[async_trait]
impl StockBasicStore for PgStore {
    async fn upsert_stock_basics(&self, stocks: &[StockBasic]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let affected = StockBasicRepository::upsert_many(&mut tx, stocks).await?;
        tx.commit().await?;
        Ok(affected)
    }

    async fn find_all_stocks(&self, source: DataSource) -> Result<Vec<StockBasic>> {
        StockBasicRepository::find_all(&self.pool, source).await
    }

    async fn find_listed_stocks(&self, source: DataSource) -> Result<Vec<StockBasic>> {
        StockBasicRepository::find_listed(&self.pool, source).await
    }

    async fn find_stocks_by_codes(
        &self,
        source: DataSource,
        third_codes: &[String],
    ) -> Result<Vec<StockBasic>> {
        StockBasicRepository::find_by_third_codes(&self.pool, source, third_codes).await
    }

    async fn find_stock(&self, source: DataSource, third_code: &str) -> Result<Option<StockBasic>> {
        StockBasicRepository::find_by_third_code(&self.pool, source, third_code).await
    }
}

#[async_trait]
impl ConceptStore for PgStore {
    async fn find_concepts(&self, source: DataSource) -> Result<Vec<Concept>> {
        ConceptRepository::find_by_source(&self.pool, source).await
    }

    async fn find_concept(&self, id: i64) -> Result<Option<Concept>> {
        ConceptRepository::find_by_id(&self.pool, id).await
    }

    async fn find_concept_stocks(&self, concept_id: i64) -> Result<Vec<ConceptStock>> {
        ConceptStockRepository::find_by_concept(&self.pool, concept_id).await
    }

    async fn apply_concept_changes(&self, changes: &[ConceptChange]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for change in changes {
            match change {
                ConceptChange::Upsert {
                    concept,
                    stock_upserts,
                    stock_deletes,
                } => {
                    let concept_id = ConceptRepository::upsert(&mut tx, concept).await?;
                    ConceptStockRepository::delete_by_ids(&mut tx, stock_deletes).await?;
                    ConceptStockRepository::upsert_many(&mut tx, concept_id, stock_upserts).await?;
                    debug!(concept_id, third_code = %concept.third_code, "개념 반영");
                }
                ConceptChange::Touch {
                    concept_id,
                    synced_at,
                } => {
                    ConceptRepository::touch(&mut tx, *concept_id, *synced_at).await?;
                }
                ConceptChange::Delete { concept_id } => {
                    ConceptRepository::delete(&mut tx, *concept_id).await?;
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl StockDailyStore for PgStore {
    async fn latest_trade_date(
        &self,
        source: DataSource,
        third_code: &str,
    ) -> Result<Option<NaiveDate>> {
        StockDailyRepository::latest_trade_date(&self.pool, source, third_code).await
    }

    async fn upsert_daily(&self, rows: &[StockDaily]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let affected = StockDailyRepository::upsert_many(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(affected)
    }

    async fn upsert_daily_and_resolve(&self, rows: &[StockDaily], failure_id: i64) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let affected = StockDailyRepository::upsert_many(&mut tx, rows).await?;
        SyncFailureRepository::mark_resolved(&mut tx, failure_id).await?;
        tx.commit().await?;
        Ok(affected)
    }
}

#[async_trait]
impl FailureLedger for PgStore {
    async fn record_failure(&self, failure: &NewSyncFailure) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        SyncFailureRepository::record(&mut conn, failure).await
    }

    async fn find_unresolved_failures(&self, max_retries: i32) -> Result<Vec<SyncFailure>> {
        SyncFailureRepository::find_unresolved(&self.pool, max_retries).await
    }

    async fn mark_resolved(&self, id: i64) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        SyncFailureRepository::mark_resolved(&mut conn, id).await
    }

    async fn record_retry_failure(&self, id: i64, error_message: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        SyncFailureRepository::record_retry_failure(&mut conn, id, error_message).await
    }
}

#[async_trait]
impl FinancialStore for PgStore {
    async fn latest_end_date(
        &self,
        source: DataSource,
        third_code: &str,
    ) -> Result<Option<NaiveDate>> {
        StockFinancialRepository::latest_end_date(&self.pool, source, third_code).await
    }

    async fn upsert_financials(&self, rows: &[StockFinancial]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let affected = StockFinancialRepository::upsert_many(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(affected)
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn health_check(&self) -> Result<()> {
        Database::from_pool(self.pool.clone()).health_check().await
    }
}
