//! PostgreSQL 저장소.
//!
//! 저장소는 상태 없는 구조체의 연관 함수로 구성됩니다.
//! 조회는 `&PgPool`, 쓰기는 `&mut PgConnection`을 받으므로 호출자가
//! 트랜잭션(`&mut *tx`) 범위를 정합니다.

pub mod concept;
pub mod postgres;
pub mod stock_basic;
pub mod stock_daily;
pub mod stock_financial;
pub mod sync_failure;

pub use concept::{ConceptRecord, ConceptRepository, ConceptStockRecord, ConceptStockRepository};
pub use postgres::Database;
pub use stock_basic::{StockBasicRecord, StockBasicRepository};
pub use stock_daily::StockDailyRepository;
pub use stock_financial::StockFinancialRepository;
pub use sync_failure::{SyncFailureRecord, SyncFailureRepository};

use ashare_core::DataSource;

use crate::error::{DataError, Result};

/// 저장된 출처 문자열을 변환합니다.
pub(crate) fn parse_source(value: &str) -> Result<DataSource> {
    value
        .parse()
        .map_err(|_| DataError::InvalidData(format!("Unknown source in database: {}", value)))
}
