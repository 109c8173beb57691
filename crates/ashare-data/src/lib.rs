//! A주 데이터 수집과 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - Tushare Pro / AKShare(AKTools) 게이트웨이
//! - 호출 한도를 지키는 토큰 버킷
//! - 페이지/기간 분할 조회
//! - PostgreSQL 저장소와 동기화 실패 기록

pub mod error;
pub mod pagination;
pub mod provider;
pub mod rate_limit;
pub mod storage;
pub mod store;

pub use error::{DataError, Result};
pub use rate_limit::TokenBucket;

// 게이트웨이 재내보내기
pub use provider::{
    AkShareClient, ConceptGateway, ConceptMember, FinancialIndicatorGateway, StockBasicGateway,
    StockDailyGateway, TushareClient,
};

// 저장소 재내보내기
pub use storage::Database;
pub use store::{
    ConceptChange, ConceptStore, FailureLedger, FinancialStore, PgStore, StockBasicStore,
    StockDailyStore, StoreHealth, SyncStore,
};
