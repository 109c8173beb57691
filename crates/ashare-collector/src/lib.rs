//! A주 시세 동기화 유스케이스와 독립 실행 수집기.
//!
//! 이 crate는 API 서버와 CLI가 함께 쓰는 동기화 로직을 제공합니다:
//! - 종목 기본 정보 동기화 (Tushare)
//! - 개념 섹터와 구성 종목 동기화 (AKShare)
//! - 일봉 이력/증분 동기화와 실패 재시도
//! - 재무 지표 동기화

pub mod context;
pub mod error;
pub mod modules;
pub mod stats;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use context::SyncContext;
pub use error::{CollectorError, Result};
pub use stats::{
    ConceptSyncReport, DailyHistoryReport, DailyIncrementReport, FinanceSyncReport, RetryReport,
    StockBasicSyncReport,
};
