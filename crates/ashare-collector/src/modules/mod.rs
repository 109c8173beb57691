//! 동기화 유스케이스 모듈.

pub mod concept_query;
pub mod concept_sync;
pub mod daily_history;
pub mod daily_increment;
pub mod daily_retry;
pub mod finance_sync;
pub mod stock_basic_sync;
pub mod workflow;

pub use concept_query::{list_concept_stocks, list_concepts};
pub use concept_sync::sync_concepts;
pub use daily_history::{sync_daily_history, sync_daily_history_until};
pub use daily_increment::{default_trade_date, sync_daily_increment};
pub use daily_retry::retry_daily_failures;
pub use finance_sync::{sync_finance_by_stock, sync_finance_full, sync_finance_increment};
pub use stock_basic_sync::sync_stock_basic;
pub use workflow::{run_workflow, WorkflowSummary};
