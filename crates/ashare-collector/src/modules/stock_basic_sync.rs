//! 종목 기본 정보 동기화.

use std::time::Instant;

use crate::error::Result;
use crate::stats::StockBasicSyncReport;
use crate::SyncContext;

/// Tushare 전체 종목(상장/상장폐지/거래정지)을 받아 한 트랜잭션으로 upsert합니다.
pub async fn sync_stock_basic(ctx: &SyncContext) -> Result<StockBasicSyncReport> {
    let start = Instant::now();
    tracing::info!("종목 기본 정보 동기화 시작");

    let stocks = ctx.stock_basic_gateway.fetch_stock_basics().await?;
    if stocks.is_empty() {
        tracing::warn!("Tushare 종목 목록이 비어 있습니다");
    }

    ctx.store.upsert_stock_basics(&stocks).await?;

    let report = StockBasicSyncReport::new(stocks.len(), start.elapsed());
    report.log_summary();
    Ok(report)
}
