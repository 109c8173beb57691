//! 재무 지표 동기화.
//!
//! - 전체: 종목별 전체 이력
//! - 증분: 상장 종목별로 저장된 마지막 보고 기간 다음 날부터
//! - 단일 종목: 한 종목 전체 이력을 한 트랜잭션으로

use ashare_core::{dedupe_by_period, is_ts_code, DataSource, StockBasic};
use chrono::{Days, NaiveDate};
use std::time::Instant;

use crate::error::{CollectorError, Result};
use crate::stats::{elapsed_ms, FinanceSyncReport};
use crate::SyncContext;

/// 종목 하나의 조회 시작일 결정 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartPolicy {
    /// 전체 이력
    Full,
    /// 마지막 보고 기간 다음 날부터
    AfterLatest,
}

/// 재무 지표 전체 동기화. 종목을 지정하지 않으면 전체 종목이 대상입니다.
pub async fn sync_finance_full(
    ctx: &SyncContext,
    ts_codes: Option<&[String]>,
) -> Result<FinanceSyncReport> {
    let stocks = match ts_codes {
        Some(codes) if !codes.is_empty() => {
            ctx.store
                .find_stocks_by_codes(DataSource::Tushare, codes)
                .await?
        }
        _ => ctx.store.find_all_stocks(DataSource::Tushare).await?,
    };
    run_per_stock(ctx, "full", &stocks, StartPolicy::Full).await
}

/// 재무 지표 증분 동기화. 종목을 지정하지 않으면 상장 종목이 대상입니다.
pub async fn sync_finance_increment(
    ctx: &SyncContext,
    ts_codes: Option<&[String]>,
) -> Result<FinanceSyncReport> {
    let stocks = match ts_codes {
        Some(codes) if !codes.is_empty() => {
            ctx.store
                .find_stocks_by_codes(DataSource::Tushare, codes)
                .await?
        }
        _ => ctx.store.find_listed_stocks(DataSource::Tushare).await?,
    };
    run_per_stock(ctx, "increment", &stocks, StartPolicy::AfterLatest).await
}

/// 한 종목의 재무 지표 전체 이력을 동기화합니다.
///
/// 코드 형식이 잘못되면 `InvalidInput`, 종목 기본 정보에 없으면 `NotFound`입니다.
pub async fn sync_finance_by_stock(ctx: &SyncContext, ts_code: &str) -> Result<FinanceSyncReport> {
    let start = Instant::now();
    let ts_code = ts_code.trim();

    if !is_ts_code(ts_code) {
        return Err(CollectorError::InvalidInput(format!(
            "invalid ts_code: {} (expected e.g. 000001.SZ)",
            ts_code
        )));
    }

    let stock = ctx
        .store
        .find_stock(DataSource::Tushare, ts_code)
        .await?
        .ok_or_else(|| CollectorError::NotFound(format!("stock {} not found", ts_code)))?;

    let synced_records = ctx
        .run_unit(ts_code, sync_stock(ctx, &stock, None))
        .await?;

    let report = FinanceSyncReport {
        total: 1,
        success_count: 1,
        failure_count: 0,
        synced_records,
        duration_ms: elapsed_ms(start.elapsed()),
    };
    report.log_summary("by_stock");
    Ok(report)
}

async fn run_per_stock(
    ctx: &SyncContext,
    operation: &str,
    stocks: &[StockBasic],
    policy: StartPolicy,
) -> Result<FinanceSyncReport> {
    let start = Instant::now();
    tracing::info!(operation, total = stocks.len(), "재무 지표 동기화 시작");

    let mut report = FinanceSyncReport {
        total: stocks.len(),
        ..Default::default()
    };

    for (idx, stock) in stocks.iter().enumerate() {
        let result = ctx
            .run_unit(&stock.third_code, async {
                let from = match policy {
                    StartPolicy::Full => None,
                    StartPolicy::AfterLatest => next_start_date(ctx, stock).await?,
                };
                sync_stock(ctx, stock, from).await
            })
            .await;

        match result {
            Ok(records) => {
                report.success_count += 1;
                report.synced_records += records;
                tracing::debug!(
                    progress = format!("{}/{}", idx + 1, stocks.len()),
                    third_code = %stock.third_code,
                    records,
                    "재무 지표 동기화 성공"
                );
            }
            Err(e) => {
                report.failure_count += 1;
                tracing::warn!(
                    progress = format!("{}/{}", idx + 1, stocks.len()),
                    third_code = %stock.third_code,
                    error = %e,
                    "재무 지표 동기화 실패"
                );
            }
        }
    }

    report.duration_ms = elapsed_ms(start.elapsed());
    report.log_summary(operation);
    Ok(report)
}

async fn next_start_date(ctx: &SyncContext, stock: &StockBasic) -> Result<Option<NaiveDate>> {
    let latest = ctx
        .store
        .latest_end_date(DataSource::Tushare, &stock.third_code)
        .await?;
    Ok(latest.and_then(|d| d.checked_add_days(Days::new(1))))
}

async fn sync_stock(
    ctx: &SyncContext,
    stock: &StockBasic,
    from: Option<NaiveDate>,
) -> Result<usize> {
    let fetched = ctx
        .financial_gateway
        .fetch_by_stock(&stock.third_code, from)
        .await?;
    let rows: Vec<_> = dedupe_by_period(fetched)
        .into_iter()
        .map(|row| row.with_symbol(Some(stock.symbol.clone())))
        .collect();

    if !rows.is_empty() {
        ctx.store.upsert_financials(&rows).await?;
    }
    Ok(rows.len())
}
