//! 일봉 이력 동기화.
//!
//! 종목마다 저장된 마지막 거래일 다음 날(없으면 상장일)부터 오늘까지 가져옵니다.
//! 종목 하나의 실패는 실패 기록에 남기고 다음 종목으로 넘어갑니다.

use ashare_core::{sync_span, DataSource, NewSyncFailure, StockBasic};
use chrono::{Days, Local, NaiveDate};
use std::time::Instant;
use tracing::Instrument;

use crate::error::Result;
use crate::stats::{elapsed_ms, DailyHistoryReport};
use crate::SyncContext;

enum StockOutcome {
    Synced(usize),
    Skipped,
}

/// 일봉 이력 동기화. `ts_codes`가 비어 있으면 전체 종목이 대상입니다.
pub async fn sync_daily_history(
    ctx: &SyncContext,
    ts_codes: Option<&[String]>,
) -> Result<DailyHistoryReport> {
    sync_daily_history_until(ctx, ts_codes, Local::now().date_naive()).await
}

/// 종료일을 지정한 일봉 이력 동기화.
pub async fn sync_daily_history_until(
    ctx: &SyncContext,
    ts_codes: Option<&[String]>,
    today: NaiveDate,
) -> Result<DailyHistoryReport> {
    let start = Instant::now();

    let stocks = match ts_codes {
        Some(codes) if !codes.is_empty() => {
            ctx.store
                .find_stocks_by_codes(DataSource::Tushare, codes)
                .await?
        }
        _ => ctx.store.find_all_stocks(DataSource::Tushare).await?,
    };

    tracing::info!(total = stocks.len(), until = %today, "일봉 이력 동기화 시작");

    let mut report = DailyHistoryReport {
        total: stocks.len(),
        ..Default::default()
    };

    for (idx, stock) in stocks.iter().enumerate() {
        let progress = format!("{}/{}", idx + 1, stocks.len());
        let mut range_start = None;

        let result = ctx
            .run_unit(&stock.third_code, async {
                let from = next_start_date(ctx, stock).await?;
                range_start = Some(from);
                sync_stock(ctx, stock, from, today).await
            })
            .instrument(sync_span!("daily_history", stock.third_code))
            .await;

        match result {
            Ok(StockOutcome::Synced(rows)) => {
                report.success_count += 1;
                report.synced_days += rows;
                tracing::debug!(progress = %progress, third_code = %stock.third_code, rows, "일봉 동기화 성공");
            }
            Ok(StockOutcome::Skipped) => {
                report.skipped_count += 1;
                tracing::debug!(progress = %progress, third_code = %stock.third_code, "이미 최신 상태");
            }
            Err(e) => {
                report.failure_count += 1;
                tracing::warn!(
                    progress = %progress,
                    third_code = %stock.third_code,
                    error = %e,
                    "일봉 동기화 실패"
                );
                let failure = NewSyncFailure::now(
                    DataSource::Tushare,
                    stock.third_code.clone(),
                    range_start.unwrap_or(stock.list_date),
                    today,
                    e.to_string(),
                );
                if let Err(record_err) = ctx.store.record_failure(&failure).await {
                    tracing::error!(
                        third_code = %stock.third_code,
                        error = %record_err,
                        "실패 기록 저장 실패"
                    );
                }
            }
        }
    }

    report.duration_ms = elapsed_ms(start.elapsed());
    report.log_summary();
    Ok(report)
}

async fn next_start_date(ctx: &SyncContext, stock: &StockBasic) -> Result<NaiveDate> {
    let latest = ctx
        .store
        .latest_trade_date(DataSource::Tushare, &stock.third_code)
        .await?;
    Ok(match latest {
        Some(date) => date.checked_add_days(Days::new(1)).unwrap_or(date),
        None => stock.list_date,
    })
}

async fn sync_stock(
    ctx: &SyncContext,
    stock: &StockBasic,
    from: NaiveDate,
    today: NaiveDate,
) -> Result<StockOutcome> {
    if from > today {
        return Ok(StockOutcome::Skipped);
    }

    let rows: Vec<_> = ctx
        .daily_gateway
        .fetch_stock_daily(&stock.third_code, from, today)
        .await?
        .into_iter()
        .map(|row| row.with_symbol(Some(stock.symbol.clone())))
        .collect();

    ctx.store.upsert_daily(&rows).await?;
    Ok(StockOutcome::Synced(rows.len()))
}
