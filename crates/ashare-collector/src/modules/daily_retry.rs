//! 일봉 동기화 실패 재시도.
//!
//! 미해결 실패 기록의 범위를 그대로 다시 가져옵니다. 성공하면 저장과 해결 표시를
//! 한 트랜잭션으로 처리하고, 실패하면 재시도 횟수만 올립니다.

use ashare_core::{sync_span, StockDaily, SyncFailure};
use std::time::Instant;
use tracing::Instrument;

use crate::error::{CollectorError, Result};
use crate::stats::{elapsed_ms, RetryReport};
use crate::SyncContext;

/// 실패 기록 재시도. `max_retries`보다 적게 재시도된 기록만 대상입니다.
pub async fn retry_daily_failures(ctx: &SyncContext, max_retries: i32) -> Result<RetryReport> {
    if max_retries < 1 {
        return Err(CollectorError::InvalidInput(format!(
            "max_retries must be >= 1, got {}",
            max_retries
        )));
    }

    let start = Instant::now();
    let failures = ctx.store.find_unresolved_failures(max_retries).await?;

    tracing::info!(total = failures.len(), max_retries, "실패 재시도 시작");

    let mut report = RetryReport {
        total: failures.len(),
        ..Default::default()
    };

    for failure in &failures {
        let result = ctx
            .run_unit(&failure.third_code, retry_one(ctx, failure))
            .instrument(sync_span!(
                "daily_retry",
                failure.third_code,
                format!("{}~{}", failure.start_date, failure.end_date)
            ))
            .await;

        match result {
            Ok(rows) => {
                report.resolved_count += 1;
                tracing::info!(
                    failure_id = failure.id,
                    third_code = %failure.third_code,
                    rows,
                    "재시도 성공"
                );
            }
            Err(e) => {
                report.still_failed_count += 1;
                tracing::warn!(
                    failure_id = failure.id,
                    third_code = %failure.third_code,
                    retry_count = failure.retry_count + 1,
                    error = %e,
                    "재시도 실패"
                );
                if let Err(record_err) = ctx
                    .store
                    .record_retry_failure(failure.id, &e.to_string())
                    .await
                {
                    tracing::error!(failure_id = failure.id, error = %record_err, "재시도 실패 기록 저장 실패");
                }
            }
        }
    }

    report.duration_ms = elapsed_ms(start.elapsed());
    report.log_summary();
    Ok(report)
}

async fn retry_one(ctx: &SyncContext, failure: &SyncFailure) -> Result<usize> {
    let symbol = ctx
        .store
        .find_stock(failure.source, &failure.third_code)
        .await?
        .map(|s| s.symbol);

    let rows: Vec<StockDaily> = ctx
        .daily_gateway
        .fetch_stock_daily(&failure.third_code, failure.start_date, failure.end_date)
        .await?
        .into_iter()
        .map(|row| row.with_symbol(symbol.clone()))
        .collect();

    ctx.store.upsert_daily_and_resolve(&rows, failure.id).await?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        context, daily_bar, date, listed_stock, FakeConceptGateway, FakeTushare, MemoryStore,
    };
    use ashare_core::{DataSource, NewSyncFailure};
    use ashare_data::{FailureLedger, StockBasicStore};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    async fn setup() -> (Arc<MemoryStore>, Arc<FakeTushare>, SyncContext) {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_stock_basics(&[listed_stock("000001.SZ", "000001")])
            .await
            .unwrap();
        store
            .record_failure(&NewSyncFailure::now(
                DataSource::Tushare,
                "000001.SZ",
                date(2024, 1, 1),
                date(2024, 1, 31),
                "Tushare API daily error: code=40203",
            ))
            .await
            .unwrap();
        let tushare = Arc::new(FakeTushare::new());
        tushare.add_daily(vec![
            daily_bar("000001.SZ", date(2024, 1, 2), dec!(9.39)),
            daily_bar("000001.SZ", date(2024, 2, 1), dec!(9.50)),
        ]);
        let ctx = context(store.clone(), tushare.clone(), Arc::new(FakeConceptGateway::new()));
        (store, tushare, ctx)
    }

    #[tokio::test]
    async fn test_retry_refetches_recorded_range_and_resolves() {
        let (store, tushare, ctx) = setup().await;

        let report = retry_daily_failures(&ctx, 3).await.unwrap();

        assert_eq!(report.total, 1);
        assert_eq!(report.resolved_count, 1);
        assert!(tushare
            .calls()
            .contains(&"daily:000001.SZ:2024-01-01:2024-01-31".to_string()));
        let rows = store.daily_rows("000001.SZ");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol.as_deref(), Some("000001"));
        assert!(store.find_unresolved_failures(3).await.unwrap().is_empty());

        // 해결된 기록은 다시 대상이 되지 않음
        let again = retry_daily_failures(&ctx, 3).await.unwrap();
        assert_eq!(again.total, 0);
    }

    #[tokio::test]
    async fn test_retry_stops_at_max_retries() {
        let (store, tushare, ctx) = setup().await;
        tushare.fail_code("000001.SZ");

        for _ in 0..2 {
            let report = retry_daily_failures(&ctx, 2).await.unwrap();
            assert_eq!(report.still_failed_count, 1);
        }
        let report = retry_daily_failures(&ctx, 2).await.unwrap();
        assert_eq!(report.total, 0);

        let failures = store.failures();
        assert_eq!(failures[0].retry_count, 2);
        assert!(!failures[0].resolved);

        // 상한을 올리면 다시 대상이 되고, 복구되면 해결됨
        tushare.recover_code("000001.SZ");
        let report = retry_daily_failures(&ctx, 3).await.unwrap();
        assert_eq!(report.resolved_count, 1);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_failure_unresolved() {
        let (store, _tushare, ctx) = setup().await;
        store.fail_daily_writes("000001.SZ");

        let report = retry_daily_failures(&ctx, 3).await.unwrap();

        assert_eq!(report.still_failed_count, 1);
        assert!(store.daily_rows("000001.SZ").is_empty());
        assert_eq!(store.failures()[0].retry_count, 1);
    }

    #[tokio::test]
    async fn test_invalid_max_retries() {
        let (_store, _tushare, ctx) = setup().await;
        let err = retry_daily_failures(&ctx, 0).await.unwrap_err();
        assert!(matches!(err, CollectorError::InvalidInput(_)));
    }
}
