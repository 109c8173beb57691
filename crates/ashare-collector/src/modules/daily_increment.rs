//! 일봉 증분 동기화.
//!
//! 거래일 하나의 전 종목 일봉을 한 트랜잭션으로 저장합니다. 실패는 호출자에게 그대로 전달됩니다.

use ashare_core::DataSource;
use chrono::{Days, Local, NaiveDate};
use std::collections::HashMap;
use std::time::Instant;

use crate::error::Result;
use crate::stats::{elapsed_ms, DailyIncrementReport};
use crate::SyncContext;

/// 기본 거래일 (어제).
pub fn default_trade_date() -> NaiveDate {
    let today = Local::now().date_naive();
    today.checked_sub_days(Days::new(1)).unwrap_or(today)
}

/// 일봉 증분 동기화. 거래일이 없으면 어제입니다.
pub async fn sync_daily_increment(
    ctx: &SyncContext,
    trade_date: Option<NaiveDate>,
) -> Result<DailyIncrementReport> {
    let start = Instant::now();
    let trade_date = trade_date.unwrap_or_else(default_trade_date);

    tracing::info!(trade_date = %trade_date, "일봉 증분 동기화 시작");

    let symbols: HashMap<String, String> = ctx
        .store
        .find_all_stocks(DataSource::Tushare)
        .await?
        .into_iter()
        .map(|s| (s.third_code, s.symbol))
        .collect();

    let rows: Vec<_> = ctx
        .daily_gateway
        .fetch_daily_all_by_date(trade_date)
        .await?
        .into_iter()
        .map(|row| {
            let symbol = symbols.get(&row.third_code).cloned();
            row.with_symbol(symbol)
        })
        .collect();

    if rows.is_empty() {
        tracing::info!(trade_date = %trade_date, "해당 거래일 데이터 없음 (휴장일)");
    } else {
        ctx.store.upsert_daily(&rows).await?;
    }

    let report = DailyIncrementReport {
        trade_date,
        synced_count: rows.len(),
        duration_ms: elapsed_ms(start.elapsed()),
    };
    report.log_summary();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectorError;
    use crate::testing::{
        context, daily_bar, date, listed_stock, FakeConceptGateway, FakeTushare, MemoryStore,
    };
    use ashare_data::StockBasicStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_increment_stores_all_rows_of_the_date() {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_stock_basics(&[listed_stock("000001.SZ", "000001")])
            .await
            .unwrap();
        let tushare = Arc::new(FakeTushare::new());
        tushare.add_daily(vec![
            daily_bar("000001.SZ", date(2024, 1, 2), dec!(9.39)),
            daily_bar("600000.SH", date(2024, 1, 2), dec!(6.60)),
            daily_bar("600000.SH", date(2024, 1, 3), dec!(6.61)),
        ]);
        let ctx = context(store.clone(), tushare, Arc::new(FakeConceptGateway::new()));

        let report = sync_daily_increment(&ctx, Some(date(2024, 1, 2))).await.unwrap();

        assert_eq!(report.trade_date, date(2024, 1, 2));
        assert_eq!(report.synced_count, 2);
        assert_eq!(store.daily_rows("000001.SZ")[0].symbol.as_deref(), Some("000001"));
        // 종목 기본 정보에 없는 종목은 심볼 없이 저장
        assert_eq!(store.daily_rows("600000.SH")[0].symbol, None);
    }

    #[tokio::test]
    async fn test_increment_write_failure_propagates() {
        let store = Arc::new(MemoryStore::new());
        store.fail_daily_writes("600000.SH");
        let tushare = Arc::new(FakeTushare::new());
        tushare.add_daily(vec![
            daily_bar("000001.SZ", date(2024, 1, 2), dec!(9.39)),
            daily_bar("600000.SH", date(2024, 1, 2), dec!(6.60)),
        ]);
        let ctx = context(store.clone(), tushare, Arc::new(FakeConceptGateway::new()));

        let err = sync_daily_increment(&ctx, Some(date(2024, 1, 2))).await.unwrap_err();

        assert!(matches!(err, CollectorError::Database(_)));
        assert!(store.daily_rows("000001.SZ").is_empty());
    }

    #[test]
    fn test_default_trade_date_is_yesterday() {
        let today = Local::now().date_naive();
        assert_eq!(default_trade_date() + Days::new(1), today);
    }
}
