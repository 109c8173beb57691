//! 일봉 시세 저장소.

use ashare_core::{DataSource, StockDaily};
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::debug;

use crate::error::Result;

/// 한 번의 INSERT에 묶는 최대 행 수.
pub const STOCK_DAILY_BATCH_SIZE: usize = 500;

const INSERT_COLUMNS: &str = "INSERT INTO stock_daily (\
    source, third_code, symbol, trade_date, open, high, low, close, pre_close, change, \
    pct_chg, vol, amount, adj_factor, turnover_rate, turnover_rate_f, volume_ratio, pe, \
    pe_ttm, pb, ps, ps_ttm, dv_ratio, dv_ttm, total_share, float_share, free_share, \
    total_mv, circ_mv) ";

const ON_CONFLICT_UPDATE: &str = " ON CONFLICT (source, third_code, trade_date) DO UPDATE SET \
    symbol = COALESCE(EXCLUDED.symbol, stock_daily.symbol), \
    open = EXCLUDED.open, high = EXCLUDED.high, low = EXCLUDED.low, close = EXCLUDED.close, \
    pre_close = EXCLUDED.pre_close, change = EXCLUDED.change, pct_chg = EXCLUDED.pct_chg, \
    vol = EXCLUDED.vol, amount = EXCLUDED.amount, adj_factor = EXCLUDED.adj_factor, \
    turnover_rate = EXCLUDED.turnover_rate, turnover_rate_f = EXCLUDED.turnover_rate_f, \
    volume_ratio = EXCLUDED.volume_ratio, pe = EXCLUDED.pe, pe_ttm = EXCLUDED.pe_ttm, \
    pb = EXCLUDED.pb, ps = EXCLUDED.ps, ps_ttm = EXCLUDED.ps_ttm, \
    dv_ratio = EXCLUDED.dv_ratio, dv_ttm = EXCLUDED.dv_ttm, \
    total_share = EXCLUDED.total_share, float_share = EXCLUDED.float_share, \
    free_share = EXCLUDED.free_share, total_mv = EXCLUDED.total_mv, circ_mv = EXCLUDED.circ_mv, \
    updated_at = NOW(), version = stock_daily.version + 1";

/// 일봉 시세 저장소.
pub struct StockDailyRepository;

impl StockDailyRepository {
    /// 일봉을 `(source, third_code, trade_date)` 기준으로 upsert합니다.
    pub async fn upsert_many(conn: &mut PgConnection, rows: &[StockDaily]) -> Result<u64> {
        let mut affected = 0;

        for chunk in rows.chunks(STOCK_DAILY_BATCH_SIZE) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(INSERT_COLUMNS);
            builder.push_values(chunk, |mut b, d| {
                b.push_bind(d.source.as_str())
                    .push_bind(&d.third_code)
                    .push_bind(&d.symbol)
                    .push_bind(d.trade_date)
                    .push_bind(d.open)
                    .push_bind(d.high)
                    .push_bind(d.low)
                    .push_bind(d.close)
                    .push_bind(d.pre_close)
                    .push_bind(d.change)
                    .push_bind(d.pct_chg)
                    .push_bind(d.vol)
                    .push_bind(d.amount)
                    .push_bind(d.adj_factor)
                    .push_bind(d.turnover_rate)
                    .push_bind(d.turnover_rate_f)
                    .push_bind(d.volume_ratio)
                    .push_bind(d.pe)
                    .push_bind(d.pe_ttm)
                    .push_bind(d.pb)
                    .push_bind(d.ps)
                    .push_bind(d.ps_ttm)
                    .push_bind(d.dv_ratio)
                    .push_bind(d.dv_ttm)
                    .push_bind(d.total_share)
                    .push_bind(d.float_share)
                    .push_bind(d.free_share)
                    .push_bind(d.total_mv)
                    .push_bind(d.circ_mv);
            });
            builder.push(ON_CONFLICT_UPDATE);

            let result = builder.build().execute(&mut *conn).await?;
            affected += result.rows_affected();
            debug!(chunk = chunk.len(), affected, "stock_daily 청크 저장");
        }

        Ok(affected)
    }

    /// 종목의 마지막 저장 거래일.
    pub async fn latest_trade_date(
        pool: &PgPool,
        source: DataSource,
        third_code: &str,
    ) -> Result<Option<NaiveDate>> {
        let latest: Option<NaiveDate> = sqlx::query_scalar(
            "SELECT MAX(trade_date) FROM stock_daily WHERE source = $1 AND third_code = $2",
        )
        .bind(source.as_str())
        .bind(third_code)
        .fetch_one(pool)
        .await?;

        Ok(latest)
    }
}
