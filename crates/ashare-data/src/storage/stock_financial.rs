//! 재무 지표 저장소.
//!
//! 지표 컬럼이 많아 SQL은 `FINANCIAL_INDICATOR_FIELDS` 순서대로 조립합니다.

use ashare_core::{dedupe_by_period, DataSource, StockFinancial, FINANCIAL_INDICATOR_FIELDS};
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::debug;

use crate::error::Result;

/// 한 번의 INSERT에 묶는 최대 행 수.
pub const STOCK_FINANCIAL_BATCH_SIZE: usize = 50;

fn insert_prefix() -> String {
    format!(
        "INSERT INTO stock_financial (source, third_code, symbol, ann_date, end_date, {}, update_flag) ",
        FINANCIAL_INDICATOR_FIELDS.join(", ")
    )
}

fn on_conflict_update() -> String {
    let indicators: Vec<String> = FINANCIAL_INDICATOR_FIELDS
        .iter()
        .map(|f| format!("{f} = EXCLUDED.{f}"))
        .collect();
    format!(
        " ON CONFLICT (source, third_code, end_date) DO UPDATE SET \
         symbol = COALESCE(EXCLUDED.symbol, stock_financial.symbol), \
         ann_date = EXCLUDED.ann_date, {}, update_flag = EXCLUDED.update_flag, \
         updated_at = NOW(), version = stock_financial.version + 1",
        indicators.join(", ")
    )
}

/// 재무 지표 저장소.
pub struct StockFinancialRepository;

impl StockFinancialRepository {
    /// 재무 지표를 `(source, third_code, end_date)` 기준으로 upsert합니다.
    ///
    /// 한 문장 안에서 같은 키가 두 번 갱신되면 Postgres가 거부하므로
    /// [`dedupe_by_period`]로 먼저 합칩니다.
    pub async fn upsert_many(conn: &mut PgConnection, rows: &[StockFinancial]) -> Result<u64> {
        let rows = dedupe_by_period(rows.to_vec());
        let prefix = insert_prefix();
        let suffix = on_conflict_update();
        let mut affected = 0;

        for chunk in rows.chunks(STOCK_FINANCIAL_BATCH_SIZE) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(&prefix);
            builder.push_values(chunk, |mut b, f| {
                b.push_bind(f.source.as_str())
                    .push_bind(&f.third_code)
                    .push_bind(&f.symbol)
                    .push_bind(f.ann_date)
                    .push_bind(f.end_date);
                for value in f.indicator_values() {
                    b.push_bind(value);
                }
                b.push_bind(&f.update_flag);
            });
            builder.push(&suffix);

            let result = builder.build().execute(&mut *conn).await?;
            affected += result.rows_affected();
            debug!(chunk = chunk.len(), affected, "stock_financial 청크 저장");
        }

        Ok(affected)
    }

    /// 종목의 마지막 보고 기간 종료일.
    pub async fn latest_end_date(
        pool: &PgPool,
        source: DataSource,
        third_code: &str,
    ) -> Result<Option<NaiveDate>> {
        let latest: Option<NaiveDate> = sqlx::query_scalar(
            "SELECT MAX(end_date) FROM stock_financial WHERE source = $1 AND third_code = $2",
        )
        .bind(source.as_str())
        .bind(third_code)
        .fetch_one(pool)
        .await?;

        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_prefix_lists_all_columns() {
        let sql = insert_prefix();
        assert!(sql.starts_with("INSERT INTO stock_financial (source, third_code, symbol, ann_date, end_date, eps, "));
        assert!(sql.contains("q_ocf_to_or, update_flag)"));
        assert_eq!(sql.matches(", ").count(), 5 + FINANCIAL_INDICATOR_FIELDS.len());
    }

    #[test]
    fn test_on_conflict_updates_every_indicator() {
        let sql = on_conflict_update();
        for field in FINANCIAL_INDICATOR_FIELDS {
            assert!(sql.contains(&format!("{field} = EXCLUDED.{field}")), "{field}");
        }
        assert!(sql.contains("version = stock_financial.version + 1"));
    }
}
