//! 종목 기본 정보 저장소.

use ashare_core::{DataSource, StockBasic, StockStatus};
use chrono::NaiveDate;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::debug;

use super::parse_source;
use crate::error::{DataError, Result};

/// 한 번의 INSERT에 묶는 최대 행 수.
pub const STOCK_BASIC_BATCH_SIZE: usize = 1000;

/// `stock_basic` 테이블 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct StockBasicRecord {
    pub id: i64,
    pub source: String,
    pub third_code: String,
    pub symbol: String,
    pub name: String,
    pub market: String,
    pub area: String,
    pub industry: String,
    pub list_date: NaiveDate,
    pub status: String,
}

impl TryFrom<StockBasicRecord> for StockBasic {
    type Error = DataError;

    fn try_from(r: StockBasicRecord) -> Result<Self> {
        let status: StockStatus = r
            .status
            .parse()
            .map_err(|_| DataError::InvalidData(format!("Unknown list status: {}", r.status)))?;
        Ok(StockBasic {
            id: Some(r.id),
            source: parse_source(&r.source)?,
            third_code: r.third_code,
            symbol: r.symbol,
            name: r.name,
            market: r.market,
            area: r.area,
            industry: r.industry,
            list_date: r.list_date,
            status,
        })
    }
}

const SELECT_COLUMNS: &str =
    "id, source, third_code, symbol, name, market, area, industry, list_date, status";

/// 종목 기본 정보 저장소.
pub struct StockBasicRepository;

impl StockBasicRepository {
    /// 종목 기본 정보를 일괄 upsert합니다. 반영된 행 수를 반환합니다.
    pub async fn upsert_many(conn: &mut PgConnection, stocks: &[StockBasic]) -> Result<u64> {
        let mut affected = 0;

        // UNNEST 일괄 삽입
        for chunk in stocks.chunks(STOCK_BASIC_BATCH_SIZE) {
            let sources: Vec<&str> = chunk.iter().map(|s| s.source.as_str()).collect();
            let codes: Vec<&str> = chunk.iter().map(|s| s.third_code.as_str()).collect();
            let symbols: Vec<&str> = chunk.iter().map(|s| s.symbol.as_str()).collect();
            let names: Vec<&str> = chunk.iter().map(|s| s.name.as_str()).collect();
            let markets: Vec<&str> = chunk.iter().map(|s| s.market.as_str()).collect();
            let areas: Vec<&str> = chunk.iter().map(|s| s.area.as_str()).collect();
            let industries: Vec<&str> = chunk.iter().map(|s| s.industry.as_str()).collect();
            let list_dates: Vec<NaiveDate> = chunk.iter().map(|s| s.list_date).collect();
            let statuses: Vec<&str> = chunk.iter().map(|s| s.status.code()).collect();

            let result = sqlx::query(
                r#"
                INSERT INTO stock_basic
                    (source, third_code, symbol, name, market, area, industry, list_date, status)
                SELECT * FROM UNNEST(
                    $1::varchar[], $2::varchar[], $3::varchar[], $4::varchar[], $5::varchar[],
                    $6::varchar[], $7::varchar[], $8::date[], $9::varchar[]
                )
                ON CONFLICT (source, third_code) DO UPDATE SET
                    symbol = EXCLUDED.symbol,
                    name = EXCLUDED.name,
                    market = EXCLUDED.market,
                    area = EXCLUDED.area,
                    industry = EXCLUDED.industry,
                    list_date = EXCLUDED.list_date,
                    status = EXCLUDED.status,
                    updated_at = NOW(),
                    version = stock_basic.version + 1
                "#,
            )
            .bind(&sources)
            .bind(&codes)
            .bind(&symbols)
            .bind(&names)
            .bind(&markets)
            .bind(&areas)
            .bind(&industries)
            .bind(&list_dates)
            .bind(&statuses)
            .execute(&mut *conn)
            .await?;

            affected += result.rows_affected();
            debug!(chunk = chunk.len(), affected, "stock_basic 청크 저장");
        }

        Ok(affected)
    }

    /// 출처의 전체 종목.
    pub async fn find_all(pool: &PgPool, source: DataSource) -> Result<Vec<StockBasic>> {
        let records: Vec<StockBasicRecord> = sqlx::query_as(&format!(
            "SELECT {} FROM stock_basic WHERE source = $1 ORDER BY third_code",
            SELECT_COLUMNS
        ))
        .bind(source.as_str())
        .fetch_all(pool)
        .await?;

        records.into_iter().map(StockBasic::try_from).collect()
    }

    /// 출처의 상장(L) 종목.
    pub async fn find_listed(pool: &PgPool, source: DataSource) -> Result<Vec<StockBasic>> {
        let records: Vec<StockBasicRecord> = sqlx::query_as(&format!(
            "SELECT {} FROM stock_basic WHERE source = $1 AND status = $2 ORDER BY third_code",
            SELECT_COLUMNS
        ))
        .bind(source.as_str())
        .bind(StockStatus::Listed.code())
        .fetch_all(pool)
        .await?;

        records.into_iter().map(StockBasic::try_from).collect()
    }

    /// 주어진 코드 목록에 해당하는 종목. 없는 코드는 결과에서 빠집니다.
    pub async fn find_by_third_codes(
        pool: &PgPool,
        source: DataSource,
        third_codes: &[String],
    ) -> Result<Vec<StockBasic>> {
        let records: Vec<StockBasicRecord> = sqlx::query_as(&format!(
            "SELECT {} FROM stock_basic WHERE source = $1 AND third_code = ANY($2) ORDER BY third_code",
            SELECT_COLUMNS
        ))
        .bind(source.as_str())
        .bind(third_codes)
        .fetch_all(pool)
        .await?;

        records.into_iter().map(StockBasic::try_from).collect()
    }

    /// 코드로 한 종목을 조회합니다.
    pub async fn find_by_third_code(
        pool: &PgPool,
        source: DataSource,
        third_code: &str,
    ) -> Result<Option<StockBasic>> {
        let record: Option<StockBasicRecord> = sqlx::query_as(&format!(
            "SELECT {} FROM stock_basic WHERE source = $1 AND third_code = $2",
            SELECT_COLUMNS
        ))
        .bind(source.as_str())
        .bind(third_code)
        .fetch_optional(pool)
        .await?;

        record.map(StockBasic::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: &str) -> StockBasicRecord {
        StockBasicRecord {
            id: 7,
            source: "TUSHARE".to_string(),
            third_code: "000001.SZ".to_string(),
            symbol: "000001".to_string(),
            name: "平安银行".to_string(),
            market: "主板".to_string(),
            area: "深圳".to_string(),
            industry: "银行".to_string(),
            list_date: NaiveDate::from_ymd_opt(1991, 4, 3).unwrap(),
            status: status.to_string(),
        }
    }

    #[test]
    fn test_record_into_domain() {
        let stock = StockBasic::try_from(record("L")).unwrap();
        assert_eq!(stock.id, Some(7));
        assert_eq!(stock.source, DataSource::Tushare);
        assert!(stock.is_listed());
    }

    #[test]
    fn test_record_with_unknown_status() {
        let err = StockBasic::try_from(record("X")).unwrap_err();
        assert!(matches!(err, DataError::InvalidData(_)));
    }
}
