//! 종목 기본 정보와 일봉 시세.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{DataSource, StockStatus};

/// 종목 기본 정보. `(source, third_code)`가 자연키입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBasic {
    /// 로컬 대리키
    pub id: Option<i64>,
    /// 데이터 출처
    pub source: DataSource,
    /// 출처 측 종목 코드 (예: 000001.SZ)
    pub third_code: String,
    /// 거래소 심볼 (예: 000001)
    pub symbol: String,
    /// 종목명
    pub name: String,
    /// 시장 구분 (主板, 创业板 등)
    pub market: String,
    /// 지역
    pub area: String,
    /// 업종
    pub industry: String,
    /// 상장일
    pub list_date: NaiveDate,
    /// 상장 상태
    pub status: StockStatus,
}

impl StockBasic {
    /// 상장 중인 종목인지 여부.
    pub fn is_listed(&self) -> bool {
        self.status == StockStatus::Listed
    }
}

/// 일봉 시세. `daily`, `adj_factor`, `daily_basic` 세 응답을 거래일 기준으로 병합한 결과입니다.
///
/// `(source, third_code, trade_date)`가 자연키입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDaily {
    pub source: DataSource,
    pub third_code: String,
    /// 종목 기본 정보에서 채워지는 심볼
    pub symbol: Option<String>,
    pub trade_date: NaiveDate,

    // 필수 가격/거래량
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub pre_close: Decimal,
    pub change: Decimal,
    pub pct_chg: Decimal,
    pub vol: Decimal,
    pub amount: Decimal,
    /// 복권 인자 (응답에 없으면 1)
    pub adj_factor: Decimal,

    // daily_basic 지표 (없을 수 있음)
    pub turnover_rate: Option<Decimal>,
    pub turnover_rate_f: Option<Decimal>,
    pub volume_ratio: Option<Decimal>,
    pub pe: Option<Decimal>,
    pub pe_ttm: Option<Decimal>,
    pub pb: Option<Decimal>,
    pub ps: Option<Decimal>,
    pub ps_ttm: Option<Decimal>,
    pub dv_ratio: Option<Decimal>,
    pub dv_ttm: Option<Decimal>,
    pub total_share: Option<Decimal>,
    pub float_share: Option<Decimal>,
    pub free_share: Option<Decimal>,
    pub total_mv: Option<Decimal>,
    pub circ_mv: Option<Decimal>,
}

/// 일봉 레코드의 가격/거래량 필수 값 묶음.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DailyQuote {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub pre_close: Decimal,
    pub change: Decimal,
    pub pct_chg: Decimal,
    pub vol: Decimal,
    pub amount: Decimal,
}

impl StockDaily {
    /// 필수 값만으로 일봉을 생성합니다. 복권 인자는 1, 보조 지표는 비어 있습니다.
    pub fn new(
        source: DataSource,
        third_code: impl Into<String>,
        trade_date: NaiveDate,
        quote: DailyQuote,
    ) -> Self {
        Self {
            source,
            third_code: third_code.into(),
            symbol: None,
            trade_date,
            open: quote.open,
            high: quote.high,
            low: quote.low,
            close: quote.close,
            pre_close: quote.pre_close,
            change: quote.change,
            pct_chg: quote.pct_chg,
            vol: quote.vol,
            amount: quote.amount,
            adj_factor: Decimal::ONE,
            turnover_rate: None,
            turnover_rate_f: None,
            volume_ratio: None,
            pe: None,
            pe_ttm: None,
            pb: None,
            ps: None,
            ps_ttm: None,
            dv_ratio: None,
            dv_ttm: None,
            total_share: None,
            float_share: None,
            free_share: None,
            total_mv: None,
            circ_mv: None,
        }
    }

    /// 심볼을 지정합니다.
    pub fn with_symbol(mut self, symbol: Option<String>) -> Self {
        self.symbol = symbol;
        self
    }

    /// 복권 가격 (종가 × 복권 인자).
    pub fn adjusted_close(&self) -> Decimal {
        self.close * self.adj_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_daily_defaults_adj_factor_to_one() {
        let daily = StockDaily::new(
            DataSource::Tushare,
            "000001.SZ",
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            DailyQuote {
                close: dec!(9.39),
                ..Default::default()
            },
        );

        assert_eq!(daily.adj_factor, Decimal::ONE);
        assert_eq!(daily.adjusted_close(), dec!(9.39));
        assert!(daily.pe.is_none());
    }

    #[test]
    fn test_is_listed() {
        let basic = StockBasic {
            id: None,
            source: DataSource::Tushare,
            third_code: "000001.SZ".to_string(),
            symbol: "000001".to_string(),
            name: "平安银行".to_string(),
            market: "主板".to_string(),
            area: "深圳".to_string(),
            industry: "银行".to_string(),
            list_date: NaiveDate::from_ymd_opt(1991, 4, 3).unwrap(),
            status: StockStatus::Listed,
        };
        assert!(basic.is_listed());
        assert!(!StockBasic {
            status: StockStatus::Delisted,
            ..basic
        }
        .is_listed());
    }
}
