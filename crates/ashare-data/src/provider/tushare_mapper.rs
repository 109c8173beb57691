//! Tushare 응답 행 → 도메인 타입 변환.
//!
//! 응답 행은 먼저 `Raw*` 구조체로 역직렬화한 뒤 여기서 검증합니다.
//! 필수 값이 없거나 형식이 틀리면 `DataError::ParseError`(외부 서비스 에러)로 실패합니다.

use ashare_core::{
    DailyQuote, DataSource, StockBasic, StockDaily, StockFinancial, StockStatus,
    FINANCIAL_INDICATOR_FIELDS,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::error::{DataError, Result};

// =============================================================================
// 원본 행 타입
// =============================================================================

/// `stock_basic` 행.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStockBasic {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ts_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub market: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub area: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub industry: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub list_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub list_status: Option<String>,
}

/// `daily` 행.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDaily {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ts_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub trade_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub open: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub high: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub low: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub close: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub pre_close: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub change: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub pct_chg: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub vol: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub amount: Option<Decimal>,
}

/// `adj_factor` 행.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAdjFactor {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ts_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub trade_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub adj_factor: Option<Decimal>,
}

/// `daily_basic` 행.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDailyBasic {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ts_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub trade_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub turnover_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub turnover_rate_f: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub volume_ratio: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub pe: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub pe_ttm: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub pb: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub ps: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub ps_ttm: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub dv_ratio: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub dv_ttm: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub total_share: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub float_share: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub free_share: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub total_mv: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub circ_mv: Option<Decimal>,
}

/// `fina_indicator` 행. 지표 컬럼은 이름으로 찾습니다.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFinaIndicator {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ts_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ann_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub update_flag: Option<String>,
    #[serde(flatten)]
    pub values: HashMap<String, Value>,
}

// =============================================================================
// 파싱 헬퍼
// =============================================================================

/// JSON 값(숫자/문자열/null)을 Decimal로 변환합니다. 변환할 수 없으면 None.
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal_str(&n.to_string()),
        Value::String(s) => parse_decimal_str(s),
        _ => None,
    }
}

fn parse_decimal_str(s: &str) -> Option<Decimal> {
    let cleaned = s.trim().replace(',', "");
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("nan") {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// YYYYMMDD 형식의 날짜 문자열을 NaiveDate로 파싱.
pub fn parse_date_yyyymmdd(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").ok()
}

/// 날짜를 YYYYMMDD 문자열로.
pub fn format_date_yyyymmdd(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

fn lenient_decimal<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(decimal_from_value))
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn required_date(value: Option<&str>, field: &str) -> Result<NaiveDate> {
    let raw = value.ok_or_else(|| DataError::ParseError(format!("Missing required field: {}", field)))?;
    parse_date_yyyymmdd(raw)
        .ok_or_else(|| DataError::ParseError(format!("Invalid date for {}: {:?}", field, raw)))
}

fn required_decimal(value: Option<Decimal>, field: &str, context: &str) -> Result<Decimal> {
    value.ok_or_else(|| {
        DataError::ParseError(format!("Missing required field: {} ({})", field, context))
    })
}

// =============================================================================
// 변환
// =============================================================================

/// `stock_basic` 행을 종목 기본 정보로 변환합니다.
pub fn to_stock_basic(row: RawStockBasic) -> Result<StockBasic> {
    let third_code = row
        .ts_code
        .ok_or_else(|| DataError::ParseError("ts_code is required".to_string()))?;
    let list_date = required_date(row.list_date.as_deref(), "list_date")?;
    let status_code = row
        .list_status
        .ok_or_else(|| DataError::ParseError("list_status is required".to_string()))?;
    let status = StockStatus::from_str(&status_code)
        .map_err(|_| DataError::ParseError(format!("Unknown list_status: {:?}", status_code)))?;

    Ok(StockBasic {
        id: None,
        source: DataSource::Tushare,
        third_code,
        symbol: row.symbol.unwrap_or_default(),
        name: row.name.unwrap_or_default(),
        market: row.market.unwrap_or_default(),
        area: row.area.unwrap_or_default(),
        industry: row.industry.unwrap_or_default(),
        list_date,
        status,
    })
}

/// 한 종목의 `daily`/`adj_factor`/`daily_basic` 행을 거래일 기준으로 병합합니다.
///
/// `daily` 행이 기준이며, 복권 인자가 없으면 1, 보조 지표가 없으면 None입니다.
/// 결과는 거래일 오름차순입니다.
pub fn merge_daily(
    ts_code: &str,
    daily: Vec<RawDaily>,
    adj_factors: Vec<RawAdjFactor>,
    basics: Vec<RawDailyBasic>,
) -> Result<Vec<StockDaily>> {
    let daily_by_date: BTreeMap<String, RawDaily> = daily
        .into_iter()
        .filter_map(|r| r.trade_date.clone().map(|d| (d, r)))
        .collect();
    let adj_by_date: HashMap<String, Option<Decimal>> = adj_factors
        .into_iter()
        .filter_map(|r| r.trade_date.map(|d| (d, r.adj_factor)))
        .collect();
    let mut basic_by_date: HashMap<String, RawDailyBasic> = basics
        .into_iter()
        .filter_map(|r| r.trade_date.clone().map(|d| (d, r)))
        .collect();

    let mut result = Vec::with_capacity(daily_by_date.len());
    for (trade_date, row) in daily_by_date {
        let context = format!("{} {}", ts_code, trade_date);
        let date = required_date(Some(trade_date.as_str()), "trade_date")?;
        let quote = DailyQuote {
            open: required_decimal(row.open, "open", &context)?,
            high: required_decimal(row.high, "high", &context)?,
            low: required_decimal(row.low, "low", &context)?,
            close: required_decimal(row.close, "close", &context)?,
            pre_close: required_decimal(row.pre_close, "pre_close", &context)?,
            change: required_decimal(row.change, "change", &context)?,
            pct_chg: required_decimal(row.pct_chg, "pct_chg", &context)?,
            vol: required_decimal(row.vol, "vol", &context)?,
            amount: required_decimal(row.amount, "amount", &context)?,
        };

        let mut stock = StockDaily::new(DataSource::Tushare, ts_code, date, quote);
        // 복권 인자 행이 없으면 1, 행은 있는데 값이 비어 있으면 에러
        if let Some(adj) = adj_by_date.get(&trade_date) {
            stock.adj_factor = required_decimal(*adj, "adj_factor", &context)?;
        }

        let basic = basic_by_date.remove(&trade_date).unwrap_or_default();
        stock.turnover_rate = basic.turnover_rate;
        stock.turnover_rate_f = basic.turnover_rate_f;
        stock.volume_ratio = basic.volume_ratio;
        stock.pe = basic.pe;
        stock.pe_ttm = basic.pe_ttm;
        stock.pb = basic.pb;
        stock.ps = basic.ps;
        stock.ps_ttm = basic.ps_ttm;
        stock.dv_ratio = basic.dv_ratio;
        stock.dv_ttm = basic.dv_ttm;
        stock.total_share = basic.total_share;
        stock.float_share = basic.float_share;
        stock.free_share = basic.free_share;
        stock.total_mv = basic.total_mv;
        stock.circ_mv = basic.circ_mv;

        result.push(stock);
    }

    Ok(result)
}

/// 전 종목 응답을 종목별로 나눠 병합합니다. 결과는 종목 코드 순입니다.
pub fn merge_daily_by_code(
    daily: Vec<RawDaily>,
    adj_factors: Vec<RawAdjFactor>,
    basics: Vec<RawDailyBasic>,
) -> Result<Vec<StockDaily>> {
    let mut daily_by_code: BTreeMap<String, Vec<RawDaily>> = BTreeMap::new();
    for row in daily {
        if let Some(code) = row.ts_code.clone() {
            daily_by_code.entry(code).or_default().push(row);
        }
    }

    let mut adj_by_code: HashMap<String, Vec<RawAdjFactor>> = HashMap::new();
    for row in adj_factors {
        if let Some(code) = row.ts_code.clone() {
            if daily_by_code.contains_key(&code) {
                adj_by_code.entry(code).or_default().push(row);
            }
        }
    }

    let mut basic_by_code: HashMap<String, Vec<RawDailyBasic>> = HashMap::new();
    for row in basics {
        if let Some(code) = row.ts_code.clone() {
            if daily_by_code.contains_key(&code) {
                basic_by_code.entry(code).or_default().push(row);
            }
        }
    }

    let mut result = Vec::new();
    for (code, rows) in daily_by_code {
        let adj = adj_by_code.remove(&code).unwrap_or_default();
        let basic = basic_by_code.remove(&code).unwrap_or_default();
        result.extend(merge_daily(&code, rows, adj, basic)?);
    }
    Ok(result)
}

/// `fina_indicator` 행을 재무 지표로 변환합니다.
///
/// 지표 값은 파싱에 실패하면 None으로 둡니다. `end_date`는 필수입니다.
pub fn to_stock_financial(row: RawFinaIndicator) -> Result<StockFinancial> {
    let third_code = row
        .ts_code
        .ok_or_else(|| DataError::ParseError("ts_code is required".to_string()))?;
    let end_date = required_date(row.end_date.as_deref(), "end_date")?;

    let mut financial = StockFinancial::new(DataSource::Tushare, third_code, end_date);
    financial.ann_date = row.ann_date.as_deref().and_then(parse_date_yyyymmdd);
    financial.update_flag = row.update_flag;

    for field in FINANCIAL_INDICATOR_FIELDS {
        let value = row.values.get(field).and_then(decimal_from_value);
        financial.set_indicator(field, value);
    }

    Ok(financial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn raw_daily(code: &str, date: &str, close: Value) -> RawDaily {
        serde_json::from_value(json!({
            "ts_code": code, "trade_date": date,
            "open": 10.0, "high": 10.5, "low": 9.8, "close": close,
            "pre_close": 9.9, "change": 0.1, "pct_chg": 1.01,
            "vol": 12345.67, "amount": 1234567.8
        }))
        .unwrap()
    }

    #[test]
    fn test_decimal_from_value() {
        assert_eq!(decimal_from_value(&json!(9.39)), Some(dec!(9.39)));
        assert_eq!(decimal_from_value(&json!("1,234.5")), Some(dec!(1234.5)));
        assert_eq!(decimal_from_value(&json!(1e-7)), Some(dec!(0.0000001)));
        assert_eq!(decimal_from_value(&json!("abc")), None);
        assert_eq!(decimal_from_value(&Value::Null), None);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date_yyyymmdd("20240102"),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
        assert_eq!(parse_date_yyyymmdd("2024-01-02"), None);
        assert_eq!(parse_date_yyyymmdd("20241302"), None);
    }

    #[test]
    fn test_stock_basic_requires_valid_status() {
        let row: RawStockBasic = serde_json::from_value(json!({
            "ts_code": "000001.SZ", "symbol": "000001", "name": "平安银行",
            "market": "主板", "area": "深圳", "industry": null,
            "list_date": "19910403", "list_status": "L"
        }))
        .unwrap();
        let basic = to_stock_basic(row.clone()).unwrap();
        assert_eq!(basic.status, StockStatus::Listed);
        assert_eq!(basic.industry, "");

        let bad = RawStockBasic {
            list_status: Some("X".to_string()),
            ..row
        };
        assert!(matches!(to_stock_basic(bad), Err(DataError::ParseError(_))));
    }

    #[test]
    fn test_merge_daily_defaults() {
        let daily = vec![
            raw_daily("000001.SZ", "20240103", json!(10.2)),
            raw_daily("000001.SZ", "20240102", json!(10.1)),
        ];
        let adj: Vec<RawAdjFactor> = vec![serde_json::from_value(json!({
            "ts_code": "000001.SZ", "trade_date": "20240103", "adj_factor": 108.031
        }))
        .unwrap()];
        let basic: Vec<RawDailyBasic> = vec![serde_json::from_value(json!({
            "ts_code": "000001.SZ", "trade_date": "20240102", "pe": "4.5", "pb": null
        }))
        .unwrap()];

        let merged = merge_daily("000001.SZ", daily, adj, basic).unwrap();
        assert_eq!(merged.len(), 2);

        assert_eq!(merged[0].trade_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(merged[0].adj_factor, Decimal::ONE);
        assert_eq!(merged[0].pe, Some(dec!(4.5)));
        assert_eq!(merged[0].pb, None);

        assert_eq!(merged[1].adj_factor, dec!(108.031));
        assert_eq!(merged[1].pe, None);
    }

    #[test]
    fn test_merge_daily_missing_required_fails() {
        let daily = vec![raw_daily("000001.SZ", "20240102", Value::Null)];
        let err = merge_daily("000001.SZ", daily, Vec::new(), Vec::new()).unwrap_err();
        assert!(err.to_string().contains("close"));
    }

    #[test]
    fn test_merge_daily_by_code_groups() {
        let daily = vec![
            raw_daily("600000.SH", "20240102", json!(7.0)),
            raw_daily("000001.SZ", "20240102", json!(9.0)),
        ];
        let adj: Vec<RawAdjFactor> = vec![serde_json::from_value(json!({
            "ts_code": "600000.SH", "trade_date": "20240102", "adj_factor": 2
        }))
        .unwrap()];

        let merged = merge_daily_by_code(daily, adj, Vec::new()).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].third_code, "000001.SZ");
        assert_eq!(merged[0].adj_factor, Decimal::ONE);
        assert_eq!(merged[1].third_code, "600000.SH");
        assert_eq!(merged[1].adj_factor, dec!(2));
    }

    #[test]
    fn test_fina_indicator_lenient_values() {
        let row: RawFinaIndicator = serde_json::from_value(json!({
            "ts_code": "600000.SH", "ann_date": "20240330", "end_date": "20231231",
            "eps": 1.23, "roe": "bad", "q_ocf_to_or": null, "unknown_col": 5,
            "update_flag": "1"
        }))
        .unwrap();

        let financial = to_stock_financial(row).unwrap();
        assert_eq!(financial.indicator("eps"), Some(dec!(1.23)));
        assert_eq!(financial.indicator("roe"), None);
        assert_eq!(financial.indicator("q_ocf_to_or"), None);
        assert_eq!(financial.indicator("unknown_col"), None);
        assert_eq!(financial.update_flag.as_deref(), Some("1"));
        assert_eq!(financial.ann_date, NaiveDate::from_ymd_opt(2024, 3, 30));
    }

    #[test]
    fn test_fina_indicator_requires_end_date() {
        let row: RawFinaIndicator =
            serde_json::from_value(json!({"ts_code": "600000.SH", "end_date": null})).unwrap();
        assert!(to_stock_financial(row).is_err());
    }
}
