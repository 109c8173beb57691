//! Tushare Pro HTTP API 클라이언트.
//!
//! 모든 API는 같은 엔드포인트로 POST합니다.
//!
//! ```text
//! 요청: {"api_name": "daily", "token": "...", "params": {...}, "fields": "ts_code,trade_date,..."}
//! 응답: {"code": 0, "msg": "", "data": {"fields": [...], "items": [[...], ...]}}
//! ```
//!
//! `code`가 0이 아니면 실패입니다. 요청 전에는 항상 토큰 버킷에서 토큰을 받습니다.

use ashare_core::{ProviderConfig, StockBasic, StockDaily, StockFinancial, FINANCIAL_INDICATOR_FIELDS};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info};

use super::tushare_mapper::{
    self, format_date_yyyymmdd, RawAdjFactor, RawDaily, RawDailyBasic, RawFinaIndicator,
    RawStockBasic,
};
use super::{FinancialIndicatorGateway, StockBasicGateway, StockDailyGateway};
use crate::error::{DataError, Result};
use crate::pagination::{fetch_all_pages, fetch_by_date_windows};
use crate::rate_limit::TokenBucket;

/// Tushare 기본 엔드포인트.
pub const TUSHARE_API_URL: &str = "http://api.tushare.pro";

/// `fina_indicator` 페이지 크기.
pub const FINA_INDICATOR_PAGE_SIZE: usize = 100;

/// 일봉 조회 한 번에 허용하는 최대 기간 (일).
pub const DAILY_MAX_WINDOW_DAYS: u32 = 365;

const STOCK_BASIC_FIELDS: &str = "ts_code,symbol,name,market,area,industry,list_date,list_status";
const DAILY_FIELDS: &str = "ts_code,trade_date,open,high,low,close,pre_close,change,pct_chg,vol,amount";
const ADJ_FACTOR_FIELDS: &str = "ts_code,trade_date,adj_factor";
const DAILY_BASIC_FIELDS: &str = "ts_code,trade_date,turnover_rate,turnover_rate_f,volume_ratio,\
pe,pe_ttm,pb,ps,ps_ttm,dv_ratio,dv_ttm,total_share,float_share,free_share,total_mv,circ_mv";

/// API 요청 본문.
#[derive(Debug, Serialize)]
struct TushareRequest<'a> {
    api_name: &'a str,
    token: &'a str,
    params: Value,
    fields: &'a str,
}

/// API 응답 래퍼.
#[derive(Debug, Deserialize)]
struct TushareResponse {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<TushareTable>,
}

/// 컬럼 이름 목록 + 행 배열 형태의 응답 데이터.
#[derive(Debug, Default, Deserialize)]
pub struct TushareTable {
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub items: Vec<Vec<Value>>,
}

impl TushareTable {
    /// 각 행을 컬럼 이름으로 묶어 `T`로 역직렬화합니다.
    pub fn into_records<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let fields = self.fields;
        self.items
            .into_iter()
            .map(|item| {
                if item.len() != fields.len() {
                    return Err(DataError::ParseError(format!(
                        "Row has {} values but {} fields",
                        item.len(),
                        fields.len()
                    )));
                }
                let row: Map<String, Value> = fields.iter().cloned().zip(item).collect();
                serde_json::from_value(Value::Object(row))
                    .map_err(|e| DataError::ParseError(e.to_string()))
            })
            .collect()
    }
}

/// Tushare Pro 클라이언트.
pub struct TushareClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
    bucket: TokenBucket,
}

impl TushareClient {
    /// 새 클라이언트를 생성합니다.
    ///
    /// 분당 호출 한도가 곧 버킷 용량입니다.
    pub fn new(
        token: impl Into<String>,
        base_url: impl Into<String>,
        calls_per_minute: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::FetchError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            token: token.into(),
            base_url: base_url.into(),
            bucket: TokenBucket::per_minute(calls_per_minute),
        })
    }

    /// 설정에서 클라이언트를 생성합니다.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        if config.tushare_token.trim().is_empty() {
            tracing::warn!("Tushare 토큰이 비어 있습니다. TUSHARE_TOKEN을 설정하세요.");
        }
        Self::new(
            config.tushare_token.clone(),
            config.tushare_base_url.clone(),
            config.tushare_calls_per_minute,
            config.request_timeout(),
        )
    }

    /// API를 호출하고 응답 테이블을 반환합니다.
    pub async fn query(&self, api_name: &str, params: Value, fields: &str) -> Result<TushareTable> {
        self.bucket.acquire().await;

        debug!(api_name, params = %params, "Tushare API 요청");

        let body = TushareRequest {
            api_name,
            token: &self.token,
            params,
            fields,
        };

        let response = self
            .client
            .post(&self.base_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DataError::FetchError(format!("Tushare API {} error: {}", api_name, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DataError::FetchError(format!(
                "Tushare API {} error: HTTP {} - {}",
                api_name, status, text
            )));
        }

        let parsed: TushareResponse = response.json().await.map_err(|e| {
            DataError::ParseError(format!("Tushare API {} error: invalid payload: {}", api_name, e))
        })?;

        if parsed.code != 0 {
            return Err(DataError::FetchError(format!(
                "Tushare API {} error: code={} msg={}",
                api_name,
                parsed.code,
                parsed.msg.unwrap_or_default()
            )));
        }

        Ok(parsed.data.unwrap_or_default())
    }

    /// API를 호출하고 행을 `T`로 변환합니다.
    async fn query_records<T: DeserializeOwned>(
        &self,
        api_name: &str,
        params: Value,
        fields: &str,
    ) -> Result<Vec<T>> {
        self.query(api_name, params, fields)
            .await?
            .into_records()
            .map_err(|e| DataError::ParseError(format!("Tushare API {} error: {}", api_name, e)))
    }

    /// 한 구간의 일봉을 가져옵니다. `daily`가 비어 있으면 나머지 API는 호출하지 않습니다.
    async fn fetch_daily_window(
        &self,
        ts_code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<StockDaily>> {
        let params = json!({
            "ts_code": ts_code,
            "start_date": format_date_yyyymmdd(start_date),
            "end_date": format_date_yyyymmdd(end_date),
        });

        let daily: Vec<RawDaily> = self.query_records("daily", params.clone(), DAILY_FIELDS).await?;
        if daily.is_empty() {
            return Ok(Vec::new());
        }
        let adj: Vec<RawAdjFactor> = self
            .query_records("adj_factor", params.clone(), ADJ_FACTOR_FIELDS)
            .await?;
        let basic: Vec<RawDailyBasic> = self
            .query_records("daily_basic", params, DAILY_BASIC_FIELDS)
            .await?;

        tushare_mapper::merge_daily(ts_code, daily, adj, basic)
    }

    fn fina_indicator_fields() -> String {
        let mut fields = vec!["ts_code", "ann_date", "end_date"];
        fields.extend(FINANCIAL_INDICATOR_FIELDS);
        fields.push("update_flag");
        fields.join(",")
    }
}

#[async_trait]
impl StockBasicGateway for TushareClient {
    async fn fetch_stock_basics(&self) -> Result<Vec<StockBasic>> {
        let mut stocks = Vec::new();
        for status in ["L", "D", "P"] {
            let rows: Vec<RawStockBasic> = self
                .query_records(
                    "stock_basic",
                    json!({ "exchange": "", "list_status": status }),
                    STOCK_BASIC_FIELDS,
                )
                .await?;
            for row in rows {
                stocks.push(tushare_mapper::to_stock_basic(row)?);
            }
        }

        info!(count = stocks.len(), "Tushare 종목 기본 정보 조회 완료");
        Ok(stocks)
    }
}

#[async_trait]
impl StockDailyGateway for TushareClient {
    async fn fetch_stock_daily(
        &self,
        ts_code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<StockDaily>> {
        fetch_by_date_windows(start_date, end_date, DAILY_MAX_WINDOW_DAYS, |start, end| {
            self.fetch_daily_window(ts_code, start, end)
        })
        .await
    }

    async fn fetch_daily_all_by_date(&self, trade_date: NaiveDate) -> Result<Vec<StockDaily>> {
        let params = json!({ "trade_date": format_date_yyyymmdd(trade_date) });

        let daily: Vec<RawDaily> = self.query_records("daily", params.clone(), DAILY_FIELDS).await?;
        if daily.is_empty() {
            return Ok(Vec::new());
        }
        let adj: Vec<RawAdjFactor> = self
            .query_records("adj_factor", params.clone(), ADJ_FACTOR_FIELDS)
            .await?;
        let basic: Vec<RawDailyBasic> = self
            .query_records("daily_basic", params, DAILY_BASIC_FIELDS)
            .await?;

        tushare_mapper::merge_daily_by_code(daily, adj, basic)
    }
}

#[async_trait]
impl FinancialIndicatorGateway for TushareClient {
    async fn fetch_by_stock(
        &self,
        ts_code: &str,
        start_date: Option<NaiveDate>,
    ) -> Result<Vec<StockFinancial>> {
        let fields = Self::fina_indicator_fields();
        let fields = fields.as_str();

        let rows: Vec<RawFinaIndicator> =
            fetch_all_pages(FINA_INDICATOR_PAGE_SIZE, |offset, limit| {
                let mut params = json!({
                    "ts_code": ts_code,
                    "limit": limit,
                    "offset": offset,
                });
                if let Some(start) = start_date {
                    params["start_date"] = Value::String(format_date_yyyymmdd(start));
                }
                self.query_records("fina_indicator", params, fields)
            })
            .await?;

        debug!(ts_code, count = rows.len(), "fina_indicator 조회 완료");
        rows.into_iter().map(tushare_mapper::to_stock_financial).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_into_records() {
        let table: TushareTable = serde_json::from_value(json!({
            "fields": ["ts_code", "trade_date", "adj_factor"],
            "items": [["000001.SZ", "20240102", 108.031], ["000001.SZ", "20240103", null]]
        }))
        .unwrap();

        let rows: Vec<RawAdjFactor> = table.into_records().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].trade_date.as_deref(), Some("20240102"));
        assert!(rows[0].adj_factor.is_some());
        assert!(rows[1].adj_factor.is_none());
    }

    #[test]
    fn test_table_row_length_mismatch() {
        let table = TushareTable {
            fields: vec!["ts_code".to_string(), "trade_date".to_string()],
            items: vec![vec![json!("000001.SZ")]],
        };
        let rows: Result<Vec<RawAdjFactor>> = table.into_records();
        assert!(matches!(rows, Err(DataError::ParseError(_))));
    }

    #[test]
    fn test_fina_indicator_fields() {
        let fields = TushareClient::fina_indicator_fields();
        assert!(fields.starts_with("ts_code,ann_date,end_date,eps,"));
        assert!(fields.ends_with(",q_ocf_to_or,update_flag"));
        assert_eq!(fields.split(',').count(), 105);
    }
}
