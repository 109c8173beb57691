//! 재무 지표.
//!
//! Tushare `fina_indicator` 응답 한 행이 하나의 [`StockFinancial`]이 됩니다.
//! 지표가 101개라서 구조체 필드 대신 이름 → 값 맵으로 보관하고,
//! 컬럼 순서는 [`FINANCIAL_INDICATOR_FIELDS`]가 결정합니다.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::domain::DataSource;

/// 재무 지표 컬럼 목록 (저장 순서 = 응답 필드 요청 순서).
pub const FINANCIAL_INDICATOR_FIELDS: [&str; 101] = [
    "eps", "dt_eps", "total_revenue_ps", "revenue_ps", "capital_rese_ps", "surplus_rese_ps",
    "undist_profit_ps", "extra_item", "profit_dedt", "gross_margin", "current_ratio",
    "quick_ratio", "cash_ratio", "ar_turn", "ca_turn", "fa_turn", "assets_turn", "op_income",
    "ebit", "ebitda", "fcff", "fcfe", "current_exint", "noncurrent_exint", "interestdebt",
    "netdebt", "tangible_asset", "working_capital", "networking_capital", "invest_capital",
    "retained_earnings", "diluted2_eps", "bps", "ocfps", "retainedps", "cfps", "ebit_ps",
    "fcff_ps", "fcfe_ps", "netprofit_margin", "grossprofit_margin", "cogs_of_sales",
    "expense_of_sales", "profit_to_gr", "saleexp_to_gr", "adminexp_to_gr", "finaexp_to_gr",
    "impai_ttm", "gc_of_gr", "op_of_gr", "ebit_of_gr", "roe", "roe_waa", "roe_dt", "roa",
    "npta", "roic", "roe_yearly", "roa2_yearly", "debt_to_assets", "assets_to_eqt",
    "dp_assets_to_eqt", "ca_to_assets", "nca_to_assets", "tbassets_to_totalassets",
    "int_to_talcap", "eqt_to_talcap", "currentdebt_to_debt", "longdeb_to_debt",
    "ocf_to_shortdebt", "ocf_to_interestdebt", "ocf_to_debt", "cash_to_liqdebt",
    "cash_to_liqdebt_withinterest", "op_to_liqdebt", "op_to_debt", "roic_yearly",
    "profit_to_op", "q_opincome", "q_investincome", "q_dtprofit", "q_eps",
    "q_netprofit_margin", "q_gsprofit_margin", "q_exp_to_sales", "q_profit_to_gr",
    "q_saleexp_to_gr", "q_adminexp_to_gr", "q_finaexp_to_gr", "q_impai_to_gr_ttm",
    "q_gc_to_gr", "q_op_to_gr", "q_roe", "q_dt_roe", "q_npta", "q_opincome_to_ebt",
    "q_investincome_to_ebt", "q_dtprofit_to_profit", "q_salescash_to_or", "q_ocf_to_sales",
    "q_ocf_to_or",
];

/// 금액 단위가 큰 지표 (NUMERIC(24,6)로 저장). 나머지는 주당/비율 지표입니다.
pub const LARGE_AMOUNT_FIELDS: [&str; 19] = [
    "profit_dedt", "gross_margin", "op_income", "ebit", "ebitda", "fcff", "fcfe",
    "current_exint", "noncurrent_exint", "interestdebt", "netdebt", "tangible_asset",
    "working_capital", "networking_capital", "invest_capital", "retained_earnings",
    "q_opincome", "q_investincome", "q_dtprofit",
];

/// 종목 재무 지표. `(source, third_code, end_date)`가 자연키입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockFinancial {
    pub source: DataSource,
    pub third_code: String,
    /// 종목 기본 정보에서 채워지는 심볼
    pub symbol: Option<String>,
    /// 공시일
    pub ann_date: Option<NaiveDate>,
    /// 보고 기간 종료일
    pub end_date: NaiveDate,
    /// 값이 있는 지표만 담습니다
    pub indicators: BTreeMap<String, Decimal>,
    /// 갱신 표시
    pub update_flag: Option<String>,
}

impl StockFinancial {
    /// 지표 없이 생성합니다.
    pub fn new(source: DataSource, third_code: impl Into<String>, end_date: NaiveDate) -> Self {
        Self {
            source,
            third_code: third_code.into(),
            symbol: None,
            ann_date: None,
            end_date,
            indicators: BTreeMap::new(),
            update_flag: None,
        }
    }

    /// 지표 값을 조회합니다.
    pub fn indicator(&self, name: &str) -> Option<Decimal> {
        self.indicators.get(name).copied()
    }

    /// 지표 값을 설정합니다. 알려지지 않은 이름은 무시하고 false를 반환합니다.
    pub fn set_indicator(&mut self, name: &str, value: Option<Decimal>) -> bool {
        if !is_indicator_field(name) {
            return false;
        }
        match value {
            Some(v) => {
                self.indicators.insert(name.to_string(), v);
            }
            None => {
                self.indicators.remove(name);
            }
        }
        true
    }

    /// 컬럼 순서대로 지표 값을 나열합니다 (없으면 None).
    pub fn indicator_values(&self) -> impl Iterator<Item = Option<Decimal>> + '_ {
        FINANCIAL_INDICATOR_FIELDS
            .iter()
            .map(move |name| self.indicator(name))
    }

    /// 심볼을 지정합니다.
    pub fn with_symbol(mut self, symbol: Option<String>) -> Self {
        self.symbol = symbol;
        self
    }

    /// 정정 공시 행인지 (`update_flag = "1"`).
    pub fn is_updated(&self) -> bool {
        self.update_flag.as_deref() == Some("1")
    }
}

/// 같은 `(source, third_code, end_date)` 행을 하나로 합칩니다.
///
/// `update_flag = "1"` 행이 우선하고, 같은 등급이면 뒤에 온 행이 남습니다.
/// 결과는 각 키가 처음 등장한 순서를 유지합니다.
pub fn dedupe_by_period(rows: Vec<StockFinancial>) -> Vec<StockFinancial> {
    let mut index: HashMap<(DataSource, String, NaiveDate), usize> = HashMap::new();
    let mut deduped: Vec<StockFinancial> = Vec::with_capacity(rows.len());

    for row in rows {
        let key = (row.source, row.third_code.clone(), row.end_date);
        match index.get(&key) {
            Some(&pos) => {
                if row.is_updated() || !deduped[pos].is_updated() {
                    deduped[pos] = row;
                }
            }
            None => {
                index.insert(key, deduped.len());
                deduped.push(row);
            }
        }
    }

    deduped
}

/// 재무 지표 컬럼 이름인지 확인합니다.
pub fn is_indicator_field(name: &str) -> bool {
    FINANCIAL_INDICATOR_FIELDS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    #[test]
    fn test_field_list_has_no_duplicates() {
        let unique: HashSet<_> = FINANCIAL_INDICATOR_FIELDS.iter().collect();
        assert_eq!(unique.len(), FINANCIAL_INDICATOR_FIELDS.len());
        assert!(LARGE_AMOUNT_FIELDS.iter().all(|f| is_indicator_field(f)));
    }

    #[test]
    fn test_set_indicator() {
        let mut financial = StockFinancial::new(
            DataSource::Tushare,
            "600000.SH",
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        );

        assert!(financial.set_indicator("roe", Some(dec!(8.12))));
        assert!(!financial.set_indicator("not_a_field", Some(dec!(1))));
        assert_eq!(financial.indicator("roe"), Some(dec!(8.12)));

        assert!(financial.set_indicator("roe", None));
        assert_eq!(financial.indicator("roe"), None);
    }

    #[test]
    fn test_indicator_values_follow_column_order() {
        let mut financial = StockFinancial::new(
            DataSource::Tushare,
            "600000.SH",
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        );
        financial.set_indicator("eps", Some(dec!(0.5)));
        financial.set_indicator("q_ocf_to_or", Some(dec!(2)));

        let values: Vec<_> = financial.indicator_values().collect();
        assert_eq!(values.len(), 101);
        assert_eq!(values[0], Some(dec!(0.5)));
        assert_eq!(values[100], Some(dec!(2)));
        assert_eq!(values.iter().filter(|v| v.is_some()).count(), 2);
    }

    fn flagged(code: &str, end: NaiveDate, flag: &str, roe: Decimal) -> StockFinancial {
        let mut row = StockFinancial::new(DataSource::Tushare, code, end);
        row.update_flag = Some(flag.to_string());
        row.set_indicator("roe", Some(roe));
        row
    }

    #[test]
    fn test_dedupe_prefers_updated_row() {
        let end = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let prev = NaiveDate::from_ymd_opt(2023, 9, 30).unwrap();

        let rows = vec![
            flagged("000001.SZ", end, "1", dec!(9.1)),
            flagged("000001.SZ", prev, "0", dec!(6.0)),
            flagged("000001.SZ", end, "0", dec!(8.0)),
        ];
        let deduped = dedupe_by_period(rows);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].end_date, end);
        assert_eq!(deduped[0].indicator("roe"), Some(dec!(9.1)));
        assert_eq!(deduped[1].end_date, prev);
    }

    #[test]
    fn test_dedupe_keeps_last_of_same_flag() {
        let end = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let mut unflagged = StockFinancial::new(DataSource::Tushare, "000001.SZ", end);
        unflagged.set_indicator("roe", Some(dec!(1)));

        let rows = vec![
            unflagged,
            flagged("000001.SZ", end, "0", dec!(2)),
            flagged("000001.SZ", end, "0", dec!(3)),
            flagged("600000.SH", end, "0", dec!(4)),
        ];
        let deduped = dedupe_by_period(rows);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].indicator("roe"), Some(dec!(3)));
        assert_eq!(deduped[1].third_code, "600000.SH");
    }
}
