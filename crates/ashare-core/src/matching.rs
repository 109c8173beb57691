//! 개념 구성 종목 코드 매칭.
//!
//! AKShare는 `000001`처럼 접미사 없는 코드를, 로컬 종목 기본 정보는 `000001.SZ` 형식을 씁니다.
//! 아래 순서로 시도하며 처음 일치한 종목을 사용합니다.
//!
//! 1. `symbol` 정확 일치
//! 2. `third_code` 정확 일치
//! 3. `{code}.SH`, `{code}.SZ`, `{code}.BJ` 순서로 `third_code` 일치
//!
//! 어느 것도 맞지 않으면 None을 반환하고 호출 측은 해당 종목을 건너뜁니다.

use std::collections::HashMap;

use crate::domain::StockBasic;

/// 접미사 후보 (시도 순서).
pub const EXCHANGE_SUFFIXES: [&str; 3] = ["SH", "SZ", "BJ"];

/// 매칭 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedStock {
    /// 로컬 종목 코드 (예: 000001.SZ)
    pub third_code: String,
    /// 로컬 심볼 (예: 000001)
    pub symbol: String,
}

/// 종목 기본 정보 기반 코드 매처.
#[derive(Debug, Clone, Default)]
pub struct StockMatcher {
    by_symbol: HashMap<String, MatchedStock>,
    by_third_code: HashMap<String, MatchedStock>,
}

impl StockMatcher {
    /// 종목 목록으로 매처를 생성합니다. 같은 심볼이 여러 번 나오면 먼저 나온 종목을 사용합니다.
    pub fn new<'a, I>(stocks: I) -> Self
    where
        I: IntoIterator<Item = &'a StockBasic>,
    {
        let mut matcher = Self::default();
        for stock in stocks {
            let matched = MatchedStock {
                third_code: stock.third_code.clone(),
                symbol: stock.symbol.clone(),
            };
            matcher
                .by_symbol
                .entry(stock.symbol.clone())
                .or_insert_with(|| matched.clone());
            matcher
                .by_third_code
                .entry(stock.third_code.clone())
                .or_insert(matched);
        }
        matcher
    }

    /// 원격 코드를 로컬 종목으로 매칭합니다.
    pub fn resolve(&self, code: &str) -> Option<&MatchedStock> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }

        if let Some(found) = self.by_symbol.get(code) {
            return Some(found);
        }
        if let Some(found) = self.by_third_code.get(code) {
            return Some(found);
        }

        EXCHANGE_SUFFIXES
            .iter()
            .find_map(|suffix| self.by_third_code.get(&format!("{}.{}", code, suffix)))
    }

    /// 등록된 종목 수.
    pub fn len(&self) -> usize {
        self.by_third_code.len()
    }

    /// 비어 있는지 여부.
    pub fn is_empty(&self) -> bool {
        self.by_third_code.is_empty()
    }
}

/// Tushare `ts_code` 형식(`000001.SZ`)인지 확인합니다.
///
/// 6자리 숫자 뒤에 `.SH`, `.SZ`, `.BJ` 중 하나가 붙어야 합니다.
pub fn is_ts_code(code: &str) -> bool {
    match code.split_once('.') {
        Some((digits, suffix)) => {
            digits.len() == 6
                && digits.bytes().all(|b| b.is_ascii_digit())
                && EXCHANGE_SUFFIXES.contains(&suffix)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DataSource, StockStatus};
    use chrono::NaiveDate;

    fn basic(third_code: &str, symbol: &str) -> StockBasic {
        StockBasic {
            id: None,
            source: DataSource::Tushare,
            third_code: third_code.to_string(),
            symbol: symbol.to_string(),
            name: String::new(),
            market: String::new(),
            area: String::new(),
            industry: String::new(),
            list_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            status: StockStatus::Listed,
        }
    }

    #[test]
    fn test_exact_symbol_first() {
        let stocks = vec![basic("000001.SZ", "000001"), basic("600000.SH", "600000")];
        let matcher = StockMatcher::new(&stocks);

        let found = matcher.resolve("000001").unwrap();
        assert_eq!(found.third_code, "000001.SZ");
        assert_eq!(found.symbol, "000001");
    }

    #[test]
    fn test_exact_third_code() {
        let stocks = vec![basic("600000.SH", "600000")];
        let matcher = StockMatcher::new(&stocks);
        assert_eq!(matcher.resolve("600000.SH").unwrap().symbol, "600000");
    }

    #[test]
    fn test_suffix_candidates_in_order() {
        // 심볼이 코드와 다르게 저장된 경우 접미사 후보로 찾습니다.
        let stocks = vec![basic("830799.BJ", "BJ830799"), basic("830799.SZ", "SZ830799")];
        let matcher = StockMatcher::new(&stocks);
        assert_eq!(matcher.resolve("830799").unwrap().third_code, "830799.SZ");
    }

    #[test]
    fn test_unmatched_is_none() {
        let stocks = vec![basic("000001.SZ", "000001")];
        let matcher = StockMatcher::new(&stocks);
        assert!(matcher.resolve("999999").is_none());
        assert!(matcher.resolve("  ").is_none());
        assert_eq!(matcher.len(), 1);
    }

    #[test]
    fn test_is_ts_code() {
        assert!(is_ts_code("000001.SZ"));
        assert!(is_ts_code("830799.BJ"));
        assert!(!is_ts_code("000001"));
        assert!(!is_ts_code("000001.sz"));
        assert!(!is_ts_code("00001.SZ"));
        assert!(!is_ts_code("ABCDEF.SH"));
    }
}
