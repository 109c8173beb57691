//! 데이터 출처와 상장 상태 값 객체.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

/// 데이터 출처.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSource {
    /// Tushare Pro
    #[serde(rename = "TUSHARE")]
    Tushare,
    /// AKShare (AKTools 경유)
    #[serde(rename = "AKSHARE")]
    AkShare,
}

impl DataSource {
    /// 저장/해시에 사용하는 문자열 값.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Tushare => "TUSHARE",
            DataSource::AkShare => "AKSHARE",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSource {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TUSHARE" => Ok(DataSource::Tushare),
            "AKSHARE" => Ok(DataSource::AkShare),
            _ => Err(SyncError::InvalidInput(format!("알 수 없는 데이터 출처: {}", s))),
        }
    }
}

/// 상장 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockStatus {
    /// 상장 (L)
    #[serde(rename = "L")]
    Listed,
    /// 상장폐지 (D)
    #[serde(rename = "D")]
    Delisted,
    /// 거래정지 (P)
    #[serde(rename = "P")]
    Suspended,
}

impl StockStatus {
    /// Tushare `list_status` 코드.
    pub fn code(&self) -> &'static str {
        match self {
            StockStatus::Listed => "L",
            StockStatus::Delisted => "D",
            StockStatus::Suspended => "P",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for StockStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "L" => Ok(StockStatus::Listed),
            "D" => Ok(StockStatus::Delisted),
            "P" => Ok(StockStatus::Suspended),
            _ => Err(SyncError::InvalidInput(format!("알 수 없는 상장 상태: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_parse() {
        assert_eq!("akshare".parse::<DataSource>().unwrap(), DataSource::AkShare);
        assert_eq!("TUSHARE".parse::<DataSource>().unwrap(), DataSource::Tushare);
        assert!("wind".parse::<DataSource>().is_err());
    }

    #[test]
    fn test_data_source_serde() {
        let json = serde_json::to_string(&DataSource::AkShare).unwrap();
        assert_eq!(json, r#""AKSHARE""#);
    }

    #[test]
    fn test_stock_status_codes() {
        assert_eq!(" l ".parse::<StockStatus>().unwrap(), StockStatus::Listed);
        assert_eq!("P".parse::<StockStatus>().unwrap(), StockStatus::Suspended);
        assert_eq!(StockStatus::Delisted.to_string(), "D");
        assert!("X".parse::<StockStatus>().is_err());
    }
}
