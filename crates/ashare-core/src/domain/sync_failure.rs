//! 일봉 동기화 실패 기록.
//!
//! 실패한 동기화 단위(종목 + 기간)를 남겨 두었다가 재시도 단계에서 같은 범위를 다시 가져옵니다.
//! 해결된 기록은 삭제하지 않고 `resolved = true`로만 표시합니다.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DataSource;

/// 저장된 실패 기록.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub id: i64,
    pub source: DataSource,
    pub third_code: String,
    /// 실패한 범위 시작일
    pub start_date: NaiveDate,
    /// 실패한 범위 종료일
    pub end_date: NaiveDate,
    pub error_message: String,
    /// 마지막 실패 시각
    pub failed_at: DateTime<Utc>,
    pub retry_count: i32,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

impl SyncFailure {
    /// 재시도 대상인지 확인합니다 (미해결이고 재시도 횟수가 상한 미만).
    pub fn is_retry_eligible(&self, max_retries: i32) -> bool {
        !self.resolved && self.retry_count < max_retries
    }
}

/// 새로 기록할 실패.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSyncFailure {
    pub source: DataSource,
    pub third_code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub error_message: String,
    pub failed_at: DateTime<Utc>,
}

impl NewSyncFailure {
    /// 현재 시각으로 실패를 생성합니다.
    pub fn now(
        source: DataSource,
        third_code: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            third_code: third_code.into(),
            start_date,
            end_date,
            error_message: error_message.into(),
            failed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(retry_count: i32, resolved: bool) -> SyncFailure {
        SyncFailure {
            id: 1,
            source: DataSource::Tushare,
            third_code: "000001.SZ".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            error_message: "timeout".to_string(),
            failed_at: Utc::now(),
            retry_count,
            resolved,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_retry_eligibility() {
        assert!(failure(0, false).is_retry_eligible(3));
        assert!(failure(2, false).is_retry_eligible(3));
        assert!(!failure(3, false).is_retry_eligible(3));
        assert!(!failure(0, true).is_retry_eligible(3));
        assert!(!failure(0, true).is_retry_eligible(i32::MAX));
    }
}
