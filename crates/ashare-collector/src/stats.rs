//! 동기화 결과 리포트.
//!
//! 각 유스케이스는 단위별 상세 대신 집계 카운터만 반환합니다.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// 개념 동기화 결과.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptSyncReport {
    /// 원격 개념 수
    pub total_concepts: usize,
    pub new_concepts: usize,
    pub modified_concepts: usize,
    pub deleted_concepts: usize,
    /// 구성 종목 변경 합계 (신규 + 변경 + 삭제)
    pub total_stocks: usize,
    pub new_stocks: usize,
    pub modified_stocks: usize,
    pub deleted_stocks: usize,
    /// 처리 중 실패해 건너뛴 개념 수
    pub failed_concepts: usize,
    pub duration_ms: u64,
}

impl ConceptSyncReport {
    pub(crate) fn finish(&mut self, elapsed: Duration) {
        self.total_stocks = self.new_stocks + self.modified_stocks + self.deleted_stocks;
        self.duration_ms = millis(elapsed);
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self) {
        tracing::info!(
            total_concepts = self.total_concepts,
            new_concepts = self.new_concepts,
            modified_concepts = self.modified_concepts,
            deleted_concepts = self.deleted_concepts,
            new_stocks = self.new_stocks,
            modified_stocks = self.modified_stocks,
            deleted_stocks = self.deleted_stocks,
            failed_concepts = self.failed_concepts,
            duration_ms = self.duration_ms,
            "개념 동기화 완료"
        );
    }
}

/// 종목 기본 정보 동기화 결과.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBasicSyncReport {
    pub synced_count: usize,
    pub duration_ms: u64,
}

impl StockBasicSyncReport {
    pub(crate) fn new(synced_count: usize, elapsed: Duration) -> Self {
        Self {
            synced_count,
            duration_ms: millis(elapsed),
        }
    }

    pub fn log_summary(&self) {
        tracing::info!(
            synced_count = self.synced_count,
            duration_ms = self.duration_ms,
            "종목 기본 정보 동기화 완료"
        );
    }
}

/// 일봉 이력 동기화 결과.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyHistoryReport {
    /// 대상 종목 수
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// 이미 최신이라 건너뛴 종목 수
    pub skipped_count: usize,
    /// 저장한 일봉 행 수
    pub synced_days: usize,
    pub duration_ms: u64,
}

impl DailyHistoryReport {
    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success_count as f64 / self.total as f64) * 100.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!(
            total = self.total,
            success_count = self.success_count,
            failure_count = self.failure_count,
            skipped_count = self.skipped_count,
            synced_days = self.synced_days,
            success_rate = format!("{:.1}%", self.success_rate()),
            duration_ms = self.duration_ms,
            "일봉 이력 동기화 완료"
        );
    }
}

/// 일봉 증분 동기화 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyIncrementReport {
    pub trade_date: NaiveDate,
    pub synced_count: usize,
    pub duration_ms: u64,
}

impl DailyIncrementReport {
    pub fn log_summary(&self) {
        tracing::info!(
            trade_date = %self.trade_date,
            synced_count = self.synced_count,
            duration_ms = self.duration_ms,
            "일봉 증분 동기화 완료"
        );
    }
}

/// 실패 재시도 결과.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryReport {
    pub total: usize,
    pub resolved_count: usize,
    pub still_failed_count: usize,
    pub duration_ms: u64,
}

impl RetryReport {
    pub fn log_summary(&self) {
        tracing::info!(
            total = self.total,
            resolved_count = self.resolved_count,
            still_failed_count = self.still_failed_count,
            duration_ms = self.duration_ms,
            "실패 재시도 완료"
        );
    }
}

/// 재무 지표 동기화 결과.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinanceSyncReport {
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub synced_records: usize,
    pub duration_ms: u64,
}

impl FinanceSyncReport {
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation,
            total = self.total,
            success_count = self.success_count,
            failure_count = self.failure_count,
            synced_records = self.synced_records,
            duration_ms = self.duration_ms,
            "재무 지표 동기화 완료"
        );
    }
}

pub(crate) fn elapsed_ms(elapsed: Duration) -> u64 {
    millis(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concept_report_totals() {
        let mut report = ConceptSyncReport {
            new_stocks: 3,
            modified_stocks: 1,
            deleted_stocks: 2,
            ..Default::default()
        };
        report.finish(Duration::from_millis(1500));
        assert_eq!(report.total_stocks, 6);
        assert_eq!(report.duration_ms, 1500);
    }

    #[test]
    fn test_success_rate() {
        let report = DailyHistoryReport {
            total: 4,
            success_count: 3,
            ..Default::default()
        };
        assert!((report.success_rate() - 75.0).abs() < f64::EPSILON);
        assert_eq!(DailyHistoryReport::default().success_rate(), 0.0);
    }

    #[test]
    fn test_report_serializes_snake_case() {
        let json = serde_json::to_value(RetryReport {
            total: 2,
            resolved_count: 1,
            still_failed_count: 1,
            duration_ms: 5,
        })
        .unwrap();
        assert_eq!(json["still_failed_count"], 1);
    }
}
