//! 전체 워크플로우.
//!
//! 종목 기본 정보 → 개념 → 일봉 증분 → 실패 재시도 → 재무 증분 순서로 실행합니다.
//! 한 단계가 실패해도 로그만 남기고 다음 단계로 진행합니다.

use ashare_core::ApplyMode;

use super::{
    retry_daily_failures, sync_concepts, sync_daily_increment, sync_finance_increment,
    sync_stock_basic,
};
use crate::SyncContext;

/// 워크플로우 단계 결과.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowSummary {
    pub succeeded: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

impl WorkflowSummary {
    fn record<T, E: std::fmt::Display>(&mut self, step: &'static str, result: Result<T, E>) {
        match result {
            Ok(_) => self.succeeded.push(step),
            Err(e) => {
                tracing::error!(step, error = %e, "워크플로우 단계 실패");
                self.failed.push(step);
            }
        }
    }
}

/// 전체 워크플로우를 한 번 실행합니다.
pub async fn run_workflow(ctx: &SyncContext) -> WorkflowSummary {
    tracing::info!("=== 전체 워크플로우 시작 ===");
    let mut summary = WorkflowSummary::default();

    tracing::info!("Step 1/5: 종목 기본 정보 동기화");
    summary.record("stock_basic", sync_stock_basic(ctx).await);

    tracing::info!("Step 2/5: 개념 동기화");
    summary.record("concepts", sync_concepts(ctx, ApplyMode::PerUnit).await);

    tracing::info!("Step 3/5: 일봉 증분 동기화");
    summary.record("daily_increment", sync_daily_increment(ctx, None).await);

    tracing::info!("Step 4/5: 실패 재시도");
    summary.record(
        "retry_failures",
        retry_daily_failures(ctx, ctx.settings.default_max_retries).await,
    );

    tracing::info!("Step 5/5: 재무 지표 증분 동기화");
    summary.record("finance_increment", sync_finance_increment(ctx, None).await);

    tracing::info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        "=== 전체 워크플로우 완료 ==="
    );
    summary
}
