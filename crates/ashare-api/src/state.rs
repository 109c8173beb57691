//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! 연결 풀과 게이트웨이는 [`SyncContext`] 하나에 묶여 있고, `Arc<AppState>`로 요청 간에 공유됩니다.

use ashare_collector::SyncContext;
use chrono::{DateTime, Utc};

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 동기화 유스케이스 컨텍스트 (저장소 + 게이트웨이 + 동기화 설정)
    pub ctx: SyncContext,

    /// API 버전
    pub version: String,

    /// 서버 시작 시간
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            ctx,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
        }
    }

    /// 서버 업타임 (초).
    pub fn uptime_secs(&self) -> i64 {
        Utc::now().signed_duration_since(self.started_at).num_seconds()
    }

    /// 데이터베이스 상태 확인.
    pub async fn is_db_healthy(&self) -> bool {
        match self.ctx.store.health_check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "데이터베이스 상태 확인 실패");
                false
            }
        }
    }
}

/// 메모리 저장소와 가짜 게이트웨이로 구성한 테스트 상태.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> (
    AppState,
    std::sync::Arc<ashare_collector::testing::MemoryStore>,
    std::sync::Arc<ashare_collector::testing::FakeTushare>,
    std::sync::Arc<ashare_collector::testing::FakeConceptGateway>,
) {
    use ashare_collector::testing::{context, FakeConceptGateway, FakeTushare, MemoryStore};
    use std::sync::Arc;

    let store = Arc::new(MemoryStore::new());
    let tushare = Arc::new(FakeTushare::new());
    let concepts = Arc::new(FakeConceptGateway::new());
    let ctx = context(store.clone(), tushare.clone(), concepts.clone());
    (AppState::new(ctx), store, tushare, concepts)
}
