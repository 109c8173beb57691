//! 연결 풀 래퍼.

use ashare_core::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::error::{DataError, Result};

/// 데이터베이스 연결 풀 래퍼.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 설정으로 연결 풀을 생성합니다.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!(
            max_connections = config.max_connections,
            "데이터베이스 연결 중..."
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(config.idle_timeout())
            .connect(&config.url)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        info!("데이터베이스 연결 완료");
        Ok(Self { pool })
    }

    /// 이미 만들어진 풀을 감쌉니다.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 풀을 꺼냅니다.
    pub fn into_pool(self) -> PgPool {
        self.pool
    }

    /// 내장된 마이그레이션을 실행합니다.
    pub async fn migrate(&self) -> Result<()> {
        info!("마이그레이션 실행 중...");

        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DataError::MigrationError(e.to_string()))?;

        info!("마이그레이션 완료");
        Ok(())
    }

    /// `SELECT 1`로 연결 상태를 확인합니다.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DataError::QueryError(e.to_string()))?;
        Ok(())
    }
}
