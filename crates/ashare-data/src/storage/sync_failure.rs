//! 일봉 동기화 실패 기록 저장소.
//!
//! 같은 범위(`source, third_code, start_date, end_date`)의 미해결 기록은 부분 유니크
//! 인덱스로 하나만 유지합니다. 다시 실패하면 새 행을 만들지 않고 `retry_count`를 올립니다.

use ashare_core::{NewSyncFailure, SyncFailure};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::debug;

use super::parse_source;
use crate::error::{DataError, Result};

/// `stock_daily_sync_failure` 테이블 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct SyncFailureRecord {
    pub id: i64,
    pub source: String,
    pub third_code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub error_message: String,
    pub failed_at: DateTime<Utc>,
    pub retry_count: i32,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SyncFailureRecord> for SyncFailure {
    type Error = DataError;

    fn try_from(r: SyncFailureRecord) -> Result<Self> {
        Ok(SyncFailure {
            id: r.id,
            source: parse_source(&r.source)?,
            third_code: r.third_code,
            start_date: r.start_date,
            end_date: r.end_date,
            error_message: r.error_message,
            failed_at: r.failed_at,
            retry_count: r.retry_count,
            resolved: r.resolved,
            created_at: r.created_at,
        })
    }
}

/// 실패 기록 저장소.
pub struct SyncFailureRepository;

impl SyncFailureRepository {
    /// 실패를 기록하고 ID를 반환합니다.
    ///
    /// 같은 범위의 미해결 기록이 있으면 `retry_count`를 올리고 메시지와 시각을 갱신합니다.
    pub async fn record(conn: &mut PgConnection, failure: &NewSyncFailure) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO stock_daily_sync_failure
                (source, third_code, start_date, end_date, error_message, failed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source, third_code, start_date, end_date) WHERE resolved = FALSE
            DO UPDATE SET
                retry_count = stock_daily_sync_failure.retry_count + 1,
                error_message = EXCLUDED.error_message,
                failed_at = EXCLUDED.failed_at,
                updated_at = NOW(),
                version = stock_daily_sync_failure.version + 1
            RETURNING id
            "#,
        )
        .bind(failure.source.as_str())
        .bind(&failure.third_code)
        .bind(failure.start_date)
        .bind(failure.end_date)
        .bind(&failure.error_message)
        .bind(failure.failed_at)
        .fetch_one(&mut *conn)
        .await?;

        debug!(id, third_code = %failure.third_code, "동기화 실패 기록");
        Ok(id)
    }

    /// 재시도 대상 (미해결, `retry_count < max_retries`), 오래된 순.
    pub async fn find_unresolved(pool: &PgPool, max_retries: i32) -> Result<Vec<SyncFailure>> {
        let records: Vec<SyncFailureRecord> = sqlx::query_as(
            r#"
            SELECT id, source, third_code, start_date, end_date, error_message,
                   failed_at, retry_count, resolved, created_at
            FROM stock_daily_sync_failure
            WHERE resolved = FALSE AND retry_count < $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(max_retries)
        .fetch_all(pool)
        .await?;

        records.into_iter().map(SyncFailure::try_from).collect()
    }

    /// 해결 처리합니다. 이미 해결된 기록이면 아무것도 바꾸지 않습니다.
    pub async fn mark_resolved(conn: &mut PgConnection, id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE stock_daily_sync_failure
            SET resolved = TRUE, updated_at = NOW(), version = version + 1
            WHERE id = $1 AND resolved = FALSE
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// 재시도 실패를 반영합니다.
    pub async fn record_retry_failure(
        conn: &mut PgConnection,
        id: i64,
        error_message: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE stock_daily_sync_failure
            SET retry_count = retry_count + 1,
                error_message = $2,
                failed_at = NOW(),
                updated_at = NOW(),
                version = version + 1
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error_message)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}
