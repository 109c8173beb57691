//! 개념 섹터와 구성 종목 저장소.

use ashare_core::{Concept, ConceptStock, DataSource};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};

use super::parse_source;
use crate::error::{DataError, Result};

// =============================================================================
// Concept
// =============================================================================

/// `concept` 테이블 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct ConceptRecord {
    pub id: i64,
    pub source: String,
    pub third_code: String,
    pub name: String,
    pub content_hash: String,
    pub last_synced_at: DateTime<Utc>,
}

impl TryFrom<ConceptRecord> for Concept {
    type Error = DataError;

    fn try_from(r: ConceptRecord) -> Result<Self> {
        Ok(Concept {
            id: Some(r.id),
            source: parse_source(&r.source)?,
            third_code: r.third_code,
            name: r.name,
            content_hash: r.content_hash,
            last_synced_at: Some(r.last_synced_at),
        })
    }
}

/// 개념 섹터 저장소.
pub struct ConceptRepository;

impl ConceptRepository {
    /// 출처의 전체 개념 (코드 순).
    pub async fn find_by_source(pool: &PgPool, source: DataSource) -> Result<Vec<Concept>> {
        let records: Vec<ConceptRecord> = sqlx::query_as(
            r#"
            SELECT id, source, third_code, name, content_hash, last_synced_at
            FROM concept
            WHERE source = $1
            ORDER BY third_code
            "#,
        )
        .bind(source.as_str())
        .fetch_all(pool)
        .await?;

        records.into_iter().map(Concept::try_from).collect()
    }

    /// ID로 개념을 조회합니다.
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Concept>> {
        let record: Option<ConceptRecord> = sqlx::query_as(
            r#"
            SELECT id, source, third_code, name, content_hash, last_synced_at
            FROM concept
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        record.map(Concept::try_from).transpose()
    }

    /// 개념을 upsert하고 ID를 반환합니다.
    pub async fn upsert(conn: &mut PgConnection, concept: &Concept) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO concept (source, third_code, name, content_hash, last_synced_at)
            VALUES ($1, $2, $3, $4, COALESCE($5, NOW()))
            ON CONFLICT (source, third_code) DO UPDATE SET
                name = EXCLUDED.name,
                content_hash = EXCLUDED.content_hash,
                last_synced_at = EXCLUDED.last_synced_at,
                updated_at = NOW(),
                version = concept.version + 1
            RETURNING id
            "#,
        )
        .bind(concept.source.as_str())
        .bind(&concept.third_code)
        .bind(&concept.name)
        .bind(&concept.content_hash)
        .bind(concept.last_synced_at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(id)
    }

    /// 내용 변경 없이 동기화 시각과 버전을 갱신합니다.
    pub async fn touch(conn: &mut PgConnection, id: i64, synced_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE concept SET last_synced_at = $2, updated_at = NOW(), version = version + 1 WHERE id = $1",
        )
            .bind(id)
            .bind(synced_at)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// 개념과 구성 종목을 삭제합니다.
    pub async fn delete(conn: &mut PgConnection, id: i64) -> Result<u64> {
        ConceptStockRepository::delete_by_concept(&mut *conn, id).await?;

        let result = sqlx::query("DELETE FROM concept WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }
}

// =============================================================================
// Concept Stock
// =============================================================================

/// `concept_stock` 테이블 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct ConceptStockRecord {
    pub id: i64,
    pub concept_id: i64,
    pub source: String,
    pub stock_third_code: String,
    pub stock_symbol: Option<String>,
    pub content_hash: String,
    pub added_at: DateTime<Utc>,
}

impl TryFrom<ConceptStockRecord> for ConceptStock {
    type Error = DataError;

    fn try_from(r: ConceptStockRecord) -> Result<Self> {
        Ok(ConceptStock {
            id: Some(r.id),
            concept_id: Some(r.concept_id),
            source: parse_source(&r.source)?,
            stock_third_code: r.stock_third_code,
            stock_symbol: r.stock_symbol,
            content_hash: r.content_hash,
            added_at: Some(r.added_at),
        })
    }
}

/// 개념 구성 종목 저장소.
pub struct ConceptStockRepository;

impl ConceptStockRepository {
    /// 개념의 구성 종목 (종목 코드 순).
    pub async fn find_by_concept(pool: &PgPool, concept_id: i64) -> Result<Vec<ConceptStock>> {
        let records: Vec<ConceptStockRecord> = sqlx::query_as(
            r#"
            SELECT id, concept_id, source, stock_third_code, stock_symbol, content_hash, added_at
            FROM concept_stock
            WHERE concept_id = $1
            ORDER BY stock_third_code
            "#,
        )
        .bind(concept_id)
        .fetch_all(pool)
        .await?;

        records.into_iter().map(ConceptStock::try_from).collect()
    }

    /// 구성 종목을 upsert합니다. 기존 행의 `added_at`은 바꾸지 않습니다.
    pub async fn upsert_many(
        conn: &mut PgConnection,
        concept_id: i64,
        stocks: &[ConceptStock],
    ) -> Result<u64> {
        if stocks.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let sources: Vec<&str> = stocks.iter().map(|s| s.source.as_str()).collect();
        let codes: Vec<&str> = stocks.iter().map(|s| s.stock_third_code.as_str()).collect();
        let symbols: Vec<Option<String>> = stocks.iter().map(|s| s.stock_symbol.clone()).collect();
        let hashes: Vec<&str> = stocks.iter().map(|s| s.content_hash.as_str()).collect();
        let added_at: Vec<DateTime<Utc>> =
            stocks.iter().map(|s| s.added_at.unwrap_or(now)).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO concept_stock
                (concept_id, source, stock_third_code, stock_symbol, content_hash, added_at)
            SELECT $1::bigint, * FROM UNNEST(
                $2::varchar[], $3::varchar[], $4::varchar[], $5::varchar[], $6::timestamptz[]
            )
            ON CONFLICT (concept_id, source, stock_third_code) DO UPDATE SET
                stock_symbol = EXCLUDED.stock_symbol,
                content_hash = EXCLUDED.content_hash,
                updated_at = NOW(),
                version = concept_stock.version + 1
            "#,
        )
        .bind(concept_id)
        .bind(&sources)
        .bind(&codes)
        .bind(&symbols)
        .bind(&hashes)
        .bind(&added_at)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// ID 목록의 구성 종목을 삭제합니다.
    pub async fn delete_by_ids(conn: &mut PgConnection, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM concept_stock WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// 개념의 구성 종목을 모두 삭제합니다.
    pub async fn delete_by_concept(conn: &mut PgConnection, concept_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM concept_stock WHERE concept_id = $1")
            .bind(concept_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }
}
