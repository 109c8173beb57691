//! 개념 섹터 동기화 모듈.
//!
//! AKShare 개념 목록을 로컬 미러와 비교하고 개념 단위로 반영합니다.
//! 원격 목록 조회가 실패하면 전체가 중단되고, 개별 개념의 실패는 [`ApplyMode`]에 따라
//! 건너뛰거나(PerUnit) 전체를 롤백합니다(AtomicBatch).

use ashare_core::{
    ApplyMode, Concept, ConceptStock, DataSource, Matched, ReconcilePlan, StockMatcher,
};
use ashare_data::ConceptChange;
use chrono::{DateTime, Utc};
use std::time::Instant;

use crate::error::{CollectorError, Result};
use crate::stats::ConceptSyncReport;
use crate::SyncContext;

/// 처리 단위 하나.
enum ConceptUnit {
    New(Concept),
    Modified(Matched<Concept>),
    Unchanged(Matched<Concept>),
    Deleted(Concept),
}

impl ConceptUnit {
    fn third_code(&self) -> &str {
        match self {
            ConceptUnit::New(c) | ConceptUnit::Deleted(c) => &c.third_code,
            ConceptUnit::Modified(m) | ConceptUnit::Unchanged(m) => &m.remote.third_code,
        }
    }
}

/// 단위 하나가 반영되었을 때 더할 건수.
#[derive(Debug, Clone, Copy, Default)]
struct UnitTally {
    new_concepts: usize,
    modified_concepts: usize,
    deleted_concepts: usize,
    new_stocks: usize,
    modified_stocks: usize,
    deleted_stocks: usize,
}

impl UnitTally {
    fn merge(&mut self, other: UnitTally) {
        self.new_concepts += other.new_concepts;
        self.modified_concepts += other.modified_concepts;
        self.deleted_concepts += other.deleted_concepts;
        self.new_stocks += other.new_stocks;
        self.modified_stocks += other.modified_stocks;
        self.deleted_stocks += other.deleted_stocks;
    }

    fn apply_to(self, report: &mut ConceptSyncReport) {
        report.new_concepts += self.new_concepts;
        report.modified_concepts += self.modified_concepts;
        report.deleted_concepts += self.deleted_concepts;
        report.new_stocks += self.new_stocks;
        report.modified_stocks += self.modified_stocks;
        report.deleted_stocks += self.deleted_stocks;
    }
}

struct PreparedUnit {
    change: ConceptChange,
    tally: UnitTally,
}

/// 개념 섹터 동기화.
pub async fn sync_concepts(ctx: &SyncContext, mode: ApplyMode) -> Result<ConceptSyncReport> {
    let start = Instant::now();
    let now = Utc::now();

    tracing::info!(mode = %mode, "개념 동기화 시작");

    // 원격 목록 실패는 전체 중단
    let remote = ctx.concept_gateway.fetch_concepts().await?;
    let local = ctx.store.find_concepts(DataSource::AkShare).await?;
    let stocks = ctx.store.find_listed_stocks(DataSource::Tushare).await?;
    let matcher = StockMatcher::new(&stocks);

    let mut report = ConceptSyncReport {
        total_concepts: remote.len(),
        ..Default::default()
    };

    let plan = ReconcilePlan::build(remote, local);
    let counts = plan.counts();
    tracing::info!(
        new = counts.new,
        modified = counts.modified,
        unchanged = counts.unchanged,
        deleted = counts.deleted,
        listed_stocks = matcher.len(),
        "개념 비교 완료"
    );

    let units: Vec<ConceptUnit> = plan
        .new
        .into_iter()
        .map(ConceptUnit::New)
        .chain(plan.modified.into_iter().map(ConceptUnit::Modified))
        .chain(plan.unchanged.into_iter().map(ConceptUnit::Unchanged))
        .chain(plan.deleted.into_iter().map(ConceptUnit::Deleted))
        .collect();

    let batch_size = ctx.settings.concept_batch_size.max(1);
    let mut pending: Vec<ConceptChange> = Vec::new();
    let mut pending_tally = UnitTally::default();
    let mut processed = 0;

    for batch in units.chunks(batch_size) {
        for unit in batch {
            let code = unit.third_code();
            match mode {
                ApplyMode::PerUnit => {
                    let result = ctx
                        .run_unit(code, async {
                            let prepared = prepare_unit(ctx, &matcher, unit, now).await?;
                            ctx.store
                                .apply_concept_changes(std::slice::from_ref(&prepared.change))
                                .await?;
                            Ok::<_, CollectorError>(prepared.tally)
                        })
                        .await;

                    match result {
                        Ok(tally) => tally.apply_to(&mut report),
                        Err(e) => {
                            report.failed_concepts += 1;
                            tracing::error!(third_code = code, error = %e, "개념 처리 실패, 건너뜀");
                        }
                    }
                }
                ApplyMode::AtomicBatch => {
                    let prepared = ctx
                        .run_unit(code, prepare_unit(ctx, &matcher, unit, now))
                        .await
                        .inspect_err(|e| {
                            tracing::error!(third_code = code, error = %e, "개념 처리 실패, 전체 중단");
                        })?;
                    pending.push(prepared.change);
                    pending_tally.merge(prepared.tally);
                }
            }
        }

        processed += batch.len();
        tracing::info!(
            progress = format!("{}/{}", processed, units.len()),
            failed = report.failed_concepts,
            "개념 배치 처리"
        );
    }

    if mode == ApplyMode::AtomicBatch && !pending.is_empty() {
        ctx.store.apply_concept_changes(&pending).await?;
        pending_tally.apply_to(&mut report);
    }

    report.finish(start.elapsed());
    report.log_summary();
    Ok(report)
}

async fn prepare_unit(
    ctx: &SyncContext,
    matcher: &StockMatcher,
    unit: &ConceptUnit,
    now: DateTime<Utc>,
) -> Result<PreparedUnit> {
    match unit {
        ConceptUnit::New(remote) => {
            let members = ReconcilePlan::build(fetch_members(ctx, matcher, remote).await?, Vec::new());
            let stock_upserts: Vec<ConceptStock> = members
                .new
                .into_iter()
                .map(|s| added_at(s, now))
                .collect();

            Ok(PreparedUnit {
                tally: UnitTally {
                    new_concepts: 1,
                    new_stocks: stock_upserts.len(),
                    ..Default::default()
                },
                change: ConceptChange::Upsert {
                    concept: remote.clone().synced_at(now),
                    stock_upserts,
                    stock_deletes: Vec::new(),
                },
            })
        }
        ConceptUnit::Modified(pair) => {
            let concept_id = local_id(&pair.local)?;
            let remote_members = fetch_members(ctx, matcher, &pair.remote).await?;
            let local_members = ctx.store.find_concept_stocks(concept_id).await?;
            let members = ReconcilePlan::build(remote_members, local_members);

            let tally = UnitTally {
                modified_concepts: 1,
                new_stocks: members.new.len(),
                modified_stocks: members.modified.len(),
                deleted_stocks: members.deleted.len(),
                ..Default::default()
            };

            let stock_deletes: Vec<i64> = members.deleted.iter().filter_map(|s| s.id).collect();
            let stock_upserts: Vec<ConceptStock> = members
                .new
                .into_iter()
                .map(|mut s| {
                    s.concept_id = Some(concept_id);
                    added_at(s, now)
                })
                .chain(
                    members
                        .modified
                        .into_iter()
                        .map(|m| m.remote.with_identity_of(&m.local)),
                )
                .collect();

            Ok(PreparedUnit {
                tally,
                change: ConceptChange::Upsert {
                    concept: pair.remote.clone().with_identity_of(&pair.local).synced_at(now),
                    stock_upserts,
                    stock_deletes,
                },
            })
        }
        ConceptUnit::Unchanged(pair) => Ok(PreparedUnit {
            tally: UnitTally::default(),
            change: ConceptChange::Touch {
                concept_id: local_id(&pair.local)?,
                synced_at: now,
            },
        }),
        ConceptUnit::Deleted(local) => {
            let concept_id = local_id(local)?;
            let members = ctx.store.find_concept_stocks(concept_id).await?;
            Ok(PreparedUnit {
                tally: UnitTally {
                    deleted_concepts: 1,
                    deleted_stocks: members.len(),
                    ..Default::default()
                },
                change: ConceptChange::Delete { concept_id },
            })
        }
    }
}

/// 구성 종목을 가져와 로컬 종목 코드로 매칭합니다. 매칭되지 않은 종목은 버립니다.
async fn fetch_members(
    ctx: &SyncContext,
    matcher: &StockMatcher,
    concept: &Concept,
) -> Result<Vec<ConceptStock>> {
    let members = ctx
        .concept_gateway
        .fetch_concept_stocks(&concept.third_code, &concept.name)
        .await?;

    let total = members.len();
    let matched: Vec<ConceptStock> = members
        .iter()
        .filter_map(|m| matcher.resolve(&m.code))
        .map(|s| ConceptStock::new(DataSource::AkShare, s.third_code.clone(), Some(s.symbol.clone())))
        .collect();

    if matched.len() < total {
        tracing::debug!(
            third_code = %concept.third_code,
            skipped = total - matched.len(),
            "매칭되지 않은 구성 종목 건너뜀"
        );
    }
    Ok(matched)
}

fn added_at(mut stock: ConceptStock, now: DateTime<Utc>) -> ConceptStock {
    stock.added_at = Some(now);
    stock
}

fn local_id(concept: &Concept) -> Result<i64> {
    concept
        .id
        .ok_or_else(|| CollectorError::Other(format!("concept {} has no id", concept.third_code)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{listed_stock, FakeConceptGateway, FakeTushare, MemoryStore};
    use ashare_data::{ConceptStore, StockBasicStore};
    use std::sync::Arc;

    async fn setup() -> (Arc<MemoryStore>, Arc<FakeConceptGateway>, SyncContext) {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_stock_basics(&[
                listed_stock("000001.SZ", "000001"),
                listed_stock("600000.SH", "600000"),
                listed_stock("830799.BJ", "830799"),
            ])
            .await
            .unwrap();
        let concepts = Arc::new(FakeConceptGateway::new());
        let ctx = crate::testing::context(store.clone(), Arc::new(FakeTushare::new()), concepts.clone());
        (store, concepts, ctx)
    }

    #[tokio::test]
    async fn test_first_sync_inserts_everything() {
        let (store, gateway, ctx) = setup().await;
        gateway.set_concepts(&[("BK0818", "人工智能"), ("BK0001", "银行")]);
        gateway.set_members("BK0818", &[("000001", "平安银行"), ("600000", "浦发银行"), ("999999", "未知")]);
        gateway.set_members("BK0001", &[("000001", "平安银行")]);

        let report = sync_concepts(&ctx, ApplyMode::PerUnit).await.unwrap();

        assert_eq!(report.total_concepts, 2);
        assert_eq!(report.new_concepts, 2);
        assert_eq!(report.new_stocks, 3);
        assert_eq!(report.total_stocks, 3);
        assert_eq!(report.failed_concepts, 0);

        let concepts = store.find_concepts(DataSource::AkShare).await.unwrap();
        assert_eq!(concepts.len(), 2);
        assert!(concepts.iter().all(|c| c.is_hash_consistent()));
    }

    #[tokio::test]
    async fn test_second_sync_is_noop() {
        let (_store, gateway, ctx) = setup().await;
        gateway.set_concepts(&[("BK0818", "人工智能")]);
        gateway.set_members("BK0818", &[("000001", "平安银行")]);

        sync_concepts(&ctx, ApplyMode::PerUnit).await.unwrap();
        let second = sync_concepts(&ctx, ApplyMode::PerUnit).await.unwrap();

        assert_eq!(second.new_concepts, 0);
        assert_eq!(second.modified_concepts, 0);
        assert_eq!(second.deleted_concepts, 0);
        assert_eq!(second.total_stocks, 0);
    }

    #[tokio::test]
    async fn test_rename_updates_members_and_keeps_added_at() {
        let (store, gateway, ctx) = setup().await;
        gateway.set_concepts(&[("BK0818", "人工智能")]);
        gateway.set_members("BK0818", &[("000001", "平安银行"), ("600000", "浦发银行")]);
        sync_concepts(&ctx, ApplyMode::PerUnit).await.unwrap();

        let concept = store.find_concepts(DataSource::AkShare).await.unwrap().remove(0);
        let before = store.find_concept_stocks(concept.id.unwrap()).await.unwrap();

        gateway.set_concepts(&[("BK0818", "人工智能2")]);
        gateway.set_members("BK0818", &[("000001", "平安银行"), ("830799", "贝特瑞")]);
        let report = sync_concepts(&ctx, ApplyMode::PerUnit).await.unwrap();

        assert_eq!(report.modified_concepts, 1);
        assert_eq!(report.new_stocks, 1);
        assert_eq!(report.deleted_stocks, 1);

        let renamed = store.find_concept(concept.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(renamed.name, "人工智能2");
        assert_eq!(renamed.content_hash, "18125f144f001129");

        let after = store.find_concept_stocks(concept.id.unwrap()).await.unwrap();
        let kept_before = before.iter().find(|s| s.stock_third_code == "000001.SZ").unwrap();
        let kept_after = after.iter().find(|s| s.stock_third_code == "000001.SZ").unwrap();
        assert_eq!(kept_before.added_at, kept_after.added_at);
        assert!(after.iter().any(|s| s.stock_third_code == "830799.BJ"));
        assert!(!after.iter().any(|s| s.stock_third_code == "600000.SH"));
    }

    #[tokio::test]
    async fn test_removed_concept_cascades() {
        let (store, gateway, ctx) = setup().await;
        gateway.set_concepts(&[("BK0818", "人工智能"), ("BK0001", "银行")]);
        gateway.set_members("BK0818", &[("000001", "平安银行")]);
        gateway.set_members("BK0001", &[("000001", "平安银行"), ("600000", "浦发银行")]);
        sync_concepts(&ctx, ApplyMode::PerUnit).await.unwrap();

        gateway.set_concepts(&[("BK0818", "人工智能")]);
        let report = sync_concepts(&ctx, ApplyMode::PerUnit).await.unwrap();

        assert_eq!(report.deleted_concepts, 1);
        assert_eq!(report.deleted_stocks, 2);
        assert_eq!(store.find_concepts(DataSource::AkShare).await.unwrap().len(), 1);
        assert_eq!(store.concept_stock_count(), 1);
    }

    #[tokio::test]
    async fn test_per_unit_failure_is_skipped() {
        let (store, gateway, ctx) = setup().await;
        gateway.set_concepts(&[("BK0818", "人工智能"), ("BK0001", "银行")]);
        gateway.set_members("BK0818", &[("000001", "平安银行")]);
        gateway.fail_members("BK0001");

        let report = sync_concepts(&ctx, ApplyMode::PerUnit).await.unwrap();

        assert_eq!(report.new_concepts, 1);
        assert_eq!(report.failed_concepts, 1);
        assert_eq!(store.find_concepts(DataSource::AkShare).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_atomic_batch_failure_rolls_back_everything() {
        let (store, gateway, ctx) = setup().await;
        gateway.set_concepts(&[("BK0818", "人工智能"), ("BK0001", "银行")]);
        gateway.set_members("BK0818", &[("000001", "平安银行")]);
        store.fail_concept_writes("BK0001");

        let err = sync_concepts(&ctx, ApplyMode::AtomicBatch).await.unwrap_err();

        assert!(matches!(err, CollectorError::Database(_)));
        assert!(store.find_concepts(DataSource::AkShare).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remote_list_failure_aborts() {
        let (store, gateway, ctx) = setup().await;
        gateway.fail_concept_list();

        let err = sync_concepts(&ctx, ApplyMode::PerUnit).await.unwrap_err();

        assert!(matches!(err, CollectorError::DataSource(_)));
        assert_eq!(store.concept_stock_count(), 0);
    }
}
