//! 원격/로컬 집합 비교(reconcile).
//!
//! 원격(권위) 집합과 로컬 미러 집합을 자연키로 맞춰 보고, 내용 해시를 비교하여
//! 신규 / 변경 / 삭제 / 변경 없음 네 가지로 분류합니다.
//! 적용(쓰기)은 호출 측에서 [`ApplyMode`]를 명시하여 수행합니다.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use crate::error::SyncError;

/// 자연키와 내용 해시를 가진 레코드.
pub trait Reconcilable {
    /// 자연키 타입
    type Key: Eq + Hash + Clone;

    /// 자연키 (예: `(source, third_code)`)
    fn natural_key(&self) -> Self::Key;

    /// 의미 있는 필드만으로 계산한 내용 해시
    fn content_hash(&self) -> &str;
}

/// 같은 자연키를 가진 원격/로컬 레코드 쌍.
#[derive(Debug, Clone, PartialEq)]
pub struct Matched<T> {
    /// 원격 레코드
    pub remote: T,
    /// 로컬 레코드 (대리키, 로컬 소유 타임스탬프 보존용)
    pub local: T,
}

/// 비교 결과. 적용 전 단계의 변경 계획입니다.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan<T> {
    /// 로컬에 없는 원격 레코드 (원격 순서 유지)
    pub new: Vec<T>,
    /// 해시가 다른 레코드
    pub modified: Vec<Matched<T>>,
    /// 해시가 같은 레코드
    pub unchanged: Vec<Matched<T>>,
    /// 원격에 없는 로컬 레코드 (로컬 순서 유지)
    pub deleted: Vec<T>,
}

/// 분류별 건수.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileCounts {
    pub new: usize,
    pub modified: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

impl<T: Reconcilable> ReconcilePlan<T> {
    /// 원격/로컬 집합을 비교하여 계획을 만듭니다.
    ///
    /// 원격에 같은 자연키가 여러 번 나오면 첫 위치에 마지막 값이 남습니다.
    pub fn build(remote: Vec<T>, local: Vec<T>) -> Self {
        let remote = dedup_by_key(remote);

        let mut local_index: HashMap<T::Key, usize> = HashMap::with_capacity(local.len());
        let mut local_slots: Vec<Option<T>> = Vec::with_capacity(local.len());
        for record in local {
            let key = record.natural_key();
            match local_index.get(&key) {
                Some(&idx) => local_slots[idx] = Some(record),
                None => {
                    local_index.insert(key, local_slots.len());
                    local_slots.push(Some(record));
                }
            }
        }

        let mut plan = ReconcilePlan {
            new: Vec::new(),
            modified: Vec::new(),
            unchanged: Vec::new(),
            deleted: Vec::new(),
        };

        for record in remote {
            let existing = local_index
                .get(&record.natural_key())
                .and_then(|&idx| local_slots[idx].take());

            match existing {
                None => plan.new.push(record),
                Some(local) if local.content_hash() != record.content_hash() => {
                    plan.modified.push(Matched {
                        remote: record,
                        local,
                    })
                }
                Some(local) => plan.unchanged.push(Matched {
                    remote: record,
                    local,
                }),
            }
        }

        plan.deleted = local_slots.into_iter().flatten().collect();
        plan
    }

    /// 분류별 건수.
    pub fn counts(&self) -> ReconcileCounts {
        ReconcileCounts {
            new: self.new.len(),
            modified: self.modified.len(),
            unchanged: self.unchanged.len(),
            deleted: self.deleted.len(),
        }
    }

    /// 쓰기가 필요한 변경(신규/변경/삭제)이 있는지 여부.
    pub fn has_changes(&self) -> bool {
        !(self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty())
    }
}

fn dedup_by_key<T: Reconcilable>(records: Vec<T>) -> Vec<T> {
    let mut index: HashMap<T::Key, usize> = HashMap::with_capacity(records.len());
    let mut out: Vec<T> = Vec::with_capacity(records.len());
    for record in records {
        let key = record.natural_key();
        match index.get(&key) {
            Some(&idx) => out[idx] = record,
            None => {
                index.insert(key, out.len());
                out.push(record);
            }
        }
    }
    out
}

/// 변경 적용 시 트랜잭션 단위.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    /// 상위 단위(예: 개념 1개 + 구성 종목)마다 독립 트랜잭션.
    /// 한 단위의 실패는 기록 후 건너뛰며 다른 단위에 영향을 주지 않습니다.
    #[default]
    PerUnit,
    /// 전체를 하나의 트랜잭션으로 적용. 어느 하나라도 실패하면 전부 롤백됩니다.
    AtomicBatch,
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyMode::PerUnit => f.write_str("per_unit"),
            ApplyMode::AtomicBatch => f.write_str("atomic_batch"),
        }
    }
}

impl FromStr for ApplyMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "per_unit" | "per-unit" => Ok(ApplyMode::PerUnit),
            "atomic_batch" | "atomic-batch" | "atomic" => Ok(ApplyMode::AtomicBatch),
            _ => Err(SyncError::InvalidInput(format!("알 수 없는 적용 방식: {}", s))),
        }
    }
}
