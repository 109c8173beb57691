//! 개념(테마) 섹터와 구성 종목.
//!
//! - `Concept` - 개념 섹터 (예: 人工智能)
//! - `ConceptStock` - 개념에 속한 종목 연결

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DataSource;
use crate::hash::content_hash;
use crate::reconcile::Reconcilable;

/// 개념 섹터.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    /// 로컬 대리키 (원격에서 막 가져온 레코드는 None)
    pub id: Option<i64>,
    /// 데이터 출처
    pub source: DataSource,
    /// 출처 측 코드 (예: BK0818)
    pub third_code: String,
    /// 개념 이름
    pub name: String,
    /// 내용 해시
    pub content_hash: String,
    /// 마지막 동기화 시각
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Concept {
    /// 원격 개념 레코드를 생성합니다. 해시는 즉시 계산됩니다.
    pub fn new(source: DataSource, third_code: impl Into<String>, name: impl Into<String>) -> Self {
        let third_code = third_code.into();
        let name = name.into();
        let content_hash = Self::compute_hash(source, &third_code, &name);
        Self {
            id: None,
            source,
            third_code,
            name,
            content_hash,
            last_synced_at: None,
        }
    }

    /// `source|third_code|name` 해시.
    pub fn compute_hash(source: DataSource, third_code: &str, name: &str) -> String {
        content_hash(&[source.as_str(), third_code, name])
    }

    /// 저장된 해시가 현재 필드 값과 일치하는지 확인합니다.
    pub fn is_hash_consistent(&self) -> bool {
        self.content_hash == Self::compute_hash(self.source, &self.third_code, &self.name)
    }

    /// 로컬 대리키를 유지한 채 원격 내용을 가져옵니다.
    pub fn with_identity_of(mut self, local: &Concept) -> Self {
        self.id = local.id;
        self
    }

    /// 동기화 시각을 지정합니다.
    pub fn synced_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_synced_at = Some(at);
        self
    }
}

impl Reconcilable for Concept {
    type Key = (DataSource, String);

    fn natural_key(&self) -> Self::Key {
        (self.source, self.third_code.clone())
    }

    fn content_hash(&self) -> &str {
        &self.content_hash
    }
}

/// 개념 구성 종목.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptStock {
    /// 로컬 대리키
    pub id: Option<i64>,
    /// 소속 개념 ID (저장 전에는 None)
    pub concept_id: Option<i64>,
    /// 데이터 출처
    pub source: DataSource,
    /// 종목 코드 (Tushare ts_code 형식, 예: 000001.SZ)
    pub stock_third_code: String,
    /// 종목 심볼 (예: 000001)
    pub stock_symbol: Option<String>,
    /// 내용 해시
    pub content_hash: String,
    /// 개념에 편입된 시각 (로컬 소유, 변경 시에도 유지)
    pub added_at: Option<DateTime<Utc>>,
}

impl ConceptStock {
    /// 원격 구성 종목 레코드를 생성합니다.
    pub fn new(
        source: DataSource,
        stock_third_code: impl Into<String>,
        stock_symbol: Option<String>,
    ) -> Self {
        let stock_third_code = stock_third_code.into();
        let content_hash =
            Self::compute_hash(source, &stock_third_code, stock_symbol.as_deref());
        Self {
            id: None,
            concept_id: None,
            source,
            stock_third_code,
            stock_symbol,
            content_hash,
            added_at: None,
        }
    }

    /// `source|stock_third_code|stock_symbol` 해시. 심볼이 없으면 빈 문자열.
    pub fn compute_hash(source: DataSource, stock_third_code: &str, stock_symbol: Option<&str>) -> String {
        content_hash(&[source.as_str(), stock_third_code, stock_symbol.unwrap_or("")])
    }

    /// 저장된 해시가 현재 필드 값과 일치하는지 확인합니다.
    pub fn is_hash_consistent(&self) -> bool {
        self.content_hash
            == Self::compute_hash(
                self.source,
                &self.stock_third_code,
                self.stock_symbol.as_deref(),
            )
    }

    /// 로컬 레코드의 ID, 소속 개념, 편입 시각을 유지합니다.
    pub fn with_identity_of(mut self, local: &ConceptStock) -> Self {
        self.id = local.id;
        self.concept_id = local.concept_id;
        self.added_at = local.added_at;
        self
    }
}

impl Reconcilable for ConceptStock {
    type Key = (DataSource, String);

    fn natural_key(&self) -> Self::Key {
        (self.source, self.stock_third_code.clone())
    }

    fn content_hash(&self) -> &str {
        &self.content_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concept_hash_matches_stored_value() {
        let concept = Concept::new(DataSource::AkShare, "BK0818", "人工智能");
        assert_eq!(concept.content_hash, "af085374ffe48bcc");
        assert!(concept.is_hash_consistent());
    }

    #[test]
    fn test_concept_rename_changes_hash() {
        let before = Concept::new(DataSource::AkShare, "BK0818", "人工智能");
        let after = Concept::new(DataSource::AkShare, "BK0818", "人工智能2");
        assert_eq!(after.content_hash, "18125f144f001129");
        assert_ne!(before.content_hash, after.content_hash);
        assert_eq!(before.natural_key(), after.natural_key());
    }

    #[test]
    fn test_concept_stock_hash() {
        let stock = ConceptStock::new(DataSource::AkShare, "000001.SZ", Some("000001".to_string()));
        assert_eq!(stock.content_hash, "3e4726982271ff9e");
    }

    #[test]
    fn test_concept_stock_keeps_local_identity() {
        let added = Utc::now();
        let mut local = ConceptStock::new(DataSource::AkShare, "000001.SZ", None);
        local.id = Some(11);
        local.concept_id = Some(3);
        local.added_at = Some(added);

        let remote = ConceptStock::new(DataSource::AkShare, "000001.SZ", Some("000001".to_string()))
            .with_identity_of(&local);

        assert_eq!(remote.id, Some(11));
        assert_eq!(remote.concept_id, Some(3));
        assert_eq!(remote.added_at, Some(added));
        assert_eq!(remote.stock_symbol.as_deref(), Some("000001"));
        assert!(remote.is_hash_consistent());
    }

    #[test]
    fn test_tampered_hash_is_detected() {
        let mut concept = Concept::new(DataSource::AkShare, "BK0001", "芯片");
        concept.name = "芯片概念".to_string();
        assert!(!concept.is_hash_consistent());
    }
}
