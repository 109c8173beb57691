//! 개념 조회.

use ashare_core::{Concept, ConceptStock, DataSource};
use ashare_data::ConceptStore;

use crate::error::{CollectorError, Result};

/// 출처별 개념 목록 (코드 순).
pub async fn list_concepts<S>(store: &S, source: DataSource) -> Result<Vec<Concept>>
where
    S: ConceptStore + ?Sized,
{
    Ok(store.find_concepts(source).await?)
}

/// 개념의 구성 종목. 개념이 없으면 `NotFound`.
pub async fn list_concept_stocks<S>(store: &S, concept_id: i64) -> Result<Vec<ConceptStock>>
where
    S: ConceptStore + ?Sized,
{
    if store.find_concept(concept_id).await?.is_none() {
        return Err(CollectorError::NotFound(format!("concept {} not found", concept_id)));
    }
    Ok(store.find_concept_stocks(concept_id).await?)
}
