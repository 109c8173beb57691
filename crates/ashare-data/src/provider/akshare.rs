//! AKShare 개념 섹터 클라이언트 (AKTools HTTP 브리지 경유).
//!
//! AKTools는 AKShare 함수를 `GET /api/public/{함수명}`으로 노출하고,
//! 결과 DataFrame을 레코드 배열(JSON)로 돌려줍니다. 컬럼명은 중국어이며
//! AKShare 버전에 따라 달라지므로 후보 이름을 순서대로 찾습니다.

use ashare_core::{Concept, DataSource, ProviderConfig};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

use super::{ConceptGateway, ConceptMember};
use crate::error::{DataError, Result};

const CONCEPT_LIST_FN: &str = "stock_board_concept_name_em";
const CONCEPT_MEMBERS_FN: &str = "stock_board_concept_cons_em";

/// 개념 코드 컬럼 후보.
pub const CONCEPT_CODE_KEYS: [&str; 2] = ["板块代码", "代码"];
/// 개념 이름 컬럼 후보.
pub const CONCEPT_NAME_KEYS: [&str; 2] = ["板块名称", "名称"];
/// 구성 종목 코드 컬럼 후보.
pub const MEMBER_CODE_KEYS: [&str; 2] = ["代码", "股票代码"];
/// 구성 종목 이름 컬럼 후보.
pub const MEMBER_NAME_KEYS: [&str; 2] = ["名称", "股票名称"];

type RawRow = Map<String, Value>;

/// AKTools 클라이언트.
#[derive(Clone)]
pub struct AkShareClient {
    client: reqwest::Client,
    base_url: String,
}

impl AkShareClient {
    /// 새 클라이언트를 생성합니다.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::FetchError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// 설정에서 클라이언트를 생성합니다.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        Self::new(config.akshare_base_url.clone(), config.request_timeout())
    }

    /// AKShare 함수를 호출하고 레코드 배열을 받습니다.
    async fn call(&self, function: &str, query: &[(&str, &str)]) -> Result<Vec<RawRow>> {
        let url = format!("{}/api/public/{}", self.base_url, function);
        debug!(function, url = %url, "AKTools 요청");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| DataError::FetchError(format!("AKShare {} error: {}", function, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DataError::FetchError(format!(
                "AKShare {} error: HTTP {} - {}",
                function, status, body
            )));
        }

        response
            .json::<Vec<RawRow>>()
            .await
            .map_err(|e| DataError::ParseError(format!("AKShare {} error: invalid payload: {}", function, e)))
    }
}

/// 후보 컬럼 중 처음으로 값이 있는 것을 문자열로 반환합니다.
fn pick_str(row: &RawRow, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|key| {
        let text = match row.get(*key)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    })
}

/// 개념 목록 행을 변환합니다. 코드나 이름이 없으면 전체 실패.
pub fn rows_to_concepts(rows: &[RawRow]) -> Result<Vec<Concept>> {
    let synced_at = Utc::now();
    rows.iter()
        .map(|row| {
            let code = pick_str(row, &CONCEPT_CODE_KEYS).ok_or_else(|| {
                DataError::ParseError("AKShare concept row missing required field: 板块代码".to_string())
            })?;
            let name = pick_str(row, &CONCEPT_NAME_KEYS).ok_or_else(|| {
                DataError::ParseError("AKShare concept row missing required field: 板块名称".to_string())
            })?;
            Ok(Concept::new(DataSource::AkShare, code, name).synced_at(synced_at))
        })
        .collect()
}

/// 구성 종목 행을 변환합니다. 코드나 이름이 없으면 전체 실패.
pub fn rows_to_members(rows: &[RawRow]) -> Result<Vec<ConceptMember>> {
    rows.iter()
        .map(|row| {
            let code = pick_str(row, &MEMBER_CODE_KEYS).ok_or_else(|| {
                DataError::ParseError("AKShare stock row missing required field: 代码".to_string())
            })?;
            let name = pick_str(row, &MEMBER_NAME_KEYS).ok_or_else(|| {
                DataError::ParseError("AKShare stock row missing required field: 名称".to_string())
            })?;
            Ok(ConceptMember { code, name })
        })
        .collect()
}

#[async_trait]
impl ConceptGateway for AkShareClient {
    async fn fetch_concepts(&self) -> Result<Vec<Concept>> {
        let rows = self.call(CONCEPT_LIST_FN, &[]).await?;
        let concepts = rows_to_concepts(&rows)?;
        info!(count = concepts.len(), "AKShare 개념 목록 조회 완료");
        Ok(concepts)
    }

    async fn fetch_concept_stocks(
        &self,
        concept_code: &str,
        concept_name: &str,
    ) -> Result<Vec<ConceptMember>> {
        let rows = self
            .call(CONCEPT_MEMBERS_FN, &[("symbol", concept_name)])
            .await
            .map_err(|e| {
                DataError::FetchError(format!(
                    "Failed to fetch concept stocks from AKShare for {}: {}",
                    concept_code, e
                ))
            })?;
        rows_to_members(&rows)
    }
}
