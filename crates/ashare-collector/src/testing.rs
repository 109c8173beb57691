//! 테스트용 메모리 저장소와 가짜 게이트웨이.
//!
//! `MemoryStore`는 PostgreSQL 구현과 같은 upsert/트랜잭션 규칙을 따릅니다.
//! 여러 행을 쓰는 메서드는 상태를 복제해 적용한 뒤 성공했을 때만 교체합니다.

use ashare_core::{
    dedupe_by_period, Concept, ConceptStock, DailyQuote, DataSource, NewSyncFailure, StockBasic, StockDaily,
    StockFinancial, StockStatus, SyncConfig, SyncFailure,
};
use ashare_data::{
    ConceptChange, ConceptGateway, ConceptMember, ConceptStore, DataError, FailureLedger,
    FinancialIndicatorGateway, FinancialStore, StockBasicGateway, StockBasicStore,
    StockDailyGateway, StockDailyStore, StoreHealth,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::SyncContext;

type DataResult<T> = ashare_data::Result<T>;
type RowKey = (DataSource, String, NaiveDate);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 날짜 생성 헬퍼.
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

/// 상장 종목 헬퍼. 상장일은 2024-01-01.
pub fn listed_stock(third_code: &str, symbol: &str) -> StockBasic {
    stock_with_status(third_code, symbol, StockStatus::Listed)
}

/// 상태를 지정한 종목 헬퍼.
pub fn stock_with_status(third_code: &str, symbol: &str, status: StockStatus) -> StockBasic {
    StockBasic {
        id: None,
        source: DataSource::Tushare,
        third_code: third_code.to_string(),
        symbol: symbol.to_string(),
        name: format!("종목{}", symbol),
        market: "主板".to_string(),
        area: String::new(),
        industry: String::new(),
        list_date: date(2024, 1, 1),
        status,
    }
}

/// 종가만 지정한 일봉 헬퍼.
pub fn daily_bar(third_code: &str, trade_date: NaiveDate, close: Decimal) -> StockDaily {
    StockDaily::new(
        DataSource::Tushare,
        third_code,
        trade_date,
        DailyQuote {
            open: close,
            high: close,
            low: close,
            close,
            pre_close: close,
            ..Default::default()
        },
    )
}

/// ROE만 채운 재무 지표 헬퍼.
pub fn financial_row(third_code: &str, end_date: NaiveDate, roe: Decimal) -> StockFinancial {
    let mut row = StockFinancial::new(DataSource::Tushare, third_code, end_date);
    row.ann_date = Some(end_date);
    row.set_indicator("roe", Some(roe));
    row
}

/// 기본 설정으로 컨텍스트를 구성합니다.
pub fn context(
    store: Arc<MemoryStore>,
    tushare: Arc<FakeTushare>,
    concepts: Arc<FakeConceptGateway>,
) -> SyncContext {
    context_with_settings(store, tushare, concepts, SyncConfig::default())
}

/// 설정을 지정해 컨텍스트를 구성합니다.
pub fn context_with_settings(
    store: Arc<MemoryStore>,
    tushare: Arc<FakeTushare>,
    concepts: Arc<FakeConceptGateway>,
    settings: SyncConfig,
) -> SyncContext {
    SyncContext {
        store,
        stock_basic_gateway: tushare.clone(),
        daily_gateway: tushare.clone(),
        financial_gateway: tushare,
        concept_gateway: concepts,
        settings,
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i64,
    stocks: HashMap<(DataSource, String), StockBasic>,
    concepts: BTreeMap<i64, Concept>,
    concept_stocks: BTreeMap<i64, ConceptStock>,
    daily: HashMap<RowKey, StockDaily>,
    financials: HashMap<RowKey, StockFinancial>,
    failures: BTreeMap<i64, SyncFailure>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn upsert_concept(&mut self, concept: &Concept) -> i64 {
        let existing = self
            .concepts
            .values_mut()
            .find(|c| c.source == concept.source && c.third_code == concept.third_code);

        if let Some(found) = existing {
            found.name = concept.name.clone();
            found.content_hash = concept.content_hash.clone();
            found.last_synced_at = concept.last_synced_at.or(Some(Utc::now()));
            return found.id.unwrap_or_default();
        }

        let id = self.next_id();
        let mut stored = concept.clone();
        stored.id = Some(id);
        stored.last_synced_at = concept.last_synced_at.or(Some(Utc::now()));
        self.concepts.insert(id, stored);
        id
    }

    fn upsert_concept_stock(&mut self, concept_id: i64, stock: &ConceptStock) {
        let existing = self.concept_stocks.values_mut().find(|s| {
            s.concept_id == Some(concept_id)
                && s.source == stock.source
                && s.stock_third_code == stock.stock_third_code
        });

        if let Some(found) = existing {
            found.stock_symbol = stock.stock_symbol.clone();
            found.content_hash = stock.content_hash.clone();
            return;
        }

        let id = self.next_id();
        let mut stored = stock.clone();
        stored.id = Some(id);
        stored.concept_id = Some(concept_id);
        stored.added_at = stock.added_at.or(Some(Utc::now()));
        self.concept_stocks.insert(id, stored);
    }

    fn upsert_daily(&mut self, rows: &[StockDaily]) -> u64 {
        for row in rows {
            let key = (row.source, row.third_code.clone(), row.trade_date);
            let mut row = row.clone();
            if row.symbol.is_none() {
                row.symbol = self.daily.get(&key).and_then(|old| old.symbol.clone());
            }
            self.daily.insert(key, row);
        }
        rows.len() as u64
    }
}

/// 메모리 저장소.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    failing_concepts: Mutex<HashSet<String>>,
    failing_daily: Mutex<HashSet<String>>,
    unhealthy: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 해당 개념 코드를 쓰는 반영을 실패시킵니다.
    pub fn fail_concept_writes(&self, third_code: &str) {
        lock(&self.failing_concepts).insert(third_code.to_string());
    }

    /// 해당 종목의 일봉 쓰기를 실패시킵니다.
    pub fn fail_daily_writes(&self, third_code: &str) {
        lock(&self.failing_daily).insert(third_code.to_string());
    }

    /// 상태 확인을 실패시킵니다.
    pub fn set_unhealthy(&self) {
        *lock(&self.unhealthy) = true;
    }

    pub fn concept_stock_count(&self) -> usize {
        lock(&self.state).concept_stocks.len()
    }

    /// 종목의 일봉을 거래일 순으로 반환합니다.
    pub fn daily_rows(&self, third_code: &str) -> Vec<StockDaily> {
        let mut rows: Vec<StockDaily> = lock(&self.state)
            .daily
            .values()
            .filter(|d| d.third_code == third_code)
            .cloned()
            .collect();
        rows.sort_by_key(|d| d.trade_date);
        rows
    }

    /// 종목의 재무 지표를 보고 기간 순으로 반환합니다.
    pub fn financial_rows(&self, third_code: &str) -> Vec<StockFinancial> {
        let mut rows: Vec<StockFinancial> = lock(&self.state)
            .financials
            .values()
            .filter(|f| f.third_code == third_code)
            .cloned()
            .collect();
        rows.sort_by_key(|f| f.end_date);
        rows
    }

    /// 해결 여부와 관계없이 모든 실패 기록.
    pub fn failures(&self) -> Vec<SyncFailure> {
        lock(&self.state).failures.values().cloned().collect()
    }

    fn check_daily_writes(&self, rows: &[StockDaily]) -> DataResult<()> {
        let failing = lock(&self.failing_daily);
        match rows.iter().find(|r| failing.contains(&r.third_code)) {
            Some(row) => Err(DataError::QueryError(format!(
                "injected daily write failure for {}",
                row.third_code
            ))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StockBasicStore for MemoryStore {
    async fn upsert_stock_basics(&self, stocks: &[StockBasic]) -> DataResult<u64> {
        let mut state = lock(&self.state);
        for stock in stocks {
            let key = (stock.source, stock.third_code.clone());
            let id = match state.stocks.get(&key).and_then(|s| s.id) {
                Some(id) => id,
                None => state.next_id(),
            };
            let mut stored = stock.clone();
            stored.id = Some(id);
            state.stocks.insert(key, stored);
        }
        Ok(stocks.len() as u64)
    }

    async fn find_all_stocks(&self, source: DataSource) -> DataResult<Vec<StockBasic>> {
        let mut stocks: Vec<StockBasic> = lock(&self.state)
            .stocks
            .values()
            .filter(|s| s.source == source)
            .cloned()
            .collect();
        stocks.sort_by(|a, b| a.third_code.cmp(&b.third_code));
        Ok(stocks)
    }

    async fn find_listed_stocks(&self, source: DataSource) -> DataResult<Vec<StockBasic>> {
        let stocks = self.find_all_stocks(source).await?;
        Ok(stocks.into_iter().filter(|s| s.is_listed()).collect())
    }

    async fn find_stocks_by_codes(
        &self,
        source: DataSource,
        third_codes: &[String],
    ) -> DataResult<Vec<StockBasic>> {
        let stocks = self.find_all_stocks(source).await?;
        Ok(stocks
            .into_iter()
            .filter(|s| third_codes.contains(&s.third_code))
            .collect())
    }

    async fn find_stock(
        &self,
        source: DataSource,
        third_code: &str,
    ) -> DataResult<Option<StockBasic>> {
        Ok(lock(&self.state)
            .stocks
            .get(&(source, third_code.to_string()))
            .cloned())
    }
}

#[async_trait]
impl ConceptStore for MemoryStore {
    async fn find_concepts(&self, source: DataSource) -> DataResult<Vec<Concept>> {
        let mut concepts: Vec<Concept> = lock(&self.state)
            .concepts
            .values()
            .filter(|c| c.source == source)
            .cloned()
            .collect();
        concepts.sort_by(|a, b| a.third_code.cmp(&b.third_code));
        Ok(concepts)
    }

    async fn find_concept(&self, id: i64) -> DataResult<Option<Concept>> {
        Ok(lock(&self.state).concepts.get(&id).cloned())
    }

    async fn find_concept_stocks(&self, concept_id: i64) -> DataResult<Vec<ConceptStock>> {
        Ok(lock(&self.state)
            .concept_stocks
            .values()
            .filter(|s| s.concept_id == Some(concept_id))
            .cloned()
            .collect())
    }

    async fn apply_concept_changes(&self, changes: &[ConceptChange]) -> DataResult<()> {
        let failing = lock(&self.failing_concepts).clone();
        let mut state = lock(&self.state);
        let mut draft = state.clone();

        for change in changes {
            match change {
                ConceptChange::Upsert {
                    concept,
                    stock_upserts,
                    stock_deletes,
                } => {
                    if failing.contains(&concept.third_code) {
                        return Err(DataError::QueryError(format!(
                            "injected concept write failure for {}",
                            concept.third_code
                        )));
                    }
                    let concept_id = draft.upsert_concept(concept);
                    for id in stock_deletes {
                        draft.concept_stocks.remove(id);
                    }
                    for stock in stock_upserts {
                        draft.upsert_concept_stock(concept_id, stock);
                    }
                }
                ConceptChange::Touch {
                    concept_id,
                    synced_at,
                } => {
                    if let Some(concept) = draft.concepts.get_mut(concept_id) {
                        concept.last_synced_at = Some(*synced_at);
                    }
                }
                ConceptChange::Delete { concept_id } => {
                    draft
                        .concept_stocks
                        .retain(|_, s| s.concept_id != Some(*concept_id));
                    draft.concepts.remove(concept_id);
                }
            }
        }

        *state = draft;
        Ok(())
    }
}

#[async_trait]
impl StockDailyStore for MemoryStore {
    async fn latest_trade_date(
        &self,
        source: DataSource,
        third_code: &str,
    ) -> DataResult<Option<NaiveDate>> {
        Ok(lock(&self.state)
            .daily
            .keys()
            .filter(|(s, code, _)| *s == source && code == third_code)
            .map(|(_, _, d)| *d)
            .max())
    }

    async fn upsert_daily(&self, rows: &[StockDaily]) -> DataResult<u64> {
        self.check_daily_writes(rows)?;
        Ok(lock(&self.state).upsert_daily(rows))
    }

    async fn upsert_daily_and_resolve(
        &self,
        rows: &[StockDaily],
        failure_id: i64,
    ) -> DataResult<u64> {
        self.check_daily_writes(rows)?;
        let mut state = lock(&self.state);
        let affected = state.upsert_daily(rows);
        if let Some(failure) = state.failures.get_mut(&failure_id) {
            failure.resolved = true;
        }
        Ok(affected)
    }
}

#[async_trait]
impl FailureLedger for MemoryStore {
    async fn record_failure(&self, failure: &NewSyncFailure) -> DataResult<i64> {
        let mut state = lock(&self.state);

        let existing = state.failures.values_mut().find(|f| {
            !f.resolved
                && f.source == failure.source
                && f.third_code == failure.third_code
                && f.start_date == failure.start_date
                && f.end_date == failure.end_date
        });
        if let Some(found) = existing {
            found.retry_count += 1;
            found.error_message = failure.error_message.clone();
            found.failed_at = failure.failed_at;
            return Ok(found.id);
        }

        let id = state.next_id();
        state.failures.insert(
            id,
            SyncFailure {
                id,
                source: failure.source,
                third_code: failure.third_code.clone(),
                start_date: failure.start_date,
                end_date: failure.end_date,
                error_message: failure.error_message.clone(),
                failed_at: failure.failed_at,
                retry_count: 0,
                resolved: false,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn find_unresolved_failures(&self, max_retries: i32) -> DataResult<Vec<SyncFailure>> {
        let mut failures: Vec<SyncFailure> = lock(&self.state)
            .failures
            .values()
            .filter(|f| f.is_retry_eligible(max_retries))
            .cloned()
            .collect();
        failures.sort_by_key(|f| (f.created_at, f.id));
        Ok(failures)
    }

    async fn mark_resolved(&self, id: i64) -> DataResult<()> {
        if let Some(failure) = lock(&self.state).failures.get_mut(&id) {
            failure.resolved = true;
        }
        Ok(())
    }

    async fn record_retry_failure(&self, id: i64, error_message: &str) -> DataResult<()> {
        if let Some(failure) = lock(&self.state).failures.get_mut(&id) {
            failure.retry_count += 1;
            failure.error_message = error_message.to_string();
            failure.failed_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl FinancialStore for MemoryStore {
    async fn latest_end_date(
        &self,
        source: DataSource,
        third_code: &str,
    ) -> DataResult<Option<NaiveDate>> {
        Ok(lock(&self.state)
            .financials
            .keys()
            .filter(|(s, code, _)| *s == source && code == third_code)
            .map(|(_, _, d)| *d)
            .max())
    }

    async fn upsert_financials(&self, rows: &[StockFinancial]) -> DataResult<u64> {
        let rows = dedupe_by_period(rows.to_vec());
        let mut state = lock(&self.state);
        for row in &rows {
            let key = (row.source, row.third_code.clone(), row.end_date);
            state.financials.insert(key, row.clone());
        }
        Ok(rows.len() as u64)
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn health_check(&self) -> DataResult<()> {
        if *lock(&self.unhealthy) {
            return Err(DataError::ConnectionError("memory store marked unhealthy".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// 가짜 게이트웨이
// =============================================================================

/// 가짜 AKShare 개념 게이트웨이.
#[derive(Debug, Default)]
pub struct FakeConceptGateway {
    concepts: Mutex<Vec<Concept>>,
    members: Mutex<HashMap<String, Vec<ConceptMember>>>,
    failing_members: Mutex<HashSet<String>>,
    fail_list: Mutex<bool>,
}

impl FakeConceptGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// 원격 개념 목록을 `(코드, 이름)`으로 지정합니다.
    pub fn set_concepts(&self, concepts: &[(&str, &str)]) {
        *lock(&self.concepts) = concepts
            .iter()
            .map(|(code, name)| Concept::new(DataSource::AkShare, *code, *name))
            .collect();
    }

    /// 개념의 구성 종목을 `(코드, 이름)`으로 지정합니다.
    pub fn set_members(&self, concept_code: &str, members: &[(&str, &str)]) {
        lock(&self.members).insert(
            concept_code.to_string(),
            members
                .iter()
                .map(|(code, name)| ConceptMember {
                    code: code.to_string(),
                    name: name.to_string(),
                })
                .collect(),
        );
    }

    pub fn fail_members(&self, concept_code: &str) {
        lock(&self.failing_members).insert(concept_code.to_string());
    }

    pub fn fail_concept_list(&self) {
        *lock(&self.fail_list) = true;
    }
}

#[async_trait]
impl ConceptGateway for FakeConceptGateway {
    async fn fetch_concepts(&self) -> DataResult<Vec<Concept>> {
        if *lock(&self.fail_list) {
            return Err(DataError::FetchError(
                "AKShare stock_board_concept_name_em error: HTTP 502".to_string(),
            ));
        }
        Ok(lock(&self.concepts).clone())
    }

    async fn fetch_concept_stocks(
        &self,
        concept_code: &str,
        _concept_name: &str,
    ) -> DataResult<Vec<ConceptMember>> {
        if lock(&self.failing_members).contains(concept_code) {
            return Err(DataError::FetchError(format!(
                "Failed to fetch concept stocks from AKShare for {}",
                concept_code
            )));
        }
        Ok(lock(&self.members)
            .get(concept_code)
            .cloned()
            .unwrap_or_default())
    }
}

/// 가짜 Tushare 게이트웨이 (종목 기본 정보, 일봉, 재무 지표).
#[derive(Debug, Default)]
pub struct FakeTushare {
    stocks: Mutex<Vec<StockBasic>>,
    daily: Mutex<Vec<StockDaily>>,
    financials: Mutex<Vec<StockFinancial>>,
    failing_codes: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
}

impl FakeTushare {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stocks(&self, stocks: Vec<StockBasic>) {
        *lock(&self.stocks) = stocks;
    }

    pub fn add_daily(&self, rows: Vec<StockDaily>) {
        lock(&self.daily).extend(rows);
    }

    pub fn add_financials(&self, rows: Vec<StockFinancial>) {
        lock(&self.financials).extend(rows);
    }

    /// 해당 종목에 대한 호출을 실패시킵니다.
    pub fn fail_code(&self, third_code: &str) {
        lock(&self.failing_codes).insert(third_code.to_string());
    }

    /// 실패 지정을 해제합니다.
    pub fn recover_code(&self, third_code: &str) {
        lock(&self.failing_codes).remove(third_code);
    }

    /// 모든 호출 앞에 지연을 넣습니다.
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = Some(delay);
    }

    /// 호출 기록 (`api:인자` 형식).
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    async fn enter(&self, call: String, third_code: Option<&str>) -> DataResult<()> {
        lock(&self.calls).push(call);

        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match third_code {
            Some(code) if lock(&self.failing_codes).contains(code) => Err(DataError::FetchError(
                format!("Tushare API daily error: code=40203 msg=rate limited ({})", code),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl StockBasicGateway for FakeTushare {
    async fn fetch_stock_basics(&self) -> DataResult<Vec<StockBasic>> {
        self.enter("stock_basic".to_string(), None).await?;
        Ok(lock(&self.stocks).clone())
    }
}

#[async_trait]
impl StockDailyGateway for FakeTushare {
    async fn fetch_stock_daily(
        &self,
        ts_code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> DataResult<Vec<StockDaily>> {
        self.enter(format!("daily:{}:{}:{}", ts_code, start_date, end_date), Some(ts_code))
            .await?;
        Ok(lock(&self.daily)
            .iter()
            .filter(|d| d.third_code == ts_code && d.trade_date >= start_date && d.trade_date <= end_date)
            .cloned()
            .collect())
    }

    async fn fetch_daily_all_by_date(&self, trade_date: NaiveDate) -> DataResult<Vec<StockDaily>> {
        self.enter(format!("daily_by_date:{}", trade_date), None).await?;
        Ok(lock(&self.daily)
            .iter()
            .filter(|d| d.trade_date == trade_date)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FinancialIndicatorGateway for FakeTushare {
    async fn fetch_by_stock(
        &self,
        ts_code: &str,
        start_date: Option<NaiveDate>,
    ) -> DataResult<Vec<StockFinancial>> {
        let start_label = start_date.map(|d| d.to_string()).unwrap_or_default();
        self.enter(format!("fina_indicator:{}:{}", ts_code, start_label), Some(ts_code))
            .await?;
        Ok(lock(&self.financials)
            .iter()
            .filter(|f| f.third_code == ts_code && start_date.map_or(true, |s| f.end_date >= s))
            .cloned()
            .collect())
    }
}
