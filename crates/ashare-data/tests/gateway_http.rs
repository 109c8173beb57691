//! Tushare / AKShare 게이트웨이 HTTP 통합 테스트 (mockito).

use ashare_data::provider::{
    AkShareClient, ConceptGateway, FinancialIndicatorGateway, StockBasicGateway,
    StockDailyGateway, TushareClient,
};
use ashare_data::DataError;
use chrono::{Duration, NaiveDate};
use mockito::{Matcher, Server};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn tushare(server: &Server) -> TushareClient {
    TushareClient::new("test-token", server.url(), 6000, std::time::Duration::from_secs(5))
        .unwrap()
}

fn table(fields: &[&str], items: Vec<Value>) -> String {
    json!({"code": 0, "msg": "", "data": {"fields": fields, "items": items}}).to_string()
}

#[tokio::test]
async fn test_fina_indicator_stops_after_empty_page() {
    let mut server = Server::new_async().await;
    let base = NaiveDate::from_ymd_opt(2000, 3, 31).unwrap();
    let full_page: Vec<Value> = (0..100)
        .map(|i| {
            let end = (base + Duration::days(i * 91)).format("%Y%m%d").to_string();
            json!(["000001.SZ", end.clone(), end, 0.5])
        })
        .collect();

    let first = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "api_name": "fina_indicator",
            "params": {"ts_code": "000001.SZ", "offset": 0, "limit": 100}
        })))
        .with_body(table(&["ts_code", "ann_date", "end_date", "eps"], full_page))
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "api_name": "fina_indicator",
            "params": {"offset": 100}
        })))
        .with_body(table(&["ts_code", "ann_date", "end_date", "eps"], vec![]))
        .expect(1)
        .create_async()
        .await;

    let rows = tushare(&server).fetch_by_stock("000001.SZ", None).await.unwrap();

    assert_eq!(rows.len(), 100);
    assert_eq!(rows[0].indicator("eps"), Some(dec!(0.5)));
    assert_eq!(rows[0].end_date, base);
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_fina_indicator_passes_start_date() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "params": {"start_date": "20240101"}
        })))
        .with_body(table(&["ts_code", "end_date"], vec![json!(["600000.SH", "20240331"])]))
        .expect(1)
        .create_async()
        .await;

    let start = NaiveDate::from_ymd_opt(2024, 1, 1);
    let rows = tushare(&server).fetch_by_stock("600000.SH", start).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].indicator("eps"), None);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_envelope_becomes_fetch_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_body(json!({"code": 40203, "msg": "rate limited", "data": null}).to_string())
        .create_async()
        .await;

    let err = tushare(&server).fetch_stock_basics().await.unwrap_err();

    match err {
        DataError::FetchError(msg) => {
            assert!(msg.contains("stock_basic"));
            assert!(msg.contains("code=40203"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_stock_basic_queries_every_list_status() {
    let mut server = Server::new_async().await;
    let fields = [
        "ts_code", "symbol", "name", "market", "area", "industry", "list_date", "list_status",
    ];
    let mut mocks = Vec::new();
    for (status, code) in [("L", "000001.SZ"), ("D", "000003.SZ"), ("P", "600001.SH")] {
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "api_name": "stock_basic",
                "params": {"list_status": status}
            })))
            .with_body(table(
                &fields,
                vec![json!([code, &code[..6], "测试", "主板", null, "银行", "19910403", status])],
            ))
            .expect(1)
            .create_async()
            .await;
        mocks.push(mock);
    }

    let stocks = tushare(&server).fetch_stock_basics().await.unwrap();

    assert_eq!(stocks.len(), 3);
    assert!(stocks[0].is_listed());
    assert_eq!(stocks[1].third_code, "000003.SZ");
    assert_eq!(stocks[0].area, "");
    for mock in mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_daily_skips_adj_factor_when_no_bars() {
    let mut server = Server::new_async().await;
    let daily = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({"api_name": "daily"})))
        .with_body(table(&["ts_code", "trade_date"], vec![]))
        .expect(1)
        .create_async()
        .await;
    let adj = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({"api_name": "adj_factor"})))
        .expect(0)
        .create_async()
        .await;

    let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let rows = tushare(&server)
        .fetch_stock_daily("000001.SZ", date, date)
        .await
        .unwrap();

    assert!(rows.is_empty());
    daily.assert_async().await;
    adj.assert_async().await;
}

#[tokio::test]
async fn test_daily_merges_three_apis() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({"api_name": "daily"})))
        .with_body(table(
            &[
                "ts_code", "trade_date", "open", "high", "low", "close", "pre_close", "change",
                "pct_chg", "vol", "amount",
            ],
            vec![json!([
                "000001.SZ", "20240102", 9.39, 9.42, 9.21, 9.21, 9.39, -0.18, -1.9169, 1158366.45,
                1075742.252
            ])],
        ))
        .create_async()
        .await;
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({"api_name": "adj_factor"})))
        .with_body(table(
            &["ts_code", "trade_date", "adj_factor"],
            vec![json!(["000001.SZ", "20240102", 108.031])],
        ))
        .create_async()
        .await;
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({"api_name": "daily_basic"})))
        .with_body(table(
            &["ts_code", "trade_date", "pe"],
            vec![json!(["000001.SZ", "20240102", 4.5])],
        ))
        .create_async()
        .await;

    let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let rows = tushare(&server)
        .fetch_stock_daily("000001.SZ", date, date)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].close, dec!(9.21));
    assert_eq!(rows[0].adj_factor, dec!(108.031));
    assert_eq!(rows[0].pe, Some(dec!(4.5)));
    assert_eq!(rows[0].turnover_rate, None);
}

#[tokio::test]
async fn test_akshare_concepts_and_members() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/public/stock_board_concept_name_em")
        .with_body(json!([{"排名": 1, "板块名称": "人工智能", "板块代码": "BK0818"}]).to_string())
        .create_async()
        .await;
    let members = server
        .mock("GET", "/api/public/stock_board_concept_cons_em")
        .match_query(Matcher::UrlEncoded("symbol".into(), "人工智能".into()))
        .with_body(json!([{"股票代码": "000001", "股票名称": "平安银行"}]).to_string())
        .expect(1)
        .create_async()
        .await;

    let client = AkShareClient::new(format!("{}/", server.url()), std::time::Duration::from_secs(5))
        .unwrap();
    let concepts = client.fetch_concepts().await.unwrap();
    assert_eq!(concepts.len(), 1);
    assert_eq!(concepts[0].third_code, "BK0818");
    assert_eq!(concepts[0].content_hash, "af085374ffe48bcc");

    let stocks = client.fetch_concept_stocks("BK0818", "人工智能").await.unwrap();
    assert_eq!(stocks[0].code, "000001");
    assert_eq!(stocks[0].name, "平安银行");
    members.assert_async().await;
}

#[tokio::test]
async fn test_akshare_member_failure_names_concept() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/public/stock_board_concept_cons_em")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let client = AkShareClient::new(server.url(), std::time::Duration::from_secs(5)).unwrap();
    let err = client.fetch_concept_stocks("BK0818", "人工智能").await.unwrap_err();

    assert!(matches!(err, DataError::FetchError(_)));
    assert!(err.to_string().contains("BK0818"));
}
