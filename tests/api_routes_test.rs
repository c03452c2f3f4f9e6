/// HTTP surface tests
///
/// Exercises the axum router in-process with `tower::ServiceExt::oneshot`,
/// backed by stub sentiment and market data collaborators.
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;

use podcast_insight::app::create_app;
use podcast_insight::config::EnrichmentConfig;
use podcast_insight::external::price_provider::{
    ExternalPricePoint, MarketDataGateway, PriceProviderError,
};
use podcast_insight::models::{Market, OpinionDocument, TickerOpinion};
use podcast_insight::services::enrichment_service::EnrichmentService;
use podcast_insight::services::indicators::IndicatorSettings;
use podcast_insight::services::sentiment_service::SentimentSource;
use podcast_insight::services::technical_analysis_service::TechnicalAnalysisService;
use podcast_insight::state::AppState;

struct EchoSentiment;

#[async_trait]
impl SentimentSource for EchoSentiment {
    async fn analyze(&self, text: &str) -> OpinionDocument {
        OpinionDocument {
            summary: Some(text.to_string()),
            tickers: vec![TickerOpinion {
                symbol: Some("TSLA".to_string()),
                sentiment: Some("bullish".to_string()),
                ..TickerOpinion::default()
            }],
            ..OpinionDocument::default()
        }
    }

    async fn summarize(&self, text: &str) -> String {
        format!("- {}", text)
    }
}

struct FlatGateway;

#[async_trait]
impl MarketDataGateway for FlatGateway {
    async fn fetch_closes(
        &self,
        _symbol: &str,
        _market: Market,
        lookback_days: u32,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Ok((0..lookback_days + 10)
            .map(|i| ExternalPricePoint {
                date: start + chrono::Duration::days(i as i64),
                close: 50.0,
            })
            .collect())
    }
}

fn app() -> Router {
    let technicals = Arc::new(TechnicalAnalysisService::new(
        Arc::new(FlatGateway),
        IndicatorSettings::default(),
    ));
    let enrichment = EnrichmentService::new(
        Arc::new(EchoSentiment),
        technicals,
        EnrichmentConfig::default(),
    );
    create_app(AppState {
        enrichment: Arc::new(enrichment),
    })
}

async fn send(request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_analyze_text_returns_summary() {
    let (status, body) = send(post_json("/api/analyze-text", json!({ "text": "rates on hold" }))).await;

    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(response["result"], "- rates on hold");
}

#[tokio::test]
async fn test_analyze_podcast_text_returns_document() {
    let (status, body) = send(post_json(
        "/api/analyze-podcast-text",
        json!({ "text": "EV demand cools" }),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    let doc: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(doc["summary"], "EV demand cools");
    assert_eq!(doc["tickers"][0]["symbol"], "TSLA");
    assert!(doc["macroView"].is_array());
}

#[tokio::test]
async fn test_analyze_with_ta_returns_report() {
    let (status, body) = send(post_json(
        "/api/analyze-podcast-with-ta",
        json!({ "text": "watch 2330" }),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    let report: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(report["technicals"]["TSLA"]["message"], "OK");
    assert_eq!(report["technicals"]["2330"]["market"], "TW");
    assert_eq!(report["technicals"]["2330"]["rsi14"], 50.0);
    assert!(report["finalAnswer"].as_str().unwrap().contains("Stocks:"));
}

#[tokio::test]
async fn test_clean_transcript() {
    let raw = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nhello\n";
    let (status, body) = send(post_json("/api/clean-transcript", json!({ "rawText": raw }))).await;

    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(response["cleanedText"], "hello");
}

#[tokio::test]
async fn test_process_podcast_vtt_analyzes_cleaned_text() {
    let raw = "WEBVTT\n1\n00:00:01.000 --> 00:00:02.000\n2454 looks cheap\n";
    let (status, body) = send(post_json("/api/process-podcast-vtt", json!({ "rawText": raw }))).await;

    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(response["cleanedText"], "2454 looks cheap");
    assert_eq!(response["analysis"]["analysis"]["summary"], "2454 looks cheap");
    assert!(response["analysis"]["technicals"]["2454"].is_object());
}

#[tokio::test]
async fn test_single_symbol_technicals() {
    let (status, body) = send(
        Request::get("/api/ta/us/tsla?days=30")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let summary: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(summary["symbol"], "TSLA");
    assert_eq!(summary["market"], "US");
    assert_eq!(summary["lastClose"], 50.0);
    assert_eq!(summary["aboveSma20"], true);
}

#[tokio::test]
async fn test_single_symbol_rejects_bad_input() {
    for uri in [
        "/api/ta/jp/7203",
        "/api/ta/tw/TSLA",
        "/api/ta/us/TOOLONG",
        "/api/ta/tw/2330?days=0",
        "/api/ta/tw/2330?days=4294967295",
        "/api/ta/us/AAPL?days=3651",
    ] {
        let (status, _) = send(Request::get(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
    }
}
