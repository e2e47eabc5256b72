//! REST client integration tests against a local axum backend

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

use aether_market_data::{
    api::CHAT_FALLBACK, ApiClient, ChatClient, Config, HistorySource, MarketDataError, NewsClient,
    SentimentLabel,
};

#[derive(Deserialize)]
struct HistoryQuery {
    days: u32,
}

#[derive(Deserialize)]
struct NewsQuery {
    limit: usize,
}

async fn history(Path(symbol): Path<String>, Query(query): Query<HistoryQuery>) -> Json<Value> {
    let points: Vec<Value> = (0..query.days)
        .map(|i| {
            json!({
                "symbol": symbol,
                "price": 100.0 + f64::from(i),
                "timestamp": format!("2024-03-{:02}T00:00:00", i + 1),
                "change_24h": 0.0,
                "volume": 0.0
            })
        })
        .collect();
    Json(Value::Array(points))
}

async fn news(Query(query): Query<NewsQuery>) -> Json<Value> {
    let items: Vec<Value> = [
        ("1", "Oil prices surge as tensions rise", -0.8, "Bearish"),
        ("2", "Green Deal prompts solar investment", 0.9, "Bullish"),
        ("3", "Markets flat ahead of data", 0.0, "Neutral"),
    ]
    .iter()
    .take(query.limit)
    .map(|(id, title, score, label)| {
        json!({
            "id": id,
            "title": title,
            "url": format!("https://example.com/news/{}", id),
            "source": "Reuters",
            "published_at": "2024-03-01T09:00:00",
            "summary": null,
            "sentiment_score": score,
            "sentiment_label": label
        })
    })
    .collect();
    Json(Value::Array(items))
}

async fn chat(Json(body): Json<Value>) -> Json<Value> {
    let message = body["message"].as_str().unwrap_or_default();
    Json(json!({ "response": format!("echo: {}", message) }))
}

async fn spawn_backend(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn healthy_backend() -> ApiClient {
    let router = Router::new()
        .route("/api/v1/market/history/:symbol", get(history))
        .route("/api/v1/news/", get(news))
        .route("/api/v1/chat/", post(chat));
    let addr = spawn_backend(router).await;
    let config = Config::with_base_url(&format!("http://{}/api/v1", addr));
    ApiClient::new(Arc::new(config)).unwrap()
}

async fn failing_backend() -> ApiClient {
    let router = Router::new()
        .route(
            "/api/v1/market/history/:symbol",
            get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        )
        .route("/api/v1/news/", get(|| async { "<html>not json</html>" }))
        .route(
            "/api/v1/chat/",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
    let addr = spawn_backend(router).await;
    let config = Config::with_base_url(&format!("http://{}/api/v1", addr));
    ApiClient::new(Arc::new(config)).unwrap()
}

#[tokio::test]
async fn test_history_fetch() {
    let api = healthy_backend().await;
    let ticks = assert_ok!(api.fetch_history("ETH-USD", 7).await);

    assert_eq!(ticks.len(), 7);
    assert!(ticks.iter().all(|t| t.symbol == "ETH-USD"));
    assert_eq!(ticks[0].price, 100.0);
    assert_eq!(ticks[6].price, 106.0);
}

#[tokio::test]
async fn test_history_non_success_is_fetch_error() {
    let api = failing_backend().await;
    let err = assert_err!(api.fetch_history("BTC-USD", 1).await);
    assert!(matches!(err, MarketDataError::HistoryFetch(_)));
}

#[tokio::test]
async fn test_history_unreachable_is_fetch_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = Config::with_base_url(&format!("http://{}/api/v1", addr));
    let api = ApiClient::new(Arc::new(config)).unwrap();
    let err = assert_err!(api.fetch_history("BTC-USD", 1).await);
    assert!(matches!(err, MarketDataError::HistoryFetch(_)));
}

#[tokio::test]
async fn test_news_feed_with_sentiment() {
    let news = NewsClient::new(healthy_backend().await);
    let items = assert_ok!(news.fetch_latest(2).await);

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].sentiment_label, SentimentLabel::Bearish);
    assert_eq!(items[1].sentiment_label, SentimentLabel::Bullish);
    assert!(items[0].summary.is_none());
}

#[tokio::test]
async fn test_news_failure_degrades_to_empty() {
    let news = NewsClient::new(failing_backend().await);
    let err = assert_err!(news.fetch_latest(5).await);
    assert!(matches!(err, MarketDataError::News(_)));
    assert!(news.latest_or_empty(5).await.is_empty());
}

#[tokio::test]
async fn test_chat_round_trip() {
    let chat = ChatClient::new(healthy_backend().await);
    assert_eq!(chat.ask("what moves oil?").await, "echo: what moves oil?");
}

#[tokio::test]
async fn test_chat_failure_uses_fallback() {
    let chat = ChatClient::new(failing_backend().await);
    let err = assert_err!(chat.try_ask("hello").await);
    assert!(matches!(err, MarketDataError::Chat(_)));
    assert_eq!(chat.ask("hello").await, CHAT_FALLBACK);
}

#[tokio::test]
async fn test_chat_rejects_blank_message() {
    let chat = ChatClient::new(healthy_backend().await);
    assert!(chat.try_ask("   ").await.is_err());
}
