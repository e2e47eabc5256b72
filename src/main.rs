//! Aether Market Data - headless dashboard client
//!
//! Keeps the default chart series live (history snapshot + tick stream),
//! pulls the news feed, and serves the read model, health and metrics over a
//! small local HTTP surface.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::time::interval;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use aether_market_data::{
    metrics, ApiClient, AppState, ChatClient, Config, MarketSeriesStore, NewsClient, NewsItem,
    SeriesSnapshot, Tick,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Starting Aether Market Data client");

    // Load configuration
    let config = Arc::new(Config::load()?);
    info!(
        base_url = %config.api_base_url,
        symbol = %config.default_symbol,
        days = config.default_days,
        merge_policy = ?config.merge_policy,
        "Configuration loaded"
    );

    let api = ApiClient::new(config.clone())?;

    // Initial selection
    let mut store = MarketSeriesStore::new(config.clone(), Arc::new(api.clone()));
    store.select_series(&config.default_symbol, config.default_days)?;

    let state = Arc::new(AppState {
        store: Arc::new(RwLock::new(store)),
        chat: ChatClient::new(api.clone()),
        news: NewsClient::new(api),
        config: config.clone(),
    });

    // News feed
    let news_state = state.clone();
    tokio::spawn(async move {
        let items = news_state
            .news
            .latest_or_empty(news_state.config.news_limit)
            .await;
        for item in &items {
            info!(
                source = %item.source,
                sentiment = item.sentiment_label.badge(),
                score = item.sentiment_score,
                title = %item.title,
                "News item"
            );
        }
    });

    // Status logging
    let status_state = state.clone();
    tokio::spawn(async move {
        let mut status_interval = interval(Duration::from_secs(30));
        loop {
            status_interval.tick().await;
            let snapshot = status_state.store.read().await.snapshot();
            if let Some(key) = &snapshot.key {
                let last_tick_age_secs = snapshot
                    .ticks
                    .last()
                    .and_then(Tick::timestamp_utc)
                    .map(|ts| (chrono::Utc::now() - ts).num_seconds());
                info!(
                    symbol = %key.symbol,
                    days = key.days,
                    points = snapshot.ticks.len(),
                    last_price = ?snapshot.last_price(),
                    last_tick_age_secs = ?last_tick_age_secs,
                    live = snapshot.is_live,
                    load_state = ?snapshot.load_state,
                    "Series status"
                );
            }
        }
    });

    // Start health check server
    let health_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = start_health_server(health_state).await {
            warn!(error = %e, "Health server error");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    state.store.write().await.close();

    Ok(())
}

/// Start HTTP server for health checks, metrics and the series read model
async fn start_health_server(state: Arc<AppState>) -> anyhow::Result<()> {
    let port = state.config.health_port;

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_text))
        .route("/series", get(series).post(select_series))
        .route("/news", get(news))
        .route("/chat", post(chat))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(addr = %addr, "Starting health check server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let live = state.store.read().await.is_live();
    Json(serde_json::json!({
        "status": "healthy",
        "component": "market-data",
        "live": live,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn metrics_text() -> String {
    metrics::render()
}

async fn series(State(state): State<Arc<AppState>>) -> Json<SeriesSnapshot> {
    Json(state.store.read().await.snapshot())
}

#[derive(Debug, Deserialize)]
struct SelectRequest {
    symbol: String,
    days: u32,
}

async fn select_series(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectRequest>,
) -> Result<Json<SeriesSnapshot>, (StatusCode, String)> {
    let mut store = state.store.write().await;
    store
        .select_series(&request.symbol, request.days)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(store.snapshot()))
}

async fn news(State(state): State<Arc<AppState>>) -> Json<Vec<NewsItem>> {
    Json(state.news.latest_or_empty(state.config.news_limit).await)
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Json<serde_json::Value> {
    let response = state.chat.ask(&request.message).await;
    Json(serde_json::json!({ "response": response }))
}
