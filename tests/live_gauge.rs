//! Connection gauge across a selection change
//!
//! Kept in its own test binary: the gauge lives in the process-wide registry.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, timeout};

use aether_market_data::metrics::metrics;
use aether_market_data::{
    Config, ConnectionState, HistorySource, MarketSeriesStore, MergePolicy, Result, Tick,
};
use common::{next_peer, spawn_ws_server, wait_for_state, WAIT};

struct EmptyHistory;

#[async_trait]
impl HistorySource for EmptyHistory {
    async fn fetch_history(&self, _symbol: &str, _days: u32) -> Result<Vec<Tick>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_superseded_connection_does_not_clear_live_gauge() {
    let (addr, mut peers) = spawn_ws_server().await;
    let config = Arc::new(Config {
        merge_policy: MergePolicy::DiscardInterim,
        reconnect_delay_ms: 50,
        ..Config::with_base_url(&format!("http://{}/api/v1", addr))
    });
    let mut store = MarketSeriesStore::new(config, Arc::new(EmptyHistory));

    store.select_series("BTC-USD", 1).unwrap();
    let btc_peer = next_peer(&mut peers).await;
    let mut state = store.watch_connection().unwrap();
    wait_for_state(&mut state, ConnectionState::Connected).await;
    assert_eq!(metrics().connection_live.get(), 1);

    store.select_series("ETH-USD", 7).unwrap();
    let _eth_peer = next_peer(&mut peers).await;
    let mut state = store.watch_connection().unwrap();
    wait_for_state(&mut state, ConnectionState::Connected).await;

    // the old worker finishes its teardown after the new one is live
    timeout(WAIT, btc_peer.gone).await.unwrap().unwrap();
    sleep(Duration::from_millis(200)).await;

    assert!(store.is_live());
    assert_eq!(metrics().connection_live.get(), 1);

    store.shutdown().await;
    assert_eq!(metrics().connection_live.get(), 0);
}
