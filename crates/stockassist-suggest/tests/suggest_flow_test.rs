//! Suggestion flow against a mock HTTP backend.
//!
//! Input -> debounce -> GET /api/stock/suggest/{term} -> ranking -> update.

use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use stockassist_suggest::{
    append_symbol, SuggestClient, SuggestConfig, SuggestionService, SuggestionUpdate,
};
use tokio::time::timeout;

#[tokio::test]
async fn test_typed_term_is_fetched_ranked_and_published() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/stock/suggest/btc");
            then.status(200).json_body(json!([
                {"symbol": "XBT", "exchange": "KRAKEN", "name": "Bitcoin"},
                {"symbol": "BTCUSDT", "exchange": "BINANCE", "name": "Bitcoin / TetherUS", "type": "crypto"}
            ]));
        })
        .await;

    let client = SuggestClient::new(&server.base_url()).unwrap();
    let service = SuggestionService::new(Arc::new(client), SuggestConfig { debounce_ms: 20 });
    let mut rx = service.subscribe();

    service.on_input("AAPL, btc");

    timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("update within timeout")
        .unwrap();
    let update = rx.borrow().clone();
    mock.assert_async().await;

    let SuggestionUpdate::Ready {
        query, suggestions, ..
    } = update
    else {
        panic!("Expected Ready, got {update:?}");
    };
    assert_eq!(query, "btc");
    assert_eq!(suggestions[0].candidate.symbol, "BTCUSD");
    assert!(suggestions[0].is_exact_term_match);

    // Picking the top entry completes the input.
    let input = append_symbol("AAPL, btc", &suggestions[0].candidate.symbol);
    assert_eq!(input, "AAPL, BTCUSD, ");
}

#[tokio::test]
async fn test_backend_failure_hides_dropdown() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/stock/suggest/tsla");
            then.status(502);
        })
        .await;

    let client = SuggestClient::new(&server.base_url()).unwrap();
    let service = SuggestionService::new(Arc::new(client), SuggestConfig { debounce_ms: 20 });
    let mut rx = service.subscribe();

    service.on_input("tsla");
    timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("update within timeout")
        .unwrap();
    assert_eq!(*rx.borrow(), SuggestionUpdate::Hidden);
    assert_eq!(service.latest_request_id(), 1);
}
