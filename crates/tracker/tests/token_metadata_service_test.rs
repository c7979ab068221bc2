use futures::future::join_all;
use serde_json::json;
use shared::config::TokenListConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use storage::{keys, FileStore, KeyValueStore, MemoryStore};
use tracker::{TokenCacheSnapshot, TokenMetadataService};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
const BONK: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";
const WSOL: &str = "So11111111111111111111111111111111111111112";

fn token_list() -> serde_json::Value {
    json!([
        {
            "address": USDC,
            "symbol": "USDC",
            "name": "USD Coin",
            "decimals": 6,
            "logoURI": "https://example.com/usdc.png",
            "tags": ["stablecoin"]
        },
        {
            "address": BONK,
            "symbol": "Bonk",
            "name": "Bonk",
            "decimals": 5
        },
        {
            "address": WSOL,
            "symbol": "SOL",
            "name": "Wrapped SOL",
            "decimals": 9
        }
    ])
}

fn config(server: &MockServer) -> TokenListConfig {
    TokenListConfig {
        url: format!("{}/all", server.uri()),
        fetch_timeout: Duration::from_secs(5),
        cache_ttl: Duration::from_secs(300),
    }
}

fn cached_usdc_only(age: Duration) -> TokenCacheSnapshot {
    let mut data = HashMap::new();
    data.insert(
        USDC.to_string(),
        serde_json::from_value(json!({
            "address": USDC,
            "symbol": "USDC-cached",
            "name": "USD Coin",
            "decimals": 6
        }))
        .unwrap(),
    );
    let mut snapshot = TokenCacheSnapshot::new(data);
    snapshot.timestamp -= age.as_millis() as i64;
    snapshot
}

async fn seed(kv: &MemoryStore, snapshot: &TokenCacheSnapshot) {
    kv.set(keys::TOKEN_CACHE, &serde_json::to_string(snapshot).unwrap())
        .await
        .unwrap();
}

async fn mount_list(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_list()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_loads_directory_from_feed_and_persists_it() {
    let server = MockServer::start().await;
    mount_list(&server, 1).await;
    let kv = Arc::new(MemoryStore::new());
    let service = TokenMetadataService::new(config(&server), kv.clone());

    assert!(!service.is_loaded());
    service.load_token_list().await;

    assert!(service.is_loaded());
    assert_eq!(service.token_count(), 3);
    let usdc = service.get_token_metadata(USDC).unwrap();
    assert_eq!(usdc.symbol, "USDC");
    assert_eq!(usdc.logo_uri.as_deref(), Some("https://example.com/usdc.png"));

    let persisted: TokenCacheSnapshot =
        serde_json::from_str(&kv.get(keys::TOKEN_CACHE).await.unwrap().unwrap()).unwrap();
    assert_eq!(persisted.data.len(), 3);
    assert!(persisted.is_fresh(Duration::from_secs(300)));
}

#[tokio::test]
async fn test_second_load_is_a_no_op() {
    let server = MockServer::start().await;
    mount_list(&server, 1).await;
    let service = TokenMetadataService::new(config(&server), Arc::new(MemoryStore::new()));

    service.load_token_list().await;
    service.load_token_list().await;

    assert_eq!(service.token_count(), 3);
}

#[tokio::test]
async fn test_fresh_snapshot_skips_feed() {
    let server = MockServer::start().await;
    mount_list(&server, 0).await;
    let kv = Arc::new(MemoryStore::new());
    seed(&kv, &cached_usdc_only(Duration::from_secs(60))).await;

    let service = TokenMetadataService::new(config(&server), kv);
    service.load_token_list().await;

    assert!(service.is_loaded());
    assert_eq!(service.token_count(), 1);
    assert_eq!(service.get_token_metadata(USDC).unwrap().symbol, "USDC-cached");
}

#[tokio::test]
async fn test_stale_snapshot_is_refetched() {
    let server = MockServer::start().await;
    mount_list(&server, 1).await;
    let kv = Arc::new(MemoryStore::new());
    seed(&kv, &cached_usdc_only(Duration::from_secs(600))).await;

    let service = TokenMetadataService::new(config(&server), kv.clone());
    service.load_token_list().await;

    assert_eq!(service.token_count(), 3);
    assert_eq!(service.get_token_metadata(USDC).unwrap().symbol, "USDC");

    let persisted: TokenCacheSnapshot =
        serde_json::from_str(&kv.get(keys::TOKEN_CACHE).await.unwrap().unwrap()).unwrap();
    assert_eq!(persisted.data.len(), 3);
}

#[tokio::test]
async fn test_future_dated_snapshot_is_refetched() {
    let server = MockServer::start().await;
    mount_list(&server, 1).await;
    let kv = Arc::new(MemoryStore::new());
    let mut future = cached_usdc_only(Duration::ZERO);
    future.timestamp += Duration::from_secs(10 * 365 * 24 * 3600).as_millis() as i64;
    seed(&kv, &future).await;

    let service = TokenMetadataService::new(config(&server), kv);
    service.load_token_list().await;

    assert_eq!(service.token_count(), 3);
    assert_eq!(service.get_token_metadata(USDC).unwrap().symbol, "USDC");
}

#[tokio::test]
async fn test_feed_failure_falls_back_to_stale_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/all"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    let kv = Arc::new(MemoryStore::new());
    let stale = cached_usdc_only(Duration::from_secs(3600));
    seed(&kv, &stale).await;

    let service = TokenMetadataService::new(config(&server), kv.clone());
    service.load_token_list().await;

    assert!(service.is_loaded());
    assert_eq!(service.get_token_metadata(USDC).unwrap().symbol, "USDC-cached");

    // The stale snapshot is not rewritten with a new timestamp
    let persisted: TokenCacheSnapshot =
        serde_json::from_str(&kv.get(keys::TOKEN_CACHE).await.unwrap().unwrap()).unwrap();
    assert_eq!(persisted.timestamp, stale.timestamp);
}

#[tokio::test]
async fn test_feed_failure_without_snapshot_leaves_directory_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/all"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    let kv = Arc::new(MemoryStore::new());
    let service = TokenMetadataService::new(config(&server), kv.clone());

    service.load_token_list().await;

    assert!(!service.is_loaded());
    assert_eq!(service.token_count(), 0);
    assert!(service.get_token_metadata(USDC).is_none());
    assert!(service.search_tokens("usd").is_empty());
    assert_eq!(kv.get(keys::TOKEN_CACHE).await.unwrap(), None);

    // Not loaded, so the next call tries again
    service.load_token_list().await;
    assert!(!service.is_loaded());
}

#[tokio::test]
async fn test_slow_feed_is_abandoned_after_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/all"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_list())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let config = TokenListConfig {
        fetch_timeout: Duration::from_millis(200),
        ..config(&server)
    };
    let service = TokenMetadataService::new(config, Arc::new(MemoryStore::new()));

    let started = std::time::Instant::now();
    service.load_token_list().await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!service.is_loaded());
    assert_eq!(service.token_count(), 0);
}

#[tokio::test]
async fn test_malformed_feed_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tokens": "nope" })))
        .mount(&server)
        .await;
    let service = TokenMetadataService::new(config(&server), Arc::new(MemoryStore::new()));

    service.load_token_list().await;

    assert!(!service.is_loaded());
    assert_eq!(service.token_count(), 0);
}

#[tokio::test]
async fn test_unreadable_snapshot_is_ignored() {
    let server = MockServer::start().await;
    mount_list(&server, 1).await;
    let kv = Arc::new(MemoryStore::new());
    kv.set(keys::TOKEN_CACHE, "{not json").await.unwrap();

    let service = TokenMetadataService::new(config(&server), kv);
    service.load_token_list().await;

    assert_eq!(service.token_count(), 3);
}

#[tokio::test]
async fn test_concurrent_loads_share_one_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/all"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_list())
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let service = TokenMetadataService::new(config(&server), Arc::new(MemoryStore::new()));

    join_all((0..8).map(|_| service.load_token_list())).await;

    assert!(service.is_loaded());
    assert_eq!(service.token_count(), 3);
}

#[tokio::test]
async fn test_search_is_case_insensitive_and_sorted() {
    let server = MockServer::start().await;
    mount_list(&server, 1).await;
    let service = TokenMetadataService::new(config(&server), Arc::new(MemoryStore::new()));
    service.load_token_list().await;

    let by_name: Vec<String> = service
        .search_tokens("coin")
        .into_iter()
        .map(|t| t.symbol)
        .collect();
    assert_eq!(by_name, vec!["USDC"]);

    let by_symbol: Vec<String> = service
        .search_tokens("o")
        .into_iter()
        .map(|t| t.symbol)
        .collect();
    assert_eq!(by_symbol, vec!["Bonk", "SOL", "USDC"]);

    assert!(service.search_tokens("doge").is_empty());
}

#[tokio::test]
async fn test_get_multiple_skips_unknown_mints() {
    let server = MockServer::start().await;
    mount_list(&server, 1).await;
    let service = TokenMetadataService::new(config(&server), Arc::new(MemoryStore::new()));
    service.load_token_list().await;

    let found = service.get_multiple_token_metadata(&[
        USDC.to_string(),
        "UnknownMint1111111111111111111111111111111".to_string(),
        WSOL.to_string(),
    ]);

    assert_eq!(found.len(), 2);
    assert_eq!(found[USDC].decimals, 6);
    assert_eq!(found[WSOL].symbol, "SOL");
}

#[tokio::test]
async fn test_snapshot_survives_restart_with_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    mount_list(&server, 1).await;

    let first = TokenMetadataService::new(
        config(&server),
        Arc::new(FileStore::open(dir.path()).await.unwrap()),
    );
    first.load_token_list().await;

    // Second process: snapshot is fresh, so the feed is not hit again
    let second = TokenMetadataService::new(
        config(&server),
        Arc::new(FileStore::open(dir.path()).await.unwrap()),
    );
    second.load_token_list().await;

    assert_eq!(second.token_count(), 3);
}
