use std::sync::Arc;

use chrono::{DateTime, Utc};
use folio_core::{
    FetchError, KeyValueStore, LocalCache, MemoryStore, QiitaClient, StoreError, CACHE_KEY,
};
use reqwest::Client;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ITEMS_PATH: &str = "/api/v2/users/Pitta/items";

fn sample_items() -> serde_json::Value {
    serde_json::json!([
        {
            "id": "c0ffee",
            "title": "Rust で音声解析",
            "url": "https://qiita.com/Pitta/items/c0ffee",
            "created_at": "2024-03-01T10:00:00+09:00",
            "updated_at": "2024-03-02T10:00:00+09:00",
            "likes_count": 12,
            "comments_count": 1,
            "tags": [{ "name": "Rust", "versions": [] }, { "name": "audio", "versions": ["1"] }],
            "user": { "id": "Pitta", "name": "Pitta", "profile_image_url": "https://example.com/p.png" },
            "private": false
        },
        {
            "id": "beef",
            "title": "Python メモ",
            "url": "https://qiita.com/Pitta/items/beef",
            "created_at": "2024-01-15T08:00:00+09:00",
            "updated_at": "2024-01-15T08:00:00+09:00",
            "likes_count": 4,
            "comments_count": 0,
            "tags": [{ "name": "Python", "versions": [] }],
            "user": { "id": "Pitta", "name": "Pitta", "profile_image_url": "" }
        }
    ])
}

fn client_for(server: &MockServer) -> QiitaClient {
    let endpoint =
        Url::parse(&format!("{}{}?page=1&per_page=20", server.uri(), ITEMS_PATH)).unwrap();
    QiitaClient::new(Client::new(), endpoint)
}

/// Storage that refuses every operation.
struct BrokenStore;

impl KeyValueStore for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }

    fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }
}

fn memory_cache() -> (MemoryStore, LocalCache) {
    let store = MemoryStore::new();
    let cache = LocalCache::new(Arc::new(store.clone()));
    (store, cache)
}

#[tokio::test]
async fn fetch_returns_articles_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_items()))
        .mount(&server)
        .await;

    let articles = client_for(&server).fetch().await.expect("fetch succeeds");
    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0].id, "c0ffee");
    assert_eq!(articles[0].likes_count, 12);
    assert_eq!(articles[0].tags[1].versions, vec!["1".to_string()]);
    assert_eq!(articles[1].user.profile_image_url, "");
}

#[tokio::test]
async fn successful_fetch_is_cached_and_served_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_items()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (store, cache) = memory_cache();

    let first = client.fetch_with_cache(&cache).await;
    assert_eq!(first.articles.len(), 2);
    assert!(first.error.is_none());
    assert!(!first.from_cache);
    assert!(store.contains(CACHE_KEY));

    let second = client.fetch_with_cache(&cache).await;
    assert!(second.from_cache);
    assert!(!second.rate_limited);
    assert_eq!(second.articles, first.articles);
}

#[tokio::test]
async fn forbidden_with_reset_header_is_rate_limited_and_cached() {
    let server = MockServer::start().await;
    let reset = Utc::now().timestamp() + 60;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .respond_with(ResponseTemplate::new(403).insert_header("rate-reset", reset.to_string()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (_store, cache) = memory_cache();

    let outcome = client.fetch_with_cache(&cache).await;
    assert!(outcome.rate_limited);
    assert!(outcome.articles.is_empty());
    assert_eq!(outcome.reset_at, DateTime::from_timestamp(reset, 0));
    let message = outcome.error.expect("rate limit message");
    assert!(message.contains("rate limit"), "{message}");
    assert!(!message.contains("unknown"), "{message}");

    let entry = cache.read().expect("rate limit window is cached");
    assert!(entry.articles.is_empty());
    assert_eq!(entry.rate_limit_reset, Some(reset));

    // A second mount inside the window is answered from the cache.
    let again = client.fetch_with_cache(&cache).await;
    assert!(again.from_cache);
    assert!(again.rate_limited);
    assert_eq!(again.reset_at, DateTime::from_timestamp(reset, 0));
}

#[tokio::test]
async fn lapsed_rate_limit_entry_does_not_block_the_next_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_items()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (_store, cache) = memory_cache();
    // Written two minutes ago for a one-minute window: still within the TTL,
    // but the window itself is over.
    let written = Utc::now() - chrono::Duration::minutes(2);
    let reset = (written + chrono::Duration::seconds(60)).timestamp();
    cache.write_at(written, &[], Some(reset));

    let outcome = client.fetch_with_cache(&cache).await;
    assert!(!outcome.from_cache);
    assert!(!outcome.rate_limited);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.articles.len(), 2);

    let entry = cache.read().expect("fresh result replaces the window");
    assert_eq!(entry.articles.len(), 2);
    assert_eq!(entry.rate_limit_reset, None);
}

#[tokio::test]
async fn forbidden_without_reset_header_reports_unknown_and_skips_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (store, cache) = memory_cache();

    let err = client.fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::RateLimited { reset_at: None }));

    let outcome = client.fetch_with_cache(&cache).await;
    assert!(outcome.rate_limited);
    assert_eq!(outcome.reset_at, None);
    assert!(outcome.error.unwrap().ends_with("unknown"));
    assert!(!store.contains(CACHE_KEY));
}

#[tokio::test]
async fn failing_cache_storage_still_returns_fresh_articles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_items()))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let cache = LocalCache::new(Arc::new(BrokenStore));

    for _ in 0..2 {
        let outcome = client.fetch_with_cache(&cache).await;
        assert!(outcome.error.is_none());
        assert!(!outcome.from_cache);
        assert_eq!(outcome.articles.len(), 2);
    }
}

#[tokio::test]
async fn other_status_is_a_generic_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (store, cache) = memory_cache();

    let err = client.fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Status(status) if status.as_u16() == 500));

    let outcome = client.fetch_with_cache(&cache).await;
    assert_eq!(outcome.error.as_deref(), Some("HTTP error! status: 500"));
    assert!(!outcome.rate_limited);
    assert!(outcome.articles.is_empty());
    assert!(!store.contains(CACHE_KEY));
}

#[tokio::test]
async fn malformed_body_is_a_decode_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));

    let (_store, cache) = memory_cache();
    let outcome = client.fetch_with_cache(&cache).await;
    assert!(outcome.error.is_some());
    assert!(outcome.articles.is_empty());
    assert!(cache.read().is_none());
}

#[tokio::test]
async fn unreachable_host_is_a_network_failure() {
    // Grab a free port, then release it so nothing is listening there.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let endpoint = Url::parse(&format!("http://127.0.0.1:{port}{ITEMS_PATH}")).unwrap();
    let client = QiitaClient::new(Client::new(), endpoint);

    let outcome = client.fetch_with_cache(&LocalCache::unavailable()).await;
    assert!(outcome.error.is_some());
    assert!(!outcome.rate_limited);
    assert!(outcome.articles.is_empty());
}
