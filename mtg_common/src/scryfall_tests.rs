//! Tests for the Scryfall client
//!
//! HTTP behaviour is exercised against a wiremock server.

use crate::scryfall::{build_bulk_map, ArenaCard, ScryfallClient};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a client pointing at the given mock server.
fn client_with_mock(mock_uri: &str, cache_dir: &std::path::Path) -> ScryfallClient {
    let mut client = ScryfallClient::new(cache_dir);
    client.base_url = mock_uri.to_string();
    client
}

fn bulk_index(mock_uri: &str, updated_at: &str) -> String {
    serde_json::json!({
        "data": [
            {"type": "oracle_cards", "download_uri": format!("{}/oracle.json", mock_uri), "updated_at": updated_at},
            {"type": "default_cards", "download_uri": format!("{}/default.json", mock_uri), "updated_at": updated_at}
        ]
    })
    .to_string()
}

const BULK_CARDS: &str = r#"[
    {"arena_id": 69172, "name": "Lightning Strike", "set": "xln", "collector_number": "149", "rarity": "common"},
    {"arena_id": 70000, "name": "Opt", "set": "dom", "collector_number": "60", "rarity": "common"},
    {"name": "Paper Only", "set": "lea", "collector_number": "1", "rarity": "rare"}
]"#;

#[test]
fn test_card_meta_uppercases_set() {
    let card: ArenaCard = serde_json::from_str(
        r#"{"name": "Opt", "set": "dom", "collector_number": "60", "rarity": "common"}"#,
    )
    .unwrap();
    let meta = card.card_meta().unwrap();
    assert_eq!(meta.name, "Opt");
    assert_eq!(meta.set.as_deref(), Some("DOM"));
    assert_eq!(meta.collector_number.as_deref(), Some("60"));
}

#[test]
fn test_card_meta_requires_name() {
    let card: ArenaCard = serde_json::from_str(r#"{"set": "dom"}"#).unwrap();
    assert!(card.card_meta().is_none());
}

#[test]
fn test_build_bulk_map_skips_cards_without_arena_id() {
    let cards: Vec<ArenaCard> = serde_json::from_str(BULK_CARDS).unwrap();
    let map = build_bulk_map(&cards);
    assert_eq!(map.len(), 2);
    assert_eq!(map[&69172].name, "Lightning Strike");
    assert_eq!(map[&69172].set.as_deref(), Some("XLN"));
}

#[tokio::test]
async fn test_card_by_arena_id_success() {
    let mock_server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let client = client_with_mock(&mock_server.uri(), cache.path());

    Mock::given(method("GET"))
        .and(path("/cards/arena/69172"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"name": "Lightning Strike", "set": "xln", "collector_number": "149", "rarity": "common"}"#,
        ))
        .mount(&mock_server)
        .await;

    let meta = client.card_by_arena_id(69172).await.unwrap().unwrap();
    assert_eq!(meta.name, "Lightning Strike");
    assert_eq!(meta.set.as_deref(), Some("XLN"));
    assert_eq!(meta.rarity.as_deref(), Some("common"));
}

#[tokio::test]
async fn test_card_by_arena_id_not_found_is_none() {
    let mock_server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let client = client_with_mock(&mock_server.uri(), cache.path());

    Mock::given(method("GET"))
        .and(path("/cards/arena/1"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"object": "error"}"#))
        .mount(&mock_server)
        .await;

    assert!(client.card_by_arena_id(1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_card_by_arena_id_server_error() {
    let mock_server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let client = client_with_mock(&mock_server.uri(), cache.path());

    Mock::given(method("GET"))
        .and(path("/cards/arena/2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    assert!(client.card_by_arena_id(2).await.is_err());
}

#[tokio::test]
async fn test_bulk_map_downloads_and_caches() {
    let mock_server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let mut client = client_with_mock(&mock_server.uri(), cache.path());

    Mock::given(method("GET"))
        .and(path("/bulk-data"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(bulk_index(&mock_server.uri(), "2025-10-01T09:00:00+00:00")),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/default.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BULK_CARDS))
        .expect(1)
        .mount(&mock_server)
        .await;

    let map = client.bulk_map(false).await.unwrap();
    assert_eq!(map.len(), 2);
    assert!(cache.path().join("default_cards.json").exists());
    assert!(cache.path().join("default_cards.meta.json").exists());

    // Same updated_at: served from disk, download mock expects a single hit
    let map = client.bulk_map(false).await.unwrap();
    assert_eq!(map.len(), 2);
}

#[tokio::test]
async fn test_bulk_map_falls_back_to_cache_when_offline() {
    let mock_server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    std::fs::write(cache.path().join("default_cards.json"), BULK_CARDS).unwrap();

    let mut client = client_with_mock(&mock_server.uri(), cache.path());
    Mock::given(method("GET"))
        .and(path("/bulk-data"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let map = client.bulk_map(false).await.unwrap();
    assert_eq!(map[&70000].name, "Opt");
}

#[tokio::test]
async fn test_bulk_map_missing_dataset_errors() {
    let mock_server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let mut client = client_with_mock(&mock_server.uri(), cache.path());

    Mock::given(method("GET"))
        .and(path("/bulk-data"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data": []}"#))
        .mount(&mock_server)
        .await;

    assert!(client.bulk_map(false).await.is_err());
}
