//! Click attribution tests
//!
//! End-to-end through the bounded queue into the SQLite bucket tables.

use std::sync::Arc;

use tempfile::TempDir;

use shardlink::config::{DatabaseConfig, LinksConfig};
use shardlink::resolution::MemoryResolutionStore;
use shardlink::services::bootstrap::initialize_store;
use shardlink::services::{ClickAggregator, CodeEncoder, CreateLinkRequest, LinkService, ShardCounter};
use shardlink::storage::{LinkRecord, SeaOrmStorage};

const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

async fn setup(dir: &TempDir) -> (Arc<SeaOrmStorage>, LinkService) {
    let config = DatabaseConfig {
        database_url: format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("clicks_test.db").display()
        ),
        ..Default::default()
    };
    let storage = Arc::new(
        SeaOrmStorage::new(&config, "sqlite")
            .await
            .expect("Failed to create storage"),
    );
    let counter = ShardCounter::new(storage.clone(), "link_counter", 1_000);
    let salt = initialize_store(&counter, storage.as_ref()).await.unwrap();
    let service = LinkService::new(
        storage.clone(),
        Arc::new(MemoryResolutionStore::new()),
        counter,
        CodeEncoder::new(&salt, 5),
        LinksConfig::default(),
    );
    (storage, service)
}

async fn create(service: &LinkService, code: &str, host: &str) -> LinkRecord {
    service
        .create_link(CreateLinkRequest {
            custom: Some(code.to_string()),
            host: host.to_string(),
            destination: "https://example.com".to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_single_click_increments_every_dimension() {
    let dir = TempDir::new().unwrap();
    let (storage, service) = setup(&dir).await;
    let link = create(&service, "tw", "").await;

    let clicks = ClickAggregator::start(storage.clone(), 16);
    clicks.attribute("tw", "", CHROME_WINDOWS, "TW");
    clicks.shutdown().await;

    let stats = clicks.stats();
    assert_eq!((stats.processed, stats.failed, stats.dropped), (1, 0, 0));

    let counters = service.get_link(&link.id).await.unwrap().clicks;
    assert_eq!(counters.total, 1);
    assert_eq!(counters.by_country.get("TW"), Some(&1));
    assert_eq!(counters.by_os.get("windows"), Some(&1));
    assert_eq!(counters.by_device.get("desktop"), Some(&1));
    assert_eq!(counters.by_browser.get("chrome"), Some(&1));
}

#[tokio::test]
async fn test_clicks_accumulate_per_bucket() {
    let dir = TempDir::new().unwrap();
    let (storage, service) = setup(&dir).await;
    let link = create(&service, "many", "go.example.com").await;

    let clicks = ClickAggregator::start(storage.clone(), 64);
    for _ in 0..3 {
        clicks.attribute("many", "go.example.com", CHROME_WINDOWS, "TW");
    }
    clicks.attribute("many", "go.example.com", SAFARI_IPHONE, "");
    clicks.shutdown().await;

    let counters = service.get_link(&link.id).await.unwrap().clicks;
    assert_eq!(counters.total, 4);
    assert_eq!(counters.by_country.get("TW"), Some(&3));
    // Empty country gets no bucket.
    assert_eq!(counters.by_country.len(), 1);
    assert_eq!(counters.by_os.get("ios"), Some(&1));
    assert_eq!(counters.by_device.get("mobile"), Some(&1));
    assert_eq!(counters.by_browser.get("safari"), Some(&1));
    assert_eq!(counters.by_browser.get("chrome"), Some(&3));
}

#[tokio::test]
async fn test_unknown_link_counts_as_failed() {
    let dir = TempDir::new().unwrap();
    let (storage, _service) = setup(&dir).await;

    let clicks = ClickAggregator::start(storage, 16);
    clicks.attribute("ghost", "", CHROME_WINDOWS, "US");
    clicks.shutdown().await;

    let stats = clicks.stats();
    assert_eq!((stats.processed, stats.failed), (0, 1));
}

#[tokio::test]
async fn test_attribute_after_shutdown_is_dropped() {
    let dir = TempDir::new().unwrap();
    let (storage, service) = setup(&dir).await;
    let link = create(&service, "late", "").await;

    let clicks = ClickAggregator::start(storage, 16);
    clicks.shutdown().await;
    clicks.attribute("late", "", CHROME_WINDOWS, "TW");

    assert_eq!(clicks.stats().dropped, 1);
    assert_eq!(service.get_link(&link.id).await.unwrap().clicks.total, 0);
}
