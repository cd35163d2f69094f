//! LinkService tests
//!
//! Dual-store write path against a real SQLite authoritative store and an
//! in-memory resolution store, plus failure injection on the resolution side.

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tempfile::TempDir;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::util::SubscriberInitExt;

use shardlink::config::{DatabaseConfig, LinksConfig};
use shardlink::errors::{Result, ShardlinkError};
use shardlink::resolution::{
    MemoryResolutionStore, ResolutionRecord, ResolutionStore, codec, resolution_key,
};
use shardlink::services::bootstrap::initialize_store;
use shardlink::services::shard_counter::LINK_COUNTER_NAME;
use shardlink::services::{CodeEncoder, CreateLinkRequest, LinkService, Resolver, ShardCounter};
use shardlink::storage::{
    ClickAttribution, LinkRecord, LinkRepository, LinkType, SeaOrmStorage, UtmInfo,
};

// =============================================================================
// Test Setup
// =============================================================================

/// Resolution store wrapper that counts writes and can be told to fail them
struct InstrumentedStore {
    inner: MemoryResolutionStore,
    creates: AtomicUsize,
    puts: AtomicUsize,
    fail_puts: AtomicBool,
}

impl InstrumentedStore {
    fn new() -> Self {
        Self {
            inner: MemoryResolutionStore::new(),
            creates: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            fail_puts: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ResolutionStore for InstrumentedStore {
    async fn create_if_absent(&self, key: &str, value: Bytes) -> Result<bool> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_if_absent(key, value).await
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(ShardlinkError::internal("redis: connection refused"));
        }
        self.inner.put(key, value).await
    }
}

/// Authoritative store wrapper with switchable write failures
struct FaultyLinks {
    inner: Arc<SeaOrmStorage>,
    fail_insert: AtomicBool,
    fail_remove: AtomicBool,
    fail_clear: AtomicBool,
}

impl FaultyLinks {
    fn new(inner: Arc<SeaOrmStorage>) -> Self {
        Self {
            inner,
            fail_insert: AtomicBool::new(false),
            fail_remove: AtomicBool::new(false),
            fail_clear: AtomicBool::new(false),
        }
    }

    fn fail_if(flag: &AtomicBool) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(ShardlinkError::internal(
                "disk I/O error: links.db-wal is read-only",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LinkRepository for FaultyLinks {
    async fn insert_link(&self, link: &LinkRecord) -> Result<()> {
        Self::fail_if(&self.fail_insert)?;
        self.inner.insert_link(link).await
    }

    async fn get_link(&self, id: &str) -> Result<Option<LinkRecord>> {
        LinkRepository::get_link(self.inner.as_ref(), id).await
    }

    async fn find_link(&self, code: &str, host: &str) -> Result<Option<LinkRecord>> {
        LinkRepository::find_link(self.inner.as_ref(), code, host).await
    }

    async fn remove_link(&self, id: &str) -> Result<bool> {
        Self::fail_if(&self.fail_remove)?;
        self.inner.remove_link(id).await
    }

    async fn mark_deleted(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<bool> {
        self.inner.mark_deleted(id, deleted_at).await
    }

    async fn clear_deleted(&self, id: &str) -> Result<bool> {
        Self::fail_if(&self.fail_clear)?;
        self.inner.clear_deleted(id).await
    }

    async fn increment_clicks(
        &self,
        code: &str,
        host: &str,
        attribution: &ClickAttribution,
    ) -> Result<bool> {
        self.inner.increment_clicks(code, host, attribution).await
    }
}

/// In-memory sink for log output of the current test thread
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture_logs() -> (LogBuffer, impl Drop) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let guard = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish()
        .set_default();
    (buffer, guard)
}

struct TestEnv {
    _dir: TempDir,
    storage: Arc<SeaOrmStorage>,
    links: Arc<FaultyLinks>,
    resolution: Arc<InstrumentedStore>,
    service: LinkService,
    resolver: Resolver,
}

async fn setup() -> TestEnv {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = DatabaseConfig {
        database_url: format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("link_service_test.db").display()
        ),
        ..Default::default()
    };
    let storage = Arc::new(
        SeaOrmStorage::new(&config, "sqlite")
            .await
            .expect("Failed to create storage"),
    );

    let counter = ShardCounter::new(storage.clone(), LINK_COUNTER_NAME, 1_000);
    let salt = initialize_store(&counter, storage.as_ref())
        .await
        .expect("Failed to initialize store");

    let links = Arc::new(FaultyLinks::new(storage.clone()));
    let resolution = Arc::new(InstrumentedStore::new());
    let service = LinkService::new(
        links.clone(),
        resolution.clone(),
        counter,
        CodeEncoder::new(&salt, 5),
        LinksConfig::default(),
    );
    let resolver = Resolver::new(resolution.clone());

    TestEnv {
        _dir: dir,
        storage,
        links,
        resolution,
        service,
        resolver,
    }
}

fn request(custom: Option<&str>, destination: &str) -> CreateLinkRequest {
    CreateLinkRequest {
        custom: custom.map(str::to_string),
        destination: destination.to_string(),
        creator: "user-1".to_string(),
        ..Default::default()
    }
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_create_custom_twice_is_already_exists() {
    let env = setup().await;

    env.service
        .create_link(request(Some("abc"), "https://example.com/a"))
        .await
        .unwrap();
    assert_eq!(env.resolution.creates.load(Ordering::SeqCst), 1);

    let err = env
        .service
        .create_link(request(Some("abc"), "https://example.com/b"))
        .await
        .unwrap_err();

    assert!(matches!(err, ShardlinkError::AlreadyExists(_)));
    // No resolution write for the rejected second call.
    assert_eq!(env.resolution.creates.load(Ordering::SeqCst), 1);

    // The first record is untouched.
    let resolved = env.resolver.resolve("abc", "").await.unwrap();
    assert_eq!(resolved.destination(), Some("https://example.com/a"));
}

#[tokio::test]
async fn test_same_code_on_different_hosts() {
    let env = setup().await;

    env.service
        .create_link(request(Some("docs"), "https://example.com/default"))
        .await
        .unwrap();
    let mut other = request(Some("docs"), "https://example.com/custom-host");
    other.host = "go.example.com".to_string();
    env.service.create_link(other).await.unwrap();

    let a = env.resolver.resolve("docs", "").await.unwrap();
    let b = env.resolver.resolve("docs", "go.example.com").await.unwrap();
    assert_eq!(a.destination(), Some("https://example.com/default"));
    assert_eq!(b.destination(), Some("https://example.com/custom-host"));
}

#[tokio::test]
async fn test_resolution_key_already_present_rolls_back() {
    let env = setup().await;

    // Stale resolution record with no authoritative counterpart.
    env.resolution
        .inner
        .put(
            &resolution_key("stale", ""),
            codec::encode(&ResolutionRecord::active(
                LinkType::Direct,
                "https://old.example",
            )),
        )
        .await
        .unwrap();

    let err = env
        .service
        .create_link(request(Some("stale"), "https://new.example"))
        .await
        .unwrap_err();

    assert!(err.is_internal());
    assert!(env.storage.find_link("stale", "").await.unwrap().is_none());
    // The pre-existing record is not overwritten.
    let resolved = env.resolver.resolve("stale", "").await.unwrap();
    assert_eq!(resolved.destination(), Some("https://old.example"));
}

#[tokio::test]
async fn test_rollback_failure_is_logged_and_internal() {
    let env = setup().await;
    env.resolution
        .inner
        .put(
            &resolution_key("orphan", ""),
            codec::encode(&ResolutionRecord::Tombstone),
        )
        .await
        .unwrap();
    env.links.fail_remove.store(true, Ordering::SeqCst);

    let (logs, _guard) = capture_logs();
    let err = env
        .service
        .create_link(request(Some("orphan"), "https://example.com"))
        .await
        .unwrap_err();

    assert!(err.is_internal());
    // Rollback could not run, so the authoritative record is left behind.
    assert!(env.storage.find_link("orphan", "").await.unwrap().is_some());
    let output = logs.contents();
    assert!(output.contains("compensation failed"), "{output}");
    assert!(output.contains("links.db-wal is read-only"), "{output}");
}

#[tokio::test]
async fn test_insert_failure_detail_is_logged_before_boundary() {
    let env = setup().await;
    env.links.fail_insert.store(true, Ordering::SeqCst);

    let (logs, _guard) = capture_logs();
    let err = env
        .service
        .create_link(request(Some("hidden"), "https://example.com"))
        .await
        .unwrap_err();

    assert!(!err.public().to_string().contains("read-only"));
    let output = logs.contents();
    assert!(output.contains("ERROR"), "{output}");
    assert!(output.contains("authoritative insert"), "{output}");
    assert!(output.contains("links.db-wal is read-only"), "{output}");
    assert_eq!(env.resolution.creates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_generated_codes_survive_many_creates() {
    let env = setup().await;

    let mut codes = std::collections::HashSet::new();
    for i in 0..50 {
        let link = env
            .service
            .create_link(request(None, &format!("https://example.com/{i}")))
            .await
            .unwrap();
        assert!(!link.is_custom);
        assert!(link.code.len() >= 5);
        assert!(codes.insert(link.code));
    }
}

#[tokio::test]
async fn test_invalid_requests_leave_no_state() {
    let env = setup().await;

    let mut too_many_tags = request(Some("tags"), "https://example.com");
    too_many_tags.tags = (0..16).map(|i| format!("t{i}")).collect();

    let mut bad_host = request(Some("host"), "https://example.com");
    bad_host.host = "bad$host".to_string();

    let mut long_note = request(Some("note"), "https://example.com");
    long_note.note = "n".repeat(101);

    for req in [
        request(Some("a b"), "https://example.com"),
        request(None, "javascript:alert(1)"),
        request(None, "ftp://example.com/file"),
        too_many_tags,
        bad_host,
        long_note,
    ] {
        let err = env.service.create_link(req).await.unwrap_err();
        assert!(matches!(err, ShardlinkError::InvalidArgument(_)), "{err}");
    }
    assert_eq!(env.resolution.creates.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Resolution scenarios
// =============================================================================

#[tokio::test]
async fn test_resolve_unknown_is_not_an_error() {
    let env = setup().await;
    let resolution = env.resolver.resolve("nothing", "").await.unwrap();
    assert!(!resolution.exists());
    assert!(!resolution.deleted());
}

#[tokio::test]
async fn test_resolve_merges_params_in_key_order() {
    let env = setup().await;

    let mut req = request(Some("merged"), "https://example.com/x");
    req.query_params = BTreeMap::from([
        ("b".to_string(), "2".to_string()),
        ("a".to_string(), "1".to_string()),
    ]);
    env.service.create_link(req).await.unwrap();

    let resolution = env.resolver.resolve("merged", "").await.unwrap();
    assert_eq!(resolution.destination(), Some("https://example.com/x?a=1&b=2"));
}

#[tokio::test]
async fn test_utm_overrides_explicit_param() {
    let env = setup().await;

    let mut req = request(Some("utm"), "https://example.com/x");
    req.query_params
        .insert("utm_source".to_string(), "explicit".to_string());
    req.utm = Some(UtmInfo {
        source: "newsletter".to_string(),
        campaign: "spring".to_string(),
        ..Default::default()
    });
    let link = env.service.create_link(req).await.unwrap();

    assert_eq!(link.query_params["utm_source"], "newsletter");
    let resolution = env.resolver.resolve("utm", "").await.unwrap();
    assert_eq!(
        resolution.destination(),
        Some("https://example.com/x?utm_campaign=spring&utm_source=newsletter")
    );
}

#[tokio::test]
async fn test_resolve_deleted_link() {
    let env = setup().await;
    let link = env
        .service
        .create_link(request(Some("bye"), "https://example.com"))
        .await
        .unwrap();

    env.service.delete_link(&link.id).await.unwrap();

    let resolution = env.resolver.resolve("bye", "").await.unwrap();
    assert!(resolution.exists());
    assert!(resolution.deleted());
    assert_eq!(resolution.destination(), None);

    let stored = env.service.get_link(&link.id).await.unwrap();
    assert!(stored.deleted);
    assert!(stored.deleted_at.is_some());
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn test_delete_tombstone_failure_reverts_soft_delete() {
    let env = setup().await;
    let link = env
        .service
        .create_link(request(Some("keep"), "https://example.com"))
        .await
        .unwrap();

    env.resolution.fail_puts.store(true, Ordering::SeqCst);
    let err = env.service.delete_link(&link.id).await.unwrap_err();
    assert!(err.is_internal());

    let stored = env.service.get_link(&link.id).await.unwrap();
    assert!(!stored.deleted);
    assert!(stored.deleted_at.is_none());
    let resolution = env.resolver.resolve("keep", "").await.unwrap();
    assert_eq!(resolution.destination(), Some("https://example.com"));
}

#[tokio::test]
async fn test_delete_revert_failure_keeps_primary_error() {
    let env = setup().await;
    let link = env
        .service
        .create_link(request(Some("stuck"), "https://example.com"))
        .await
        .unwrap();

    env.resolution.fail_puts.store(true, Ordering::SeqCst);
    env.links.fail_clear.store(true, Ordering::SeqCst);

    let (logs, _guard) = capture_logs();
    let err = env.service.delete_link(&link.id).await.unwrap_err();

    // The tombstone error surfaces, not the revert error.
    assert!(err.message().contains("connection refused"), "{err}");
    let stored = env.service.get_link(&link.id).await.unwrap();
    assert!(stored.deleted);
    // Resolution store still serves the live record.
    let resolution = env.resolver.resolve("stuck", "").await.unwrap();
    assert_eq!(resolution.destination(), Some("https://example.com"));
    assert!(logs.contents().contains("compensation failed"));
}

#[tokio::test]
async fn test_delete_unknown_and_repeated() {
    let env = setup().await;

    let err = env.service.delete_link("no-such-id").await.unwrap_err();
    assert!(matches!(err, ShardlinkError::NotFound(_)));

    let link = env
        .service
        .create_link(request(Some("twice"), "https://example.com"))
        .await
        .unwrap();
    env.service.delete_link(&link.id).await.unwrap();
    let puts_after_first = env.resolution.puts.load(Ordering::SeqCst);

    env.service.delete_link(&link.id).await.unwrap();
    assert_eq!(env.resolution.puts.load(Ordering::SeqCst), puts_after_first);
}

// =============================================================================
// Lookups and republish
// =============================================================================

#[tokio::test]
async fn test_get_and_find() {
    let env = setup().await;
    let mut req = request(Some("lookup"), "https://example.com");
    req.note = "release notes".to_string();
    req.tags = vec!["docs".to_string(), "v2".to_string()];
    let link = env.service.create_link(req).await.unwrap();

    let by_id = env.service.get_link(&link.id).await.unwrap();
    let by_code = env.service.find_link("lookup", "").await.unwrap();
    assert_eq!(by_id.id, by_code.id);
    assert_eq!(by_id.note, "release notes");
    assert_eq!(by_id.tags, vec!["docs", "v2"]);
    assert_eq!(by_id.creator, "user-1");

    assert!(matches!(
        env.service.get_link("missing").await.unwrap_err(),
        ShardlinkError::NotFound(_)
    ));
    assert!(matches!(
        env.service.find_link("lookup", "other.host").await.unwrap_err(),
        ShardlinkError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_republish_deleted_link_writes_tombstone() {
    let env = setup().await;
    let link = env
        .service
        .create_link(request(Some("ghost"), "https://example.com"))
        .await
        .unwrap();
    env.service.delete_link(&link.id).await.unwrap();

    // Simulate a resolution store that lost the tombstone.
    assert!(env.resolution.inner.forget("ghost$"));
    assert!(!env.resolver.resolve("ghost", "").await.unwrap().exists());

    let projection = env.service.republish(&link.id).await.unwrap();
    assert_eq!(projection, ResolutionRecord::Tombstone);
    assert!(env.resolver.resolve("ghost", "").await.unwrap().deleted());
}
