use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::{RedisConfig, StaticConfig};
use crate::resolution::{MemoryResolutionStore, RedisResolutionStore, ResolutionStore};
use crate::services::bootstrap::initialize_store;
use crate::services::shard_counter::LINK_COUNTER_NAME;
use crate::services::{CodeEncoder, LinkService, Resolver, ShardCounter};
use crate::storage::{SeaOrmStorage, StorageFactory};

pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub resolution: Arc<dyn ResolutionStore>,
    pub link_service: Arc<LinkService>,
    pub resolver: Resolver,
}

/// 准备服务器与 CLI 共用的上下文
///
/// 连接两个存储、执行迁移与存储初始化，并构造所有核心组件。
/// 所有依赖都在这里显式创建并注入，没有全局句柄。
pub async fn prepare_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    // 仅在 provider 已安装时失败（例如同一进程内第二次启动）
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    let storage = StorageFactory::create(&config.database)
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());

    let counter = ShardCounter::new(
        storage.clone(),
        LINK_COUNTER_NAME,
        config.links.carry_threshold,
    );
    let salt = initialize_store(&counter, storage.as_ref())
        .await
        .context("Failed to initialize authoritative store")?;
    let encoder = CodeEncoder::new(&salt, config.links.code_min_length);
    debug!("Code encoder ready (min length {})", encoder.min_length());

    let resolution = create_resolution_store(&config.redis).await?;

    let link_service = Arc::new(LinkService::new(
        storage.clone(),
        resolution.clone(),
        counter,
        encoder,
        config.links.clone(),
    ));
    let resolver = Resolver::new(resolution.clone());

    info!(
        "Pre-startup completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        storage,
        resolution,
        link_service,
        resolver,
    })
}

/// 根据配置创建复制解析存储
///
/// redis.url 为空时退回进程内存储，仅适合单进程与本地调试。
async fn create_resolution_store(config: &RedisConfig) -> Result<Arc<dyn ResolutionStore>> {
    if config.url.trim().is_empty() {
        warn!(
            "redis.url is empty, using in-process resolution store. \
             Records are lost on restart and not shared between processes."
        );
        return Ok(Arc::new(MemoryResolutionStore::new()));
    }

    let store = RedisResolutionStore::connect(config)
        .await
        .context("Failed to connect to resolution store")?;
    info!("Resolution store: redis (prefix '{}')", config.key_prefix);
    Ok(Arc::new(store))
}
