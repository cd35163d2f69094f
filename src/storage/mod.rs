//! 权威存储
//!
//! `LinkRepository`、`CounterStore` 和 `SettingsStore` 是权威存储对外暴露的三个接缝。
//! 生产环境使用 `SeaOrmStorage`，测试与单进程运行可使用 `MemoryLinkStore`。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::DatabaseConfig;
use crate::errors::Result;

pub mod backend;
pub mod memory;
pub mod models;

pub use backend::SeaOrmStorage;
pub use memory::MemoryLinkStore;
pub use models::{
    ClickAttribution, ClickCounters, ClickDimension, LinkRecord, LinkType, UtmInfo,
};

/// 链接记录存储
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// 插入新记录；(code, host) 冲突时返回 `AlreadyExists`
    async fn insert_link(&self, link: &LinkRecord) -> Result<()>;

    async fn get_link(&self, id: &str) -> Result<Option<LinkRecord>>;

    async fn find_link(&self, code: &str, host: &str) -> Result<Option<LinkRecord>>;

    /// 物理删除，仅用于创建失败时的回滚
    async fn remove_link(&self, id: &str) -> Result<bool>;

    /// 软删除；返回 false 表示记录不存在
    async fn mark_deleted(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<bool>;

    /// 撤销软删除（清除 deleted 与 deleted_at）
    async fn clear_deleted(&self, id: &str) -> Result<bool>;

    /// 原子地为 (code, host) 对应记录累加一次点击
    ///
    /// Returns false when no record matches.
    async fn increment_clicks(
        &self,
        code: &str,
        host: &str,
        attribution: &ClickAttribution,
    ) -> Result<bool>;
}

/// 一次进位：shard[index] 减去 observed，shard[index + 1] 加 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardCarry {
    pub index: usize,
    pub observed: i64,
}

/// 分片计数器存储
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// 计数器不存在时创建为 `[0]`，已存在时不做修改
    async fn init_counter(&self, name: &str) -> Result<()>;

    /// 原子地 shard[0] += 1 并返回自增后的全部分片
    async fn increment_counter(&self, name: &str) -> Result<Vec<i64>>;

    /// 原子地应用一组进位
    ///
    /// Every carry is guarded by `shard[index] >= observed`. If any guard fails
    /// nothing is applied and `Ok(false)` is returned: another caller already
    /// carried that shard.
    async fn apply_carries(&self, name: &str, carries: &[ShardCarry]) -> Result<bool>;
}

/// 一次性生成的系统设置（盐值、数据格式版本）
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_setting(&self, name: &str) -> Result<Option<String>>;

    /// 不存在时写入；返回是否写入
    async fn insert_setting_if_absent(&self, name: &str, value: &str) -> Result<bool>;
}

pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(config: &DatabaseConfig) -> Result<Arc<SeaOrmStorage>> {
        // 从 URL 自动推断数据库类型
        let backend_type = backend::infer_backend_from_url(&config.database_url)?;

        let storage = SeaOrmStorage::new(config, &backend_type).await?;
        Ok(Arc::new(storage))
    }
}
