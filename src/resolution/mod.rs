//! 复制解析存储
//!
//! Flat key -> binary record mapping read on every redirect. Records never
//! expire: this store is a second source of truth, not a cache.

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::Result;

pub mod codec;
pub mod memory;
pub mod redis;

pub use codec::{DecodeError, FORMAT_VERSION_V1, ResolutionRecord};
pub use memory::MemoryResolutionStore;
pub use redis::RedisResolutionStore;

/// 解析键中 code 与 host 之间的分隔符，code 与 host 中都不允许出现
pub const KEY_SEPARATOR: char = '$';

/// 解析键：`code + "$" + host`（默认域名时 host 为空）
pub fn resolution_key(code: &str, host: &str) -> String {
    let mut key = String::with_capacity(code.len() + 1 + host.len());
    key.push_str(code);
    key.push(KEY_SEPARATOR);
    key.push_str(host);
    key
}

#[async_trait]
pub trait ResolutionStore: Send + Sync {
    /// 仅当 key 不存在时写入；返回是否写入
    async fn create_if_absent(&self, key: &str, value: Bytes) -> Result<bool>;

    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// 无条件覆盖
    async fn put(&self, key: &str, value: Bytes) -> Result<()>;
}
