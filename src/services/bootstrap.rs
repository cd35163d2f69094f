//! 权威存储初始化
//!
//! Idempotent; run at every startup after migrations. Existing values are
//! never overwritten.

use tracing::{debug, info};

use crate::errors::{Result, ShardlinkError};
use crate::services::code_encoder::CodeEncoder;
use crate::services::shard_counter::ShardCounter;
use crate::storage::SettingsStore;

/// 数据格式版本在 settings 表中的键
pub const FORMAT_VERSION_SETTING: &str = "format_version";

/// 当前数据格式版本
pub const CURRENT_FORMAT_VERSION: u32 = 1;

/// 创建计数器、检查数据格式版本、加载（或生成）盐值
///
/// Returns the persisted salt.
pub async fn initialize_store(counter: &ShardCounter, settings: &dyn SettingsStore) -> Result<String> {
    counter.init().await?;
    debug!("Counter '{}' ready", counter.name());

    if settings
        .insert_setting_if_absent(FORMAT_VERSION_SETTING, &CURRENT_FORMAT_VERSION.to_string())
        .await?
    {
        info!("Initialized data format version {}", CURRENT_FORMAT_VERSION);
    }
    let stored = settings
        .get_setting(FORMAT_VERSION_SETTING)
        .await?
        .unwrap_or_default();
    if stored.parse::<u32>().ok() != Some(CURRENT_FORMAT_VERSION) {
        return Err(ShardlinkError::internal(format!(
            "unsupported data format version '{}', expected {}",
            stored, CURRENT_FORMAT_VERSION
        )));
    }

    CodeEncoder::load_salt(settings).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryLinkStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let store = Arc::new(MemoryLinkStore::new());
        let counter = ShardCounter::new(store.clone(), "links", 100);

        let salt = initialize_store(&counter, store.as_ref()).await.unwrap();
        counter.next().await.unwrap();
        let again = initialize_store(&counter, store.as_ref()).await.unwrap();

        assert_eq!(salt, again);
        assert_eq!(store.counter_digits("links").unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_unknown_format_version_is_rejected() {
        let store = Arc::new(MemoryLinkStore::new());
        store
            .insert_setting_if_absent(FORMAT_VERSION_SETTING, "2")
            .await
            .unwrap();
        let counter = ShardCounter::new(store.clone(), "links", 100);

        let err = initialize_store(&counter, store.as_ref()).await.unwrap_err();
        assert!(err.is_internal());
    }
}
