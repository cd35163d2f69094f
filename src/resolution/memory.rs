use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::trace;

use super::ResolutionStore;
use crate::errors::Result;

/// 进程内解析存储（测试与单进程部署）
#[derive(Default)]
pub struct MemoryResolutionStore {
    entries: DashMap<String, Bytes>,
}

impl MemoryResolutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 模拟解析存储丢失数据（测试使用）
    pub fn forget(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }
}

#[async_trait]
impl ResolutionStore for MemoryResolutionStore {
    async fn create_if_absent(&self, key: &str, value: Bytes) -> Result<bool> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(_) => {
                trace!("Resolution key already present: {}", key);
                Ok(false)
            }
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(true)
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}
