//! 进程内权威存储
//!
//! Atomicity comes from DashMap entry locks: every operation that has to be
//! atomic runs while holding exactly one entry guard.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::errors::{Result, ShardlinkError};
use crate::storage::{
    ClickAttribution, CounterStore, LinkRecord, LinkRepository, SettingsStore, ShardCarry,
};

#[derive(Default)]
pub struct MemoryLinkStore {
    links: DashMap<String, LinkRecord>,
    /// (code, host) -> id 唯一索引
    index: DashMap<(String, String), String>,
    counters: DashMap<String, Vec<i64>>,
    settings: DashMap<String, String>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前分片（测试使用）
    pub fn counter_digits(&self, name: &str) -> Option<Vec<i64>> {
        self.counters.get(name).map(|d| d.clone())
    }

    /// 直接设置分片（测试使用）
    pub fn set_counter_digits(&self, name: &str, digits: Vec<i64>) {
        self.counters.insert(name.to_string(), digits);
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    fn set_deleted(&self, id: &str, deleted_at: Option<DateTime<Utc>>) -> bool {
        match self.links.get_mut(id) {
            Some(mut link) => {
                link.deleted = deleted_at.is_some();
                link.deleted_at = deleted_at;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl LinkRepository for MemoryLinkStore {
    async fn insert_link(&self, link: &LinkRecord) -> Result<()> {
        match self.index.entry((link.code.clone(), link.host.clone())) {
            Entry::Occupied(_) => Err(ShardlinkError::already_exists(format!(
                "code '{}' already exists for host '{}'",
                link.code, link.host
            ))),
            Entry::Vacant(slot) => {
                self.links.insert(link.id.clone(), link.clone());
                slot.insert(link.id.clone());
                Ok(())
            }
        }
    }

    async fn get_link(&self, id: &str) -> Result<Option<LinkRecord>> {
        Ok(self.links.get(id).map(|l| l.clone()))
    }

    async fn find_link(&self, code: &str, host: &str) -> Result<Option<LinkRecord>> {
        let id = self
            .index
            .get(&(code.to_string(), host.to_string()))
            .map(|id| id.clone());
        Ok(id.and_then(|id| self.links.get(&id).map(|l| l.clone())))
    }

    async fn remove_link(&self, id: &str) -> Result<bool> {
        match self.links.remove(id) {
            Some((_, link)) => {
                self.index.remove(&(link.code, link.host));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_deleted(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<bool> {
        Ok(self.set_deleted(id, Some(deleted_at)))
    }

    async fn clear_deleted(&self, id: &str) -> Result<bool> {
        Ok(self.set_deleted(id, None))
    }

    async fn increment_clicks(
        &self,
        code: &str,
        host: &str,
        attribution: &ClickAttribution,
    ) -> Result<bool> {
        let id = self
            .index
            .get(&(code.to_string(), host.to_string()))
            .map(|id| id.clone());
        let Some(id) = id else {
            return Ok(false);
        };
        match self.links.get_mut(&id) {
            Some(mut link) => {
                link.clicks.apply(attribution);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl CounterStore for MemoryLinkStore {
    async fn init_counter(&self, name: &str) -> Result<()> {
        self.counters.entry(name.to_string()).or_insert_with(|| vec![0]);
        Ok(())
    }

    async fn increment_counter(&self, name: &str) -> Result<Vec<i64>> {
        let mut digits = self.counters.get_mut(name).ok_or_else(|| {
            ShardlinkError::internal(format!("counter '{}' is not initialized", name))
        })?;
        digits[0] += 1;
        Ok(digits.clone())
    }

    async fn apply_carries(&self, name: &str, carries: &[ShardCarry]) -> Result<bool> {
        let mut digits = self.counters.get_mut(name).ok_or_else(|| {
            ShardlinkError::internal(format!("counter '{}' is not initialized", name))
        })?;

        let mut next = digits.clone();
        for carry in carries {
            match next.get(carry.index) {
                Some(&value) if value >= carry.observed => {}
                _ => return Ok(false),
            }
            next[carry.index] -= carry.observed;
            if carry.index + 1 == next.len() {
                next.push(1);
            } else {
                next[carry.index + 1] += 1;
            }
        }
        *digits = next;
        Ok(true)
    }
}

#[async_trait]
impl SettingsStore for MemoryLinkStore {
    async fn get_setting(&self, name: &str) -> Result<Option<String>> {
        Ok(self.settings.get(name).map(|v| v.clone()))
    }

    async fn insert_setting_if_absent(&self, name: &str, value: &str) -> Result<bool> {
        match self.settings.entry(name.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(value.to_string());
                Ok(true)
            }
        }
    }
}
