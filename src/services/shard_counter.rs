//! 分片计数器
//!
//! `next()` is a two-step protocol. Step one atomically bumps shard 0 and
//! returns the post-increment digits; that alone makes every result unique.
//! Step two carries any shard above the threshold into the next one. The
//! carry is best-effort: a failed or lost carry only leaves a shard larger
//! than the threshold, which the encoder accepts.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::Result;
use crate::storage::{CounterStore, ShardCarry};

/// 默认进位阈值：i32::MAX 的一半
pub const DEFAULT_CARRY_THRESHOLD: i64 = (i32::MAX / 2) as i64;

/// 短码计数器的固定名称
pub const LINK_COUNTER_NAME: &str = "link_counter";

#[derive(Clone)]
pub struct ShardCounter {
    store: Arc<dyn CounterStore>,
    name: String,
    carry_threshold: i64,
}

impl ShardCounter {
    pub fn new(store: Arc<dyn CounterStore>, name: impl Into<String>, carry_threshold: i64) -> Self {
        Self {
            store,
            name: name.into(),
            carry_threshold,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 计数器不存在时创建为 `[0]`
    pub async fn init(&self) -> Result<()> {
        self.store.init_counter(&self.name).await
    }

    /// 取下一个值，进位失败只记录日志
    pub async fn next(&self) -> Result<Vec<i64>> {
        let digits = self.increment().await?;

        if let Err(e) = self.normalize(&digits).await {
            warn!(
                "Counter '{}' carry normalization failed, will retry on a later call: {}",
                self.name, e
            );
        }
        Ok(digits)
    }

    /// 原子自增 shard 0，返回自增后的全部分片
    pub async fn increment(&self) -> Result<Vec<i64>> {
        self.store.increment_counter(&self.name).await
    }

    /// 根据一次读到的分片计算需要的进位
    pub fn pending_carries(&self, digits: &[i64]) -> Vec<ShardCarry> {
        digits
            .iter()
            .enumerate()
            .filter(|(_, value)| **value > self.carry_threshold)
            .map(|(index, value)| ShardCarry {
                index,
                observed: *value,
            })
            .collect()
    }

    /// 应用一次读取所需的进位；无需进位或已被他人进位时返回 false
    pub async fn normalize(&self, digits: &[i64]) -> Result<bool> {
        let carries = self.pending_carries(digits);
        if carries.is_empty() {
            return Ok(false);
        }

        let applied = self.store.apply_carries(&self.name, &carries).await?;
        debug!(
            "Counter '{}' carry {:?}: applied={}",
            self.name, carries, applied
        );
        Ok(applied)
    }
}
