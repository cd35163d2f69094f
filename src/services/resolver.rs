//! 短链接解析
//!
//! Reads the resolution store only. The authoritative store is never
//! consulted on this path, not even on a miss.

use std::sync::Arc;

use tracing::{error, trace};

use crate::errors::Result;
use crate::resolution::{ResolutionRecord, ResolutionStore, codec, resolution_key};

/// 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    NotFound,
    Deleted,
    Redirect(String),
}

impl Resolution {
    pub fn exists(&self) -> bool {
        !matches!(self, Resolution::NotFound)
    }

    pub fn deleted(&self) -> bool {
        matches!(self, Resolution::Deleted)
    }

    pub fn destination(&self) -> Option<&str> {
        match self {
            Resolution::Redirect(destination) => Some(destination),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn ResolutionStore>,
}

impl Resolver {
    pub fn new(store: Arc<dyn ResolutionStore>) -> Self {
        Self { store }
    }

    /// 解析 (code, host)；未命中不是错误
    pub async fn resolve(&self, code: &str, host: &str) -> Result<Resolution> {
        let key = resolution_key(code, host);

        let Some(data) = self.store.get(&key).await.inspect_err(|e| {
            error!("Resolver: resolution store read for '{}' failed: {}", key, e);
        })?
        else {
            trace!("Resolver: miss for '{}'", key);
            return Ok(Resolution::NotFound);
        };

        let record = codec::decode(&data).map_err(|e| {
            error!("Resolver: corrupt record under '{}': {}", key, e);
            e
        })?;

        Ok(match record {
            ResolutionRecord::Tombstone => Resolution::Deleted,
            ResolutionRecord::Active { destination, .. } => Resolution::Redirect(destination),
        })
    }
}
