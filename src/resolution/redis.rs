use async_trait::async_trait;
use bytes::Bytes;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, error, trace};

use super::ResolutionStore;
use crate::config::RedisConfig;
use crate::errors::{Result, ShardlinkError};

/// Redis 解析存储
///
/// `ConnectionManager` reconnects on its own after connection errors, so the
/// store keeps one cloned handle per call instead of tracking connection state.
#[derive(Clone)]
pub struct RedisResolutionStore {
    connection: ConnectionManager,
    key_prefix: String,
}

impl RedisResolutionStore {
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            ShardlinkError::invalid_argument(format!("invalid redis url '{}': {}", config.url, e))
        })?;

        let mut connection = ConnectionManager::new(client).await.map_err(|e| {
            error!(
                "Failed to connect to Redis server: {}. Check Redis server status and URL: {}",
                e, config.url
            );
            ShardlinkError::from(e)
        })?;

        let response: String = redis::cmd("PING").query_async(&mut connection).await?;
        debug!("Redis connection test successful: {}", response);

        Ok(Self {
            connection,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl ResolutionStore for RedisResolutionStore {
    async fn create_if_absent(&self, key: &str, value: Bytes) -> Result<bool> {
        let mut conn = self.connection.clone();
        let redis_key = self.make_key(key);

        // SET NX 不带过期时间
        let created: bool = conn.set_nx(&redis_key, value.as_ref()).await?;
        trace!("SET NX {} -> {}", redis_key, created);
        Ok(created)
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let mut conn = self.connection.clone();
        let redis_key = self.make_key(key);

        let value: Option<Vec<u8>> = conn.get(&redis_key).await?;
        Ok(value.map(Bytes::from))
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        let mut conn = self.connection.clone();
        let redis_key = self.make_key(key);

        let _: () = conn.set(&redis_key, value.as_ref()).await?;
        trace!("SET {}", redis_key);
        Ok(())
    }
}
