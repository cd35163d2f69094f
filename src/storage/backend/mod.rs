//! SeaORM storage backend
//!
//! This module provides the authoritative store using SeaORM,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL.

mod clicks;
mod connection;
mod converters;
mod counter;
mod mutations;
mod query;
pub mod retry;
mod settings;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use tracing::warn;

use crate::config::DatabaseConfig;
use crate::errors::{Result, ShardlinkError};
use crate::storage::{ClickAttribution, LinkRecord, LinkRepository};

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{link_to_active_model, model_to_link};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite://")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(ShardlinkError::invalid_argument(format!(
            "Cannot infer database type from URL: {}. Supported: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// SeaORM-based authoritative store
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    retry_config: retry::RetryConfig,
}

impl SeaOrmStorage {
    pub async fn new(config: &DatabaseConfig, backend_name: &str) -> Result<Self> {
        if config.database_url.is_empty() {
            return Err(ShardlinkError::invalid_argument("database_url is not set"));
        }

        let retry_config = retry::RetryConfig {
            max_retries: config.retry_count,
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
        };

        let db = if backend_name == "sqlite" {
            connect_sqlite(&config.database_url).await?
        } else {
            connect_generic(&config.database_url, backend_name, config.pool_size).await?
        };

        let storage = SeaOrmStorage {
            db,
            backend_name: backend_name.to_string(),
            retry_config,
        };

        run_migrations(&storage.db).await?;

        warn!(
            "{} Storage initialized.",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    /// 获取数据库连接（测试与运维工具直接访问数据库时使用）
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LinkRepository for SeaOrmStorage {
    async fn insert_link(&self, link: &LinkRecord) -> Result<()> {
        SeaOrmStorage::insert_link(self, link).await
    }

    async fn get_link(&self, id: &str) -> Result<Option<LinkRecord>> {
        SeaOrmStorage::get_link(self, id).await
    }

    async fn find_link(&self, code: &str, host: &str) -> Result<Option<LinkRecord>> {
        SeaOrmStorage::find_link(self, code, host).await
    }

    async fn remove_link(&self, id: &str) -> Result<bool> {
        SeaOrmStorage::remove_link(self, id).await
    }

    async fn mark_deleted(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<bool> {
        SeaOrmStorage::mark_deleted(self, id, deleted_at).await
    }

    async fn clear_deleted(&self, id: &str) -> Result<bool> {
        SeaOrmStorage::clear_deleted(self, id).await
    }

    async fn increment_clicks(
        &self,
        code: &str,
        host: &str,
        attribution: &ClickAttribution,
    ) -> Result<bool> {
        SeaOrmStorage::increment_clicks(self, code, host, attribution).await
    }
}
