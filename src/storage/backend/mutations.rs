//! Mutation operations for SeaOrmStorage
//!
//! This module contains the write operations on link records.

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, SqlErr, sea_query::Expr};
use tracing::info;

use super::SeaOrmStorage;
use super::converters::link_to_active_model;
use super::retry;
use crate::errors::{Result, ShardlinkError};
use crate::storage::LinkRecord;

use migration::entities::link;

impl SeaOrmStorage {
    pub async fn insert_link(&self, record: &LinkRecord) -> Result<()> {
        let db = &self.db;
        let active_model = link_to_active_model(record)?;

        let result = retry::with_retry(
            &format!("insert_link({})", record.code),
            self.retry_config,
            || async {
                link::Entity::insert(active_model.clone())
                    .exec_without_returning(db)
                    .await
            },
        )
        .await;

        match result {
            Ok(_) => {
                info!(
                    "Link inserted: id={}, code={}, host='{}'",
                    record.id, record.code, record.host
                );
                Ok(())
            }
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(ShardlinkError::already_exists(format!(
                    "code '{}' already exists for host '{}'",
                    record.code, record.host
                )))
            }
            Err(e) => Err(ShardlinkError::internal(format!(
                "insert link '{}' failed: {}",
                record.code, e
            ))),
        }
    }

    pub async fn remove_link(&self, id: &str) -> Result<bool> {
        let db = &self.db;
        let id_owned = id.to_string();

        let result = retry::with_retry(&format!("remove_link({})", id), self.retry_config, || async {
            link::Entity::delete_by_id(id_owned.clone()).exec(db).await
        })
        .await
        .map_err(|e| ShardlinkError::internal(format!("remove link '{}' failed: {}", id, e)))?;

        if result.rows_affected > 0 {
            info!("Link removed: {}", id);
        }
        Ok(result.rows_affected > 0)
    }

    pub async fn mark_deleted(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<bool> {
        self.set_deleted(id, Some(deleted_at)).await
    }

    pub async fn clear_deleted(&self, id: &str) -> Result<bool> {
        self.set_deleted(id, None).await
    }

    async fn set_deleted(&self, id: &str, deleted_at: Option<DateTime<Utc>>) -> Result<bool> {
        let db = &self.db;
        let id_owned = id.to_string();

        let result = retry::with_retry(&format!("set_deleted({})", id), self.retry_config, || async {
            link::Entity::update_many()
                .col_expr(link::Column::Deleted, Expr::value(deleted_at.is_some()))
                .col_expr(link::Column::DeletedAt, Expr::value(deleted_at))
                .filter(link::Column::Id.eq(id_owned.as_str()))
                .exec(db)
                .await
        })
        .await
        .map_err(|e| {
            ShardlinkError::internal(format!("update deleted flag of '{}' failed: {}", id, e))
        })?;

        Ok(result.rows_affected > 0)
    }
}
