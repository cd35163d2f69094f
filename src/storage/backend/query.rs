//! Query operations for SeaOrmStorage
//!
//! This module contains the read-only operations on link records.

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use super::converters::model_to_link;
use super::{SeaOrmStorage, retry};
use crate::errors::{Result, ShardlinkError};
use crate::storage::LinkRecord;

use migration::entities::{link, link_click_bucket};

impl SeaOrmStorage {
    pub async fn get_link(&self, id: &str) -> Result<Option<LinkRecord>> {
        let db = &self.db;
        let id_owned = id.to_string();

        let model = retry::with_retry(&format!("get_link({})", id), self.retry_config, || async {
            link::Entity::find_by_id(id_owned.clone()).one(db).await
        })
        .await
        .map_err(|e| ShardlinkError::internal(format!("query link '{}' failed: {}", id, e)))?;

        match model {
            Some(model) => self.with_buckets(model).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn find_link(&self, code: &str, host: &str) -> Result<Option<LinkRecord>> {
        let db = &self.db;

        let model = retry::with_retry(
            &format!("find_link({}${})", code, host),
            self.retry_config,
            || async {
                link::Entity::find()
                    .filter(link::Column::Code.eq(code))
                    .filter(link::Column::Host.eq(host))
                    .one(db)
                    .await
            },
        )
        .await
        .map_err(|e| ShardlinkError::internal(format!("query link '{}' failed: {}", code, e)))?;

        match model {
            Some(model) => self.with_buckets(model).await.map(Some),
            None => Ok(None),
        }
    }

    async fn with_buckets(&self, model: link::Model) -> Result<LinkRecord> {
        let db = &self.db;
        let link_id = model.id.clone();

        let buckets = retry::with_retry("load_click_buckets", self.retry_config, || async {
            link_click_bucket::Entity::find()
                .filter(link_click_bucket::Column::LinkId.eq(link_id.as_str()))
                .all(db)
                .await
        })
        .await
        .map_err(|e| {
            ShardlinkError::internal(format!("query click buckets of '{}' failed: {}", link_id, e))
        })?;

        model_to_link(model, buckets)
    }
}
