use async_trait::async_trait;
use sea_orm::{ActiveValue::Set, EntityTrait, sea_query::OnConflict};

use super::SeaOrmStorage;
use super::retry;
use crate::errors::{Result, ShardlinkError};
use crate::storage::SettingsStore;

use migration::entities::setting;

#[async_trait]
impl SettingsStore for SeaOrmStorage {
    async fn get_setting(&self, name: &str) -> Result<Option<String>> {
        let db = &self.db;
        let name_owned = name.to_string();

        let model = retry::with_retry(&format!("get_setting({})", name), self.retry_config, || async {
            setting::Entity::find_by_id(name_owned.clone()).one(db).await
        })
        .await
        .map_err(|e| ShardlinkError::internal(format!("read setting '{}' failed: {}", name, e)))?;

        Ok(model.map(|m| m.value))
    }

    async fn insert_setting_if_absent(&self, name: &str, value: &str) -> Result<bool> {
        let db = &self.db;

        let inserted = retry::with_retry(
            &format!("insert_setting({})", name),
            self.retry_config,
            || async {
                setting::Entity::insert(setting::ActiveModel {
                    name: Set(name.to_string()),
                    value: Set(value.to_string()),
                })
                .on_conflict(
                    OnConflict::column(setting::Column::Name)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(db)
                .await
            },
        )
        .await
        .map_err(|e| ShardlinkError::internal(format!("write setting '{}' failed: {}", name, e)))?;

        Ok(inserted > 0)
    }
}
