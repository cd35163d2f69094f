//! 点击计数写入
//!
//! One transaction bumps `links.total_clicks` and upserts every bucket row,
//! so a click is either fully counted or not counted at all.

use sea_orm::{
    ActiveValue::Set, ColumnTrait, EntityTrait, ExprTrait, QueryFilter, QuerySelect,
    TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use tracing::debug;

use super::SeaOrmStorage;
use super::retry;
use crate::errors::{Result, ShardlinkError};
use crate::storage::ClickAttribution;

use migration::entities::{link, link_click_bucket};

impl SeaOrmStorage {
    pub async fn increment_clicks(
        &self,
        code: &str,
        host: &str,
        attribution: &ClickAttribution,
    ) -> Result<bool> {
        let db = &self.db;
        let buckets = attribution.buckets();

        let counted = retry::with_retry(
            &format!("increment_clicks({}${})", code, host),
            self.retry_config,
            || async {
                let txn = db.begin().await?;

                let link_id: Option<String> = link::Entity::find()
                    .select_only()
                    .column(link::Column::Id)
                    .filter(link::Column::Code.eq(code))
                    .filter(link::Column::Host.eq(host))
                    .into_tuple()
                    .one(&txn)
                    .await?;
                let Some(link_id) = link_id else {
                    return Ok(false);
                };

                link::Entity::update_many()
                    .col_expr(
                        link::Column::TotalClicks,
                        Expr::col(link::Column::TotalClicks).add(Expr::val(1i64)),
                    )
                    .filter(link::Column::Id.eq(link_id.as_str()))
                    .exec(&txn)
                    .await?;

                for (dimension, key) in &buckets {
                    link_click_bucket::Entity::insert(link_click_bucket::ActiveModel {
                        link_id: Set(link_id.clone()),
                        dimension: Set(dimension.as_str().to_string()),
                        bucket: Set(key.to_string()),
                        clicks: Set(1),
                    })
                    .on_conflict(
                        OnConflict::columns([
                            link_click_bucket::Column::LinkId,
                            link_click_bucket::Column::Dimension,
                            link_click_bucket::Column::Bucket,
                        ])
                        .value(
                            link_click_bucket::Column::Clicks,
                            Expr::col((
                                link_click_bucket::Entity,
                                link_click_bucket::Column::Clicks,
                            ))
                            .add(Expr::val(1i64)),
                        )
                        .to_owned(),
                    )
                    .exec_without_returning(&txn)
                    .await?;
                }

                txn.commit().await?;
                Ok(true)
            },
        )
        .await
        .map_err(|e| {
            ShardlinkError::internal(format!("increment clicks of '{}' failed: {}", code, e))
        })?;

        if counted {
            debug!(
                "Click counted for {}${} ({} buckets)",
                code,
                host,
                buckets.len()
            );
        }
        Ok(counted)
    }
}
