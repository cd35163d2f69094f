//! 分片计数器（counter_shards 表）
//!
//! Each shard is one row. Incrementing shard 0 and reading back every shard
//! happen inside one transaction, so the returned digits are a consistent
//! snapshot of the caller's own increment.

use async_trait::async_trait;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DbErr, EntityTrait, ExprTrait, QueryFilter, QueryOrder,
    TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use tracing::debug;

use super::SeaOrmStorage;
use super::retry::{self, RetryPolicy};
use crate::errors::{Result, ShardlinkError};
use crate::storage::{CounterStore, ShardCarry};

use migration::entities::counter_shard;

#[async_trait]
impl CounterStore for SeaOrmStorage {
    async fn init_counter(&self, name: &str) -> Result<()> {
        let db = &self.db;

        let inserted = retry::with_retry(&format!("init_counter({})", name), self.retry_config, || async {
            counter_shard::Entity::insert(counter_shard::ActiveModel {
                name: Set(name.to_string()),
                shard_index: Set(0),
                value: Set(0),
            })
            .on_conflict(
                OnConflict::columns([
                    counter_shard::Column::Name,
                    counter_shard::Column::ShardIndex,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await
        })
        .await
        .map_err(|e| ShardlinkError::internal(format!("init counter '{}' failed: {}", name, e)))?;

        if inserted > 0 {
            debug!("Counter '{}' created", name);
        }
        Ok(())
    }

    async fn increment_counter(&self, name: &str) -> Result<Vec<i64>> {
        let db = &self.db;

        // 只在连接获取失败时重试：其它错误无法确定自增是否已生效
        retry::with_retry_policy(
            &format!("increment_counter({})", name),
            self.retry_config,
            RetryPolicy::ConnectOnly,
            || async {
                let txn = db.begin().await?;

                let updated = counter_shard::Entity::update_many()
                    .col_expr(
                        counter_shard::Column::Value,
                        Expr::col(counter_shard::Column::Value).add(Expr::val(1i64)),
                    )
                    .filter(counter_shard::Column::Name.eq(name))
                    .filter(counter_shard::Column::ShardIndex.eq(0))
                    .exec(&txn)
                    .await?;
                if updated.rows_affected == 0 {
                    return Err(DbErr::RecordNotFound(format!(
                        "counter '{}' is not initialized",
                        name
                    )));
                }

                let shards = counter_shard::Entity::find()
                    .filter(counter_shard::Column::Name.eq(name))
                    .order_by_asc(counter_shard::Column::ShardIndex)
                    .all(&txn)
                    .await?;

                txn.commit().await?;
                Ok(shards.into_iter().map(|s| s.value).collect())
            },
        )
        .await
        .map_err(|e| {
            ShardlinkError::internal(format!("increment counter '{}' failed: {}", name, e))
        })
    }

    async fn apply_carries(&self, name: &str, carries: &[ShardCarry]) -> Result<bool> {
        if carries.is_empty() {
            return Ok(true);
        }
        let db = &self.db;

        retry::with_retry(&format!("apply_carries({})", name), self.retry_config, || async {
            let txn = db.begin().await?;

            for carry in carries {
                let index = carry.index as i32;

                let reduced = counter_shard::Entity::update_many()
                    .col_expr(
                        counter_shard::Column::Value,
                        Expr::col(counter_shard::Column::Value).sub(Expr::val(carry.observed)),
                    )
                    .filter(counter_shard::Column::Name.eq(name))
                    .filter(counter_shard::Column::ShardIndex.eq(index))
                    .filter(counter_shard::Column::Value.gte(carry.observed))
                    .exec(&txn)
                    .await?;
                if reduced.rows_affected == 0 {
                    // 已被其他调用方进位；事务随 drop 回滚
                    return Ok(false);
                }

                counter_shard::Entity::insert(counter_shard::ActiveModel {
                    name: Set(name.to_string()),
                    shard_index: Set(index + 1),
                    value: Set(1),
                })
                .on_conflict(
                    OnConflict::columns([
                        counter_shard::Column::Name,
                        counter_shard::Column::ShardIndex,
                    ])
                    .value(
                        counter_shard::Column::Value,
                        Expr::col((counter_shard::Entity, counter_shard::Column::Value))
                            .add(Expr::val(1i64)),
                    )
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
            }

            txn.commit().await?;
            Ok(true)
        })
        .await
        .map_err(|e| ShardlinkError::internal(format!("carry counter '{}' failed: {}", name, e)))
    }
}
