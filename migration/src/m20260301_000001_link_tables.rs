use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 links 表（权威链接记录）
        manager
            .create_table(
                Table::create()
                    .table(Links::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Links::Id).string().not_null().primary_key())
                    .col(
                        ColumnDef::new(Links::LinkType)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Links::Deleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Links::Code).string().not_null())
                    .col(ColumnDef::new(Links::Host).string().not_null().default(""))
                    .col(ColumnDef::new(Links::Destination).text().not_null())
                    .col(
                        ColumnDef::new(Links::IsCustom)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Links::QueryParams).text().not_null())
                    .col(ColumnDef::new(Links::Creator).string().not_null())
                    .col(ColumnDef::new(Links::Note).text().not_null())
                    .col(ColumnDef::new(Links::Tags).text().not_null())
                    .col(
                        ColumnDef::new(Links::TotalClicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Links::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Links::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // (code, host) 唯一约束，生成码与自定义码共用
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uniq_links_code_host")
                    .table(Links::Table)
                    .col(Links::Code)
                    .col(Links::Host)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_links_creator")
                    .table(Links::Table)
                    .col(Links::Creator)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_links_deleted")
                    .table(Links::Table)
                    .col(Links::Deleted)
                    .to_owned(),
            )
            .await?;

        // 点击分桶：每个 (link, 维度, key) 一行
        manager
            .create_table(
                Table::create()
                    .table(LinkClickBuckets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(LinkClickBuckets::LinkId).string().not_null())
                    .col(
                        ColumnDef::new(LinkClickBuckets::Dimension)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LinkClickBuckets::Bucket).string().not_null())
                    .col(
                        ColumnDef::new(LinkClickBuckets::Clicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(LinkClickBuckets::LinkId)
                            .col(LinkClickBuckets::Dimension)
                            .col(LinkClickBuckets::Bucket),
                    )
                    .to_owned(),
            )
            .await?;

        // 计数器分片（CounterDocument.digits）
        manager
            .create_table(
                Table::create()
                    .table(CounterShards::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CounterShards::Name).string().not_null())
                    .col(
                        ColumnDef::new(CounterShards::ShardIndex)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CounterShards::Value)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(CounterShards::Name)
                            .col(CounterShards::ShardIndex),
                    )
                    .to_owned(),
            )
            .await?;

        // 一次性生成的设置项（salt、数据格式版本）
        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settings::Name)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Settings::Value).text().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Settings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CounterShards::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LinkClickBuckets::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_links_deleted").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_links_creator").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_links_code_host").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Links::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Links {
    Table,
    Id,
    LinkType,
    Deleted,
    Code,
    Host,
    Destination,
    IsCustom,
    QueryParams,
    Creator,
    Note,
    Tags,
    TotalClicks,
    CreatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum LinkClickBuckets {
    Table,
    LinkId,
    Dimension,
    Bucket,
    Clicks,
}

#[derive(DeriveIden)]
enum CounterShards {
    Table,
    Name,
    ShardIndex,
    Value,
}

#[derive(DeriveIden)]
enum Settings {
    Table,
    Name,
    Value,
}
