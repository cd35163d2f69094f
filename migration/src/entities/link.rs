use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub link_type: i32,
    pub deleted: bool,
    pub code: String,
    pub host: String,
    #[sea_orm(column_type = "Text")]
    pub destination: String,
    pub is_custom: bool,
    /// JSON object `{ key: value }`
    #[sea_orm(column_type = "Text")]
    pub query_params: String,
    pub creator: String,
    #[sea_orm(column_type = "Text")]
    pub note: String,
    /// JSON array of tags
    #[sea_orm(column_type = "Text")]
    pub tags: String,
    pub total_clicks: i64,
    pub created_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
