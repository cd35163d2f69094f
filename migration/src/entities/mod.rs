pub mod counter_shard;
pub mod link;
pub mod link_click_bucket;
pub mod setting;

pub use counter_shard::Entity as CounterShardEntity;
pub use link::Entity as LinkEntity;
pub use link_click_bucket::Entity as LinkClickBucketEntity;
pub use setting::Entity as SettingEntity;
