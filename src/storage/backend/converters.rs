use std::collections::BTreeMap;

use crate::errors::{Result, ShardlinkError};
use crate::storage::{ClickCounters, ClickDimension, LinkRecord, LinkType};
use migration::entities::{link, link_click_bucket};

/// 将 Sea-ORM Model（及其点击分桶）转换为 LinkRecord
pub fn model_to_link(
    model: link::Model,
    buckets: Vec<link_click_bucket::Model>,
) -> Result<LinkRecord> {
    let query_params: BTreeMap<String, String> = serde_json::from_str(&model.query_params)
        .map_err(|e| {
            ShardlinkError::internal(format!(
                "corrupt query_params for link {}: {}",
                model.id, e
            ))
        })?;
    let tags: Vec<String> = serde_json::from_str(&model.tags).map_err(|e| {
        ShardlinkError::internal(format!("corrupt tags for link {}: {}", model.id, e))
    })?;

    let mut clicks = ClickCounters {
        total: model.total_clicks,
        ..Default::default()
    };
    for bucket in buckets {
        if let Some(dimension) = ClickDimension::parse(&bucket.dimension) {
            clicks
                .bucket_mut(dimension)
                .insert(bucket.bucket, bucket.clicks);
        }
    }

    Ok(LinkRecord {
        id: model.id,
        link_type: LinkType::try_from(model.link_type)?,
        deleted: model.deleted,
        code: model.code,
        host: model.host,
        destination: model.destination,
        is_custom: model.is_custom,
        query_params,
        creator: model.creator,
        note: model.note,
        tags,
        clicks,
        created_at: model.created_at,
        deleted_at: model.deleted_at,
    })
}

/// 将 LinkRecord 转换为插入用的 ActiveModel
///
/// Click buckets are not part of the row; `total_clicks` is taken as is.
pub fn link_to_active_model(link: &LinkRecord) -> Result<link::ActiveModel> {
    use sea_orm::ActiveValue::Set;

    Ok(link::ActiveModel {
        id: Set(link.id.clone()),
        link_type: Set(link.link_type.as_i32()),
        deleted: Set(link.deleted),
        code: Set(link.code.clone()),
        host: Set(link.host.clone()),
        destination: Set(link.destination.clone()),
        is_custom: Set(link.is_custom),
        query_params: Set(serde_json::to_string(&link.query_params)?),
        creator: Set(link.creator.clone()),
        note: Set(link.note.clone()),
        tags: Set(serde_json::to_string(&link.tags)?),
        total_clicks: Set(link.clicks.total),
        created_at: Set(link.created_at),
        deleted_at: Set(link.deleted_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::ActiveValue;

    fn create_test_model() -> link::Model {
        link::Model {
            id: "9b2f".to_string(),
            link_type: 1,
            deleted: false,
            code: "abc123".to_string(),
            host: String::new(),
            destination: "https://example.com".to_string(),
            is_custom: false,
            query_params: r#"{"a":"1"}"#.to_string(),
            creator: "alice".to_string(),
            note: "launch".to_string(),
            tags: r#"["promo"]"#.to_string(),
            total_clicks: 3,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn bucket(dimension: &str, key: &str, clicks: i64) -> link_click_bucket::Model {
        link_click_bucket::Model {
            link_id: "9b2f".to_string(),
            dimension: dimension.to_string(),
            bucket: key.to_string(),
            clicks,
        }
    }

    #[test]
    fn test_model_to_link_with_buckets() {
        let link = model_to_link(
            create_test_model(),
            vec![bucket("country", "TW", 2), bucket("os", "windows", 3)],
        )
        .unwrap();

        assert_eq!(link.code, "abc123");
        assert_eq!(link.query_params["a"], "1");
        assert_eq!(link.tags, vec!["promo".to_string()]);
        assert_eq!(link.clicks.total, 3);
        assert_eq!(link.clicks.by_country["TW"], 2);
        assert_eq!(link.clicks.by_os["windows"], 3);
    }

    #[test]
    fn test_model_to_link_rejects_unknown_link_type() {
        let mut model = create_test_model();
        model.link_type = 42;
        assert!(model_to_link(model, Vec::new()).is_err());
    }

    #[test]
    fn test_model_to_link_rejects_corrupt_tags() {
        let mut model = create_test_model();
        model.tags = "not json".to_string();
        let err = model_to_link(model, Vec::new()).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_link_to_active_model_serializes_json_columns() {
        let link = model_to_link(create_test_model(), Vec::new()).unwrap();
        let active_model = link_to_active_model(&link).unwrap();

        if let ActiveValue::Set(params) = active_model.query_params {
            assert_eq!(params, r#"{"a":"1"}"#);
        } else {
            panic!("query_params should be set");
        }
        assert!(matches!(active_model.deleted_at, ActiveValue::Set(None)));
    }
}
