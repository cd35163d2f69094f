use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::{Result, ShardlinkError};

/// 链接类型（以整数形式持久化并写入解析记录）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum LinkType {
    Direct = 1,
}

impl LinkType {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for LinkType {
    type Error = ShardlinkError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            1 => Ok(LinkType::Direct),
            other => Err(ShardlinkError::internal(format!(
                "unknown link type: {}",
                other
            ))),
        }
    }
}

/// UTM 参数，转换后合并进 query params
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmInfo {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub medium: String,
    #[serde(default)]
    pub campaign: String,
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub content: String,
}

impl UtmInfo {
    /// 非空字段转换为 `utm_*` 参数
    pub fn to_query_params(&self) -> BTreeMap<String, String> {
        [
            ("utm_source", &self.source),
            ("utm_medium", &self.medium),
            ("utm_campaign", &self.campaign),
            ("utm_term", &self.term),
            ("utm_content", &self.content),
        ]
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
    }
}

/// 点击统计维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClickDimension {
    Country,
    Os,
    Device,
    Browser,
}

impl ClickDimension {
    pub fn as_str(self) -> &'static str {
        match self {
            ClickDimension::Country => "country",
            ClickDimension::Os => "os",
            ClickDimension::Device => "device",
            ClickDimension::Browser => "browser",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "country" => Some(ClickDimension::Country),
            "os" => Some(ClickDimension::Os),
            "device" => Some(ClickDimension::Device),
            "browser" => Some(ClickDimension::Browser),
            _ => None,
        }
    }
}

/// 一次点击归因得到的分桶键
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickAttribution {
    /// 为空表示国家未知，不计入国家维度
    pub country: String,
    pub os: &'static str,
    pub device: &'static str,
    pub browser: &'static str,
}

impl ClickAttribution {
    /// 需要 +1 的分桶列表
    pub fn buckets(&self) -> Vec<(ClickDimension, &str)> {
        let mut buckets = Vec::with_capacity(4);
        if !self.country.is_empty() {
            buckets.push((ClickDimension::Country, self.country.as_str()));
        }
        buckets.push((ClickDimension::Os, self.os));
        buckets.push((ClickDimension::Device, self.device));
        buckets.push((ClickDimension::Browser, self.browser));
        buckets
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickCounters {
    pub total: i64,
    #[serde(default)]
    pub by_country: BTreeMap<String, i64>,
    #[serde(default)]
    pub by_os: BTreeMap<String, i64>,
    #[serde(default)]
    pub by_device: BTreeMap<String, i64>,
    #[serde(default)]
    pub by_browser: BTreeMap<String, i64>,
}

impl ClickCounters {
    pub fn bucket_mut(&mut self, dimension: ClickDimension) -> &mut BTreeMap<String, i64> {
        match dimension {
            ClickDimension::Country => &mut self.by_country,
            ClickDimension::Os => &mut self.by_os,
            ClickDimension::Device => &mut self.by_device,
            ClickDimension::Browser => &mut self.by_browser,
        }
    }

    /// 在内存中应用一次归因（内存存储与测试使用）
    pub fn apply(&mut self, attribution: &ClickAttribution) {
        self.total += 1;
        for (dimension, key) in attribution.buckets() {
            *self.bucket_mut(dimension).entry(key.to_string()).or_insert(0) += 1;
        }
    }
}

/// 权威链接记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub id: String,
    pub link_type: LinkType,
    pub deleted: bool,
    pub code: String,
    /// 空字符串表示默认域名
    pub host: String,
    pub destination: String,
    pub is_custom: bool,
    pub query_params: BTreeMap<String, String>,
    pub creator: String,
    pub note: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub clicks: ClickCounters,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl LinkRecord {
    /// 合并 query params 后的完整目标地址
    ///
    /// Params override same-named pairs already present in the destination.
    /// All pairs are ordered by key; values of a repeated key keep their order.
    pub fn full_destination(&self) -> Result<String> {
        if self.query_params.is_empty() {
            return Ok(self.destination.clone());
        }

        let mut url = url::Url::parse(&self.destination).map_err(|e| {
            ShardlinkError::invalid_argument(format!(
                "destination is not a valid URL '{}': {}",
                self.destination, e
            ))
        })?;

        let mut merged: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (k, v) in url.query_pairs() {
            merged.entry(k.into_owned()).or_default().push(v.into_owned());
        }
        // 同名参数整体替换目标地址里已有的值，而不是追加在其后
        for (k, v) in &self.query_params {
            merged.insert(k.clone(), vec![v.clone()]);
        }

        url.query_pairs_mut()
            .clear()
            .extend_pairs(
                merged
                    .iter()
                    .flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v.as_str()))),
            );

        Ok(url.to_string())
    }
}
