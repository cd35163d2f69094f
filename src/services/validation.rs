//! 创建请求校验
//!
//! Everything here runs before any store mutation, so a rejected request
//! never leaves partial state behind.

use std::collections::BTreeMap;

use url::Url;

use crate::config::LinksConfig;
use crate::errors::{Result, ShardlinkError};
use crate::resolution::KEY_SEPARATOR;

/// 危险协议列表
const DANGEROUS_PROTOCOLS: &[&str] = &[
    "javascript:",
    "data:",
    "file:",
    "vbscript:",
    "about:",
    "blob:",
];

/// 目标地址必须是 http/https 绝对 URL
pub fn validate_destination(destination: &str) -> Result<()> {
    if destination.trim().is_empty() {
        return Err(ShardlinkError::invalid_argument("destination cannot be empty"));
    }
    if destination.trim() != destination {
        return Err(ShardlinkError::invalid_argument(
            "destination must not have leading or trailing whitespace",
        ));
    }

    let lower = destination.to_lowercase();
    if let Some(proto) = DANGEROUS_PROTOCOLS.iter().find(|p| lower.starts_with(**p)) {
        return Err(ShardlinkError::invalid_argument(format!(
            "dangerous protocol blocked: {}",
            proto
        )));
    }

    let url = Url::parse(destination).map_err(|e| {
        ShardlinkError::invalid_argument(format!("invalid destination URL: {}", e))
    })?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ShardlinkError::invalid_argument(format!(
                "invalid protocol: {}:. Only http:// and https:// are allowed",
                other
            )));
        }
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ShardlinkError::invalid_argument("destination URL has no host"));
    }
    Ok(())
}

/// 自定义短码：字母（含非拉丁文字）、数字、`-`、`_`
pub fn validate_custom_code(code: &str, limits: &LinksConfig) -> Result<()> {
    let len = code.chars().count();
    if len < limits.custom_code_min_length || len > limits.custom_code_max_length {
        return Err(ShardlinkError::invalid_argument(format!(
            "custom code must be {}..={} characters, got {}",
            limits.custom_code_min_length, limits.custom_code_max_length, len
        )));
    }
    if let Some(bad) = code
        .chars()
        .find(|c| !(c.is_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(ShardlinkError::invalid_argument(format!(
            "custom code contains disallowed character {:?}",
            bad
        )));
    }
    Ok(())
}

/// 自定义 host：空（默认域名）或 主机名[:端口]
pub fn validate_host(host: &str) -> Result<()> {
    if host.is_empty() {
        return Ok(());
    }
    if host.contains(KEY_SEPARATOR) {
        return Err(ShardlinkError::invalid_argument(format!(
            "host must not contain '{}'",
            KEY_SEPARATOR
        )));
    }
    if host.len() > 253 {
        return Err(ShardlinkError::invalid_argument("host is too long"));
    }

    let (name, port) = match host.rsplit_once(':') {
        Some((name, port)) => (name, Some(port)),
        None => (host, None),
    };
    if let Some(port) = port
        && port.parse::<u16>().is_err()
    {
        return Err(ShardlinkError::invalid_argument(format!(
            "invalid port in host '{}'",
            host
        )));
    }

    let label_ok = |label: &str| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    };
    if !name.split('.').all(label_ok) {
        return Err(ShardlinkError::invalid_argument(format!(
            "invalid host '{}'",
            host
        )));
    }
    Ok(())
}

pub fn validate_note(note: &str, limits: &LinksConfig) -> Result<()> {
    if note.len() > limits.note_max_length {
        return Err(ShardlinkError::invalid_argument(format!(
            "note exceeds {} bytes",
            limits.note_max_length
        )));
    }
    Ok(())
}

pub fn validate_query_params(params: &BTreeMap<String, String>, limits: &LinksConfig) -> Result<()> {
    for (key, value) in params {
        if key.is_empty() || key.len() > limits.query_value_max_length {
            return Err(ShardlinkError::invalid_argument(format!(
                "query parameter key must be 1..={} bytes",
                limits.query_value_max_length
            )));
        }
        if value.len() > limits.query_value_max_length {
            return Err(ShardlinkError::invalid_argument(format!(
                "query parameter '{}' exceeds {} bytes",
                key, limits.query_value_max_length
            )));
        }
    }
    Ok(())
}

pub fn validate_tags(tags: &[String], limits: &LinksConfig) -> Result<()> {
    if tags.len() > limits.tags_max_count {
        return Err(ShardlinkError::invalid_argument(format!(
            "at most {} tags are allowed",
            limits.tags_max_count
        )));
    }
    if let Some(tag) = tags
        .iter()
        .find(|t| t.is_empty() || t.len() > limits.tag_max_length)
    {
        return Err(ShardlinkError::invalid_argument(format!(
            "tag {:?} must be 1..={} bytes",
            tag, limits.tag_max_length
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> LinksConfig {
        LinksConfig::default()
    }

    #[test]
    fn test_valid_destinations() {
        assert!(validate_destination("http://example.com").is_ok());
        assert!(validate_destination("https://example.com/path?query=1").is_ok());
        assert!(validate_destination("http://localhost:8080").is_ok());
    }

    #[test]
    fn test_rejected_destinations() {
        for bad in [
            "",
            "   ",
            "javascript:alert(1)",
            "data:text/html,<b>x</b>",
            "file:///etc/passwd",
            "ftp://example.com",
            "example.com/no-scheme",
            "https://",
            " https://example.com",
        ] {
            let err = validate_destination(bad).unwrap_err();
            assert!(
                matches!(err, ShardlinkError::InvalidArgument(_)),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_custom_code_charset() {
        let limits = limits();
        assert!(validate_custom_code("abc", &limits).is_ok());
        assert!(validate_custom_code("my-link_2", &limits).is_ok());
        assert!(validate_custom_code("短網址", &limits).is_ok());
        assert!(validate_custom_code("ссылка", &limits).is_ok());

        assert!(validate_custom_code("", &limits).is_err());
        assert!(validate_custom_code("a$b", &limits).is_err());
        assert!(validate_custom_code("a/b", &limits).is_err());
        assert!(validate_custom_code("a b", &limits).is_err());
        assert!(validate_custom_code(&"x".repeat(65), &limits).is_err());
        assert!(validate_custom_code(&"x".repeat(64), &limits).is_ok());
    }

    #[test]
    fn test_host_rules() {
        assert!(validate_host("").is_ok());
        assert!(validate_host("go.example.com").is_ok());
        assert!(validate_host("localhost:8080").is_ok());

        assert!(validate_host("bad$host").is_err());
        assert!(validate_host("-bad.example.com").is_err());
        assert!(validate_host("a..b").is_err());
        assert!(validate_host("example.com:99999").is_err());
        assert!(validate_host("exa mple.com").is_err());
    }

    #[test]
    fn test_note_tags_and_params_limits() {
        let limits = limits();
        assert!(validate_note(&"n".repeat(100), &limits).is_ok());
        assert!(validate_note(&"n".repeat(101), &limits).is_err());

        let tags: Vec<String> = (0..15).map(|i| format!("t{i}")).collect();
        assert!(validate_tags(&tags, &limits).is_ok());
        let too_many: Vec<String> = (0..16).map(|i| format!("t{i}")).collect();
        assert!(validate_tags(&too_many, &limits).is_err());
        assert!(validate_tags(&["x".repeat(16)], &limits).is_err());
        assert!(validate_tags(&[String::new()], &limits).is_err());

        let mut params = BTreeMap::new();
        params.insert("a".to_string(), "v".repeat(100));
        assert!(validate_query_params(&params, &limits).is_ok());
        params.insert("b".to_string(), "v".repeat(101));
        assert!(validate_query_params(&params, &limits).is_err());

        let mut empty_key = BTreeMap::new();
        empty_key.insert(String::new(), "v".to_string());
        assert!(validate_query_params(&empty_key, &limits).is_err());
    }
}
