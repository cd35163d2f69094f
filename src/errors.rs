use std::fmt;

/// 对外暴露的内部错误文本（不泄露细节）
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardlinkError {
    /// 参数非法：在任何存储写入之前被拒绝
    InvalidArgument(String),
    /// (code, host) 唯一约束冲突
    AlreadyExists(String),
    /// 按 ID 等显式查找未命中
    NotFound(String),
    /// 存储通信失败、数据损坏、跨存储不变式被破坏
    Internal(String),
}

impl ShardlinkError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ShardlinkError::InvalidArgument(_) => "E001",
            ShardlinkError::AlreadyExists(_) => "E002",
            ShardlinkError::NotFound(_) => "E003",
            ShardlinkError::Internal(_) => "E004",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            ShardlinkError::InvalidArgument(_) => "Invalid Argument",
            ShardlinkError::AlreadyExists(_) => "Already Exists",
            ShardlinkError::NotFound(_) => "Resource Not Found",
            ShardlinkError::Internal(_) => "Internal Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            ShardlinkError::InvalidArgument(msg)
            | ShardlinkError::AlreadyExists(msg)
            | ShardlinkError::NotFound(msg)
            | ShardlinkError::Internal(msg) => msg,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, ShardlinkError::Internal(_))
    }

    /// 转换为边界上可对外返回的形式
    ///
    /// Validation, uniqueness and not-found errors pass through untouched;
    /// internal details are replaced by a fixed opaque message. Callers are
    /// expected to have logged the original error already.
    pub fn public(&self) -> ShardlinkError {
        match self {
            ShardlinkError::Internal(_) => {
                ShardlinkError::Internal(INTERNAL_ERROR_MESSAGE.to_string())
            }
            other => other.clone(),
        }
    }

    /// 格式化为彩色输出（用于 Server 模式）
    #[cfg(feature = "server")]
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for ShardlinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ShardlinkError {}

// 便捷的构造函数
impl ShardlinkError {
    pub fn invalid_argument<T: Into<String>>(msg: T) -> Self {
        ShardlinkError::InvalidArgument(msg.into())
    }

    pub fn already_exists<T: Into<String>>(msg: T) -> Self {
        ShardlinkError::AlreadyExists(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ShardlinkError::NotFound(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        ShardlinkError::Internal(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for ShardlinkError {
    fn from(err: sea_orm::DbErr) -> Self {
        ShardlinkError::Internal(format!("database: {}", err))
    }
}

impl From<redis::RedisError> for ShardlinkError {
    fn from(err: redis::RedisError) -> Self {
        ShardlinkError::Internal(format!("redis: {}", err))
    }
}

impl From<serde_json::Error> for ShardlinkError {
    fn from(err: serde_json::Error) -> Self {
        ShardlinkError::Internal(format!("serialization: {}", err))
    }
}

impl From<std::io::Error> for ShardlinkError {
    fn from(err: std::io::Error) -> Self {
        ShardlinkError::Internal(format!("io: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, ShardlinkError>;
