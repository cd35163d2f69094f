use serde::{Deserialize, Serialize};

/// 静态配置（从 TOML + 环境变量加载，启动时使用）
///
/// - server: 重定向服务器地址、端口、CPU 数量
/// - database: 权威存储连接与重试
/// - redis: 复制解析存储连接
/// - links: 短码生成与字段校验限制
/// - clicks: 点击归因队列
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub clicks: ClicksConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config file > 默认值
    /// ENV 前缀：SL，分隔符：__
    /// 示例：SL__SERVER__PORT=9999
    pub fn load(path: Option<&str>) -> Self {
        use config::{Config, Environment, File};

        let path = path.unwrap_or("config.toml");

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖，前缀 SL，分隔符 __
            .add_source(
                Environment::with_prefix("SL")
                    .separator("__")
                    .try_parsing(true),
            );

        // 日志系统此时尚未初始化，只能直接输出到 stderr
        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// 权威存储连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 复制解析存储（Redis）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// 为空时使用进程内存储（仅适合单进程部署与测试）
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
}

/// 短链接生成与校验配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    /// 默认短链接域名，请求 Host 等于它时视为空 host
    #[serde(default = "default_domain")]
    pub default_domain: String,
    /// 前端站点地址，用于首页 / 未找到 / 已删除的跳转
    #[serde(default = "default_web_base_url")]
    pub web_base_url: String,
    #[serde(default = "default_code_min_length")]
    pub code_min_length: usize,
    #[serde(default = "default_custom_code_min_length")]
    pub custom_code_min_length: usize,
    #[serde(default = "default_custom_code_max_length")]
    pub custom_code_max_length: usize,
    #[serde(default = "default_note_max_length")]
    pub note_max_length: usize,
    #[serde(default = "default_query_value_max_length")]
    pub query_value_max_length: usize,
    #[serde(default = "default_tags_max_count")]
    pub tags_max_count: usize,
    #[serde(default = "default_tag_max_length")]
    pub tag_max_length: usize,
    /// 计数器分片进位阈值
    #[serde(default = "default_carry_threshold")]
    pub carry_threshold: i64,
}

/// 点击归因队列配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClicksConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "sqlite://shardlink.db?mode=rwc".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_redis_key_prefix() -> String {
    "shardlink:".to_string()
}

fn default_domain() -> String {
    "localhost:8080".to_string()
}

fn default_web_base_url() -> String {
    "http://localhost:3000/web".to_string()
}

fn default_code_min_length() -> usize {
    5
}

fn default_custom_code_min_length() -> usize {
    1
}

fn default_custom_code_max_length() -> usize {
    64
}

fn default_note_max_length() -> usize {
    100
}

fn default_query_value_max_length() -> usize {
    100
}

fn default_tags_max_count() -> usize {
    15
}

fn default_tag_max_length() -> usize {
    15
}

fn default_carry_threshold() -> i64 {
    crate::services::shard_counter::DEFAULT_CARRY_THRESHOLD
}

fn default_queue_capacity() -> usize {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_file() -> Option<String> {
    None
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_redis_key_prefix(),
        }
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            default_domain: default_domain(),
            web_base_url: default_web_base_url(),
            code_min_length: default_code_min_length(),
            custom_code_min_length: default_custom_code_min_length(),
            custom_code_max_length: default_custom_code_max_length(),
            note_max_length: default_note_max_length(),
            query_value_max_length: default_query_value_max_length(),
            tags_max_count: default_tags_max_count(),
            tag_max_length: default_tag_max_length(),
            carry_threshold: default_carry_threshold(),
        }
    }
}

impl Default for ClicksConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: default_log_file(),
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}
