use serde::{Deserialize, Serialize};

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub argon2: Argon2Config,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub cors: CorsConfig,
    pub upload: UploadConfig,
    pub payments: PaymentsConfig,
    pub messaging: MessagingConfig,
}

/// 应用设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub system_name: String,
    pub environment: String,
    pub log_level: String,
    /// 对外访问地址，用于邮件中的链接和支付回调
    pub public_url: String,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub unix_socket_path: String,
    pub workers: usize,
    pub max_workers: usize,
    pub timeouts: TimeoutConfig,
    pub limits: LimitConfig,
}

/// 超时配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub client_request: u64,
    pub client_disconnect: u64,
    pub keep_alive: u64,
}

/// 限制配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitConfig {
    pub max_payload_size: usize,
}

/// JWT 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    #[serde(skip_serializing, default)]
    pub secret: String,
    pub access_token_expiry: i64,
    pub refresh_token_expiry: i64,
    pub refresh_token_remember_me_expiry: i64,
}

/// Argon2 密码哈希参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Argon2Config {
    pub memory_cost: u32, // KiB
    pub time_cost: u32,
    pub parallelism: u32,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,    // 数据库连接 URL（从 scheme 自动推断类型）
    pub pool_size: u32, // 连接池大小
    pub timeout: u64,   // 连接超时 (秒)
}

/// 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(rename = "type")]
    pub cache_type: String,
    pub default_ttl: u64,
    pub redis: RedisConfig,
    pub memory: MemoryConfig,
}

/// Redis 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub key_prefix: String,
    pub pool_size: u64,
}

/// 内存缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub max_capacity: u64,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub max_age: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub dir: String,                // 上传目录
    pub max_size: usize,            // 单文件最大字节数
    pub allowed_types: Vec<String>, // 允许的扩展名
}

/// 支付网关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    /// 默认渠道：asaas / mercado_pago
    pub default_provider: String,
    /// 调用网关的超时（秒）
    pub request_timeout: u64,
    pub asaas: AsaasConfig,
    pub mercado_pago: MercadoPagoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsaasConfig {
    pub base_url: String,
    #[serde(skip_serializing, default)]
    pub api_key: String,
    /// Webhook 请求头 asaas-access-token 的期望值
    #[serde(skip_serializing, default)]
    pub webhook_token: String,
    pub default_billing_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MercadoPagoConfig {
    pub base_url: String,
    #[serde(skip_serializing, default)]
    pub access_token: String,
    /// Webhook 查询参数 secret 的期望值
    #[serde(skip_serializing, default)]
    pub webhook_secret: String,
}

/// 消息通道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    pub request_timeout: u64,
    pub zapi: ZapiConfig,
    pub resend: ResendConfig,
    pub broadcast: BroadcastConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZapiConfig {
    pub base_url: String,
    #[serde(default)]
    pub instance_id: String,
    #[serde(skip_serializing, default)]
    pub token: String,
    #[serde(skip_serializing, default)]
    pub client_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendConfig {
    pub base_url: String,
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub from_address: String,
}

/// 群发默认间隔，可被动态配置覆盖
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl AsaasConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl MercadoPagoConfig {
    pub fn is_configured(&self) -> bool {
        !self.access_token.is_empty()
    }
}

impl ZapiConfig {
    pub fn is_configured(&self) -> bool {
        !self.instance_id.is_empty() && !self.token.is_empty()
    }
}
