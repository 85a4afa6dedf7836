//! 动态配置缓存
//!
//! 启动时从 `system_settings` 表加载，管理员修改后热更新。
//! 未加载或值无法解析时退回静态配置。

use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::RwLock;

use crate::config::AppConfig;
use crate::models::payments::entities::PaymentProvider;
use crate::models::system::entities::KnownSettingKey;

static DYNAMIC_CONFIG: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

pub struct DynamicConfig;

impl DynamicConfig {
    /// 用数据库中的配置整体替换缓存
    pub async fn init(settings: Vec<(String, String)>) {
        let cache = DYNAMIC_CONFIG.get_or_init(|| RwLock::new(HashMap::new()));

        let mut guard = cache.write().await;
        guard.clear();
        guard.extend(settings);

        tracing::info!("动态配置缓存初始化完成，加载了 {} 个配置项", guard.len());
    }

    pub async fn update(key: &str, value: &str) {
        if let Some(cache) = DYNAMIC_CONFIG.get() {
            cache
                .write()
                .await
                .insert(key.to_string(), value.to_string());
            tracing::debug!("动态配置更新: {}", key);
        }
    }

    async fn get_string(key: KnownSettingKey) -> Option<String> {
        let cache = DYNAMIC_CONFIG.get()?;
        cache.read().await.get(key.as_str()).cloned()
    }

    /// 空字符串视为未设置
    async fn get_non_empty(key: KnownSettingKey) -> Option<String> {
        Self::get_string(key)
            .await
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    async fn get_i64(key: KnownSettingKey) -> Option<i64> {
        Self::get_string(key).await.and_then(|v| v.trim().parse().ok())
    }

    async fn get_json_array(key: KnownSettingKey) -> Option<Vec<String>> {
        Self::get_string(key)
            .await
            .and_then(|v| serde_json::from_str(&v).ok())
    }

    pub async fn system_name() -> String {
        Self::get_non_empty(KnownSettingKey::SystemName)
            .await
            .unwrap_or_else(|| AppConfig::get().app.system_name.clone())
    }

    /// Access Token 有效期（分钟）
    pub async fn access_token_expiry() -> i64 {
        Self::get_i64(KnownSettingKey::AccessTokenExpiry)
            .await
            .unwrap_or_else(|| AppConfig::get().jwt.access_token_expiry)
    }

    /// Refresh Token 有效期（天）
    pub async fn refresh_token_expiry() -> i64 {
        Self::get_i64(KnownSettingKey::RefreshTokenExpiry)
            .await
            .unwrap_or_else(|| AppConfig::get().jwt.refresh_token_expiry)
    }

    pub async fn refresh_token_remember_me_expiry() -> i64 {
        Self::get_i64(KnownSettingKey::RefreshTokenRememberMeExpiry)
            .await
            .unwrap_or_else(|| AppConfig::get().jwt.refresh_token_remember_me_expiry)
    }

    /// 上传文件大小上限（字节）
    pub async fn upload_max_size() -> usize {
        Self::get_i64(KnownSettingKey::UploadMaxSize)
            .await
            .and_then(|v| usize::try_from(v).ok())
            .unwrap_or_else(|| AppConfig::get().upload.max_size)
    }

    pub async fn upload_allowed_types() -> Vec<String> {
        Self::get_json_array(KnownSettingKey::UploadAllowedTypes)
            .await
            .unwrap_or_else(|| AppConfig::get().upload.allowed_types.clone())
    }

    pub async fn cors_allowed_origins() -> Vec<String> {
        Self::get_json_array(KnownSettingKey::CorsAllowedOrigins)
            .await
            .unwrap_or_else(|| AppConfig::get().cors.allowed_origins.clone())
    }

    pub async fn cors_max_age() -> usize {
        Self::get_i64(KnownSettingKey::CorsMaxAge)
            .await
            .and_then(|v| usize::try_from(v).ok())
            .unwrap_or_else(|| AppConfig::get().cors.max_age)
    }

    /// 报名费（分），0 表示不收取
    pub async fn enrollment_fee_cents() -> i64 {
        Self::get_i64(KnownSettingKey::EnrollmentFeeCents)
            .await
            .unwrap_or(0)
            .max(0)
    }

    pub async fn default_payment_provider() -> PaymentProvider {
        let configured = match Self::get_non_empty(KnownSettingKey::DefaultPaymentProvider).await {
            Some(value) => value,
            None => AppConfig::get().payments.default_provider.clone(),
        };
        configured.parse().unwrap_or(PaymentProvider::Asaas)
    }

    /// 群发间隔（毫秒），保证 min <= max
    pub async fn broadcast_delays() -> (u64, u64) {
        let defaults = &AppConfig::get().messaging.broadcast;
        let min = Self::get_i64(KnownSettingKey::BroadcastMinDelayMs)
            .await
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(defaults.min_delay_ms);
        let max = Self::get_i64(KnownSettingKey::BroadcastMaxDelayMs)
            .await
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(defaults.max_delay_ms);
        (min, max.max(min))
    }

    /// 运行时设置的邮件 API Key，覆盖静态配置
    pub async fn email_api_key() -> Option<String> {
        Self::get_non_empty(KnownSettingKey::EmailApiKey).await
    }

    pub async fn email_from_address() -> Option<String> {
        Self::get_non_empty(KnownSettingKey::EmailFromAddress).await
    }
}
