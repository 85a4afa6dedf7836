use serde::{Deserialize, Serialize};
use ts_rs::TS;

crate::string_enum! {
    /// 配置值类型
    pub enum SettingValueType export "../frontend/src/types/generated/system.ts" {
        String => "string",
        Integer => "integer",
        Boolean => "boolean",
        JsonArray => "json_array",
    }
}

impl SettingValueType {
    /// 校验字符串形式的值是否符合类型
    pub fn validate(&self, value: &str) -> Result<(), String> {
        match self {
            SettingValueType::String => Ok(()),
            SettingValueType::Integer => value
                .trim()
                .parse::<i64>()
                .map(|_| ())
                .map_err(|_| format!("'{value}' is not an integer")),
            SettingValueType::Boolean => match value {
                "true" | "false" => Ok(()),
                _ => Err(format!("'{value}' is not a boolean (true/false)")),
            },
            SettingValueType::JsonArray => serde_json::from_str::<Vec<String>>(value)
                .map(|_| ())
                .map_err(|e| format!("not a JSON array of strings: {e}")),
        }
    }
}

macro_rules! known_setting_keys {
    ($( $variant:ident => ($key:literal, $ty:ident) ),+ $(,)?) => {
        /// 可在运行时修改的配置键
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum KnownSettingKey {
            $( $variant, )+
        }

        impl KnownSettingKey {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( KnownSettingKey::$variant => $key, )+
                }
            }

            pub fn value_type(&self) -> SettingValueType {
                match self {
                    $( KnownSettingKey::$variant => SettingValueType::$ty, )+
                }
            }

            pub fn all() -> &'static [KnownSettingKey] {
                &[$( KnownSettingKey::$variant, )+]
            }
        }

        impl std::str::FromStr for KnownSettingKey {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $key => Ok(KnownSettingKey::$variant), )+
                    _ => Err(format!("Unknown setting key: {s}")),
                }
            }
        }
    };
}

known_setting_keys! {
    SystemName => ("app.system_name", String),
    AccessTokenExpiry => ("jwt.access_token_expiry", Integer),
    RefreshTokenExpiry => ("jwt.refresh_token_expiry", Integer),
    RefreshTokenRememberMeExpiry => ("jwt.refresh_token_remember_me_expiry", Integer),
    UploadMaxSize => ("upload.max_size", Integer),
    UploadAllowedTypes => ("upload.allowed_types", JsonArray),
    CorsAllowedOrigins => ("cors.allowed_origins", JsonArray),
    CorsMaxAge => ("cors.max_age", Integer),
    EnrollmentFeeCents => ("school.enrollment_fee_cents", Integer),
    DefaultPaymentProvider => ("school.default_payment_provider", String),
    BroadcastMinDelayMs => ("messaging.broadcast_min_delay_ms", Integer),
    BroadcastMaxDelayMs => ("messaging.broadcast_max_delay_ms", Integer),
    EmailFromAddress => ("email.from_address", String),
    EmailApiKey => ("email.api_key", String),
}

impl KnownSettingKey {
    /// 管理接口中隐藏真实值
    pub fn is_secret(&self) -> bool {
        matches!(self, KnownSettingKey::EmailApiKey)
    }
}

/// 系统设置实体
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/system.ts")]
pub struct SystemSetting {
    pub key: String,
    pub value: String,
    pub value_type: SettingValueType,
    pub description: Option<String>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub updated_by: Option<i64>,
}

impl SystemSetting {
    /// 敏感配置只返回是否已设置
    pub fn masked(mut self) -> Self {
        let secret = self
            .key
            .parse::<KnownSettingKey>()
            .map(|k| k.is_secret())
            .unwrap_or(false);
        if secret && !self.value.is_empty() {
            self.value = "********".to_string();
        }
        self
    }
}

/// 设置审计日志实体
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/system.ts")]
pub struct SettingAudit {
    pub id: i64,
    pub setting_key: String,
    pub old_value: Option<String>,
    pub new_value: String,
    pub changed_by: i64,
    pub changed_at: chrono::DateTime<chrono::Utc>,
    pub ip_address: Option<String>,
}
