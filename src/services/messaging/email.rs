//! 邮件发送（Resend）
//!
//! API Key 与发件地址优先取动态配置 `email.api_key` / `email.from_address`，
//! 为空时退回静态配置。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ResendConfig;
use crate::errors::{PortalError, Result};
use crate::services::system::DynamicConfig;
use crate::utils::http::{ensure_success, join_url};

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// 返回服务商的邮件 ID
    async fn send(&self, email: &OutgoingEmail) -> Result<String>;
}

pub struct ResendClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    from_address: String,
}

#[derive(Serialize)]
struct ResendBody<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
}

#[derive(Deserialize)]
struct ResendResult {
    id: String,
}

impl ResendClient {
    pub fn new(client: reqwest::Client, config: &ResendConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            from_address: config.from_address.clone(),
        }
    }

    async fn credentials(&self) -> Result<(String, String)> {
        let api_key = DynamicConfig::email_api_key()
            .await
            .unwrap_or_else(|| self.api_key.clone());
        if api_key.is_empty() {
            return Err(PortalError::configuration(
                "Email API key is not configured (email.api_key / RESEND_API_KEY)",
            ));
        }
        let from = DynamicConfig::email_from_address()
            .await
            .unwrap_or_else(|| self.from_address.clone());
        Ok((api_key, from))
    }
}

#[async_trait]
impl EmailSender for ResendClient {
    async fn send(&self, email: &OutgoingEmail) -> Result<String> {
        if email.to.is_empty() {
            return Err(PortalError::validation("Email has no recipients"));
        }
        let (api_key, from) = self.credentials().await?;

        let response = self
            .client
            .post(join_url(&self.base_url, "/emails"))
            .bearer_auth(api_key)
            .json(&ResendBody {
                from: &from,
                to: &email.to,
                subject: &email.subject,
                html: &email.html,
            })
            .send()
            .await?;
        let result: ResendResult = ensure_success("Resend", response).await?.json().await?;
        Ok(result.id)
    }
}
