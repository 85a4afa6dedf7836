//! WhatsApp 发送（Z-API）

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ZapiConfig;
use crate::errors::Result;
use crate::utils::http::{ensure_success, join_url};

#[derive(Debug, Clone, PartialEq)]
pub struct WhatsAppReceipt {
    pub message_id: Option<String>,
}

#[async_trait]
pub trait WhatsAppSender: Send + Sync {
    /// `phone` 须已规范化（国家码 + 号码，纯数字）
    async fn send_text(&self, phone: &str, message: &str) -> Result<WhatsAppReceipt>;
}

pub struct ZApiClient {
    client: reqwest::Client,
    endpoint: String,
    client_token: String,
}

#[derive(Serialize)]
struct SendTextBody<'a> {
    phone: &'a str,
    message: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendTextResult {
    message_id: Option<String>,
    id: Option<String>,
}

impl ZApiClient {
    pub fn new(client: reqwest::Client, config: &ZapiConfig) -> Self {
        let endpoint = join_url(
            &config.base_url,
            &format!(
                "/instances/{}/token/{}/send-text",
                config.instance_id, config.token
            ),
        );
        Self {
            client,
            endpoint,
            client_token: config.client_token.clone(),
        }
    }
}

#[async_trait]
impl WhatsAppSender for ZApiClient {
    async fn send_text(&self, phone: &str, message: &str) -> Result<WhatsAppReceipt> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&SendTextBody { phone, message });
        if !self.client_token.is_empty() {
            request = request.header("Client-Token", &self.client_token);
        }

        let response = ensure_success("Z-API", request.send().await?).await?;
        let result: SendTextResult = response.json().await?;

        Ok(WhatsAppReceipt {
            message_id: result.message_id.or(result.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(base_url: String) -> ZApiClient {
        ZApiClient::new(
            reqwest::Client::new(),
            &ZapiConfig {
                base_url,
                instance_id: "INST".to_string(),
                token: "TOK".to_string(),
                client_token: "CT".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_send_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/instances/INST/token/TOK/send-text")
                    .header("Client-Token", "CT")
                    .json_body(json!({ "phone": "5511988887777", "message": "Olá" }));
                then.status(200).json_body(json!({
                    "zaapId": "z1",
                    "messageId": "m1",
                    "id": "m1"
                }));
            })
            .await;

        let receipt = client(server.base_url())
            .send_text("5511988887777", "Olá")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(receipt.message_id.as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn test_send_text_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/instances/INST/token/TOK/send-text");
                then.status(500).body("instance disconnected");
            })
            .await;

        let err = client(server.base_url())
            .send_text("5511988887777", "Olá")
            .await
            .unwrap_err();
        assert!(err.is_external());
        assert!(err.message().contains("instance disconnected"));
    }
}
