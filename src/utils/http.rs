//! 第三方 HTTP 接口的公共工具

use std::time::Duration;

use crate::errors::{PortalError, Result};

/// 构建共享的 HTTP 客户端
pub fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| PortalError::configuration(format!("Failed to build HTTP client: {e}")))
}

/// 非 2xx 响应转为外部服务错误，附带截断后的响应体
pub async fn ensure_success(service: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PortalError::external_service(format!(
        "{service} returned {status}: {}",
        body.chars().take(500).collect::<String>()
    )))
}

/// 拼接基础地址与路径，容忍多余的斜杠
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://a.com/api/", "/v3/payments"), "https://a.com/api/v3/payments");
        assert_eq!(join_url("http://127.0.0.1:80", "emails"), "http://127.0.0.1:80/emails");
    }

    #[tokio::test]
    async fn test_ensure_success_reports_body() {
        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/fail");
                then.status(400).body("invalid customer");
            })
            .await;

        let response = reqwest::get(join_url(&server.base_url(), "/fail")).await.unwrap();
        let err = ensure_success("Asaas", response).await.unwrap_err();
        assert!(err.is_external());
        assert!(err.message().contains("400"));
        assert!(err.message().contains("invalid customer"));
    }
}
