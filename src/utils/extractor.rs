//! 路径参数提取器
//!
//! actix 的 `web::Path<i64>` 在解析失败时返回纯文本 404，这里统一改成
//! `ApiResponse` 格式的 400。

use actix_web::{FromRequest, HttpRequest, dev::Payload, error::InternalError, http::StatusCode};
use std::future::{Ready, ready};

use crate::middlewares::create_error_response;
use crate::models::ErrorCode;

fn bad_param(name: &str, raw: &str) -> actix_web::Error {
    InternalError::from_response(
        format!("invalid path parameter {name}"),
        create_error_response(
            StatusCode::BAD_REQUEST,
            ErrorCode::BadRequest,
            &format!("Invalid path parameter '{name}': {raw}"),
        ),
    )
    .into()
}

/// 从路径中读取正整数 ID
pub fn parse_positive_id(req: &HttpRequest, name: &str) -> Result<i64, actix_web::Error> {
    let raw = req.match_info().get(name).unwrap_or_default();
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(bad_param(name, raw)),
    }
}

/// 定义一个读取指定路径参数的 i64 提取器
#[macro_export]
macro_rules! define_safe_i64_extractor {
    ($name:ident, $param:literal) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name(pub i64);

        impl actix_web::FromRequest for $name {
            type Error = actix_web::Error;
            type Future = std::future::Ready<Result<Self, Self::Error>>;

            fn from_request(
                req: &actix_web::HttpRequest,
                _: &mut actix_web::dev::Payload,
            ) -> Self::Future {
                std::future::ready($crate::utils::extractor::parse_positive_id(req, $param).map($name))
            }
        }
    };
}

define_safe_i64_extractor!(SafeIDI64, "id");

/// 文件下载令牌（UUID 格式）
#[derive(Debug, Clone)]
pub struct SafeFileToken(pub String);

impl FromRequest for SafeFileToken {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let raw = req.match_info().get("token").unwrap_or_default();
        let result = uuid::Uuid::parse_str(raw)
            .map(|_| SafeFileToken(raw.to_string()))
            .map_err(|_| bad_param("token", raw));
        ready(result)
    }
}

/// 配置键：小写字母、数字、点和下划线
#[derive(Debug, Clone)]
pub struct SafeSettingKey(pub String);

impl FromRequest for SafeSettingKey {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let raw = req.match_info().get("key").unwrap_or_default();
        let valid = !raw.is_empty()
            && raw.len() <= 64
            && raw
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '_');
        ready(if valid {
            Ok(SafeSettingKey(raw.to_string()))
        } else {
            Err(bad_param("key", raw))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn test_safe_id_accepts_positive() {
        let req = TestRequest::default().param("id", "42").to_http_request();
        let id = SafeIDI64::extract(&req).await.unwrap();
        assert_eq!(id.0, 42);
    }

    #[actix_web::test]
    async fn test_safe_id_rejects_invalid() {
        for raw in ["0", "-3", "abc", ""] {
            let req = TestRequest::default().param("id", raw).to_http_request();
            assert!(SafeIDI64::extract(&req).await.is_err(), "{raw}");
        }
    }

    #[actix_web::test]
    async fn test_setting_key() {
        let req = TestRequest::default()
            .param("key", "school.enrollment_fee_cents")
            .to_http_request();
        assert!(SafeSettingKey::extract(&req).await.is_ok());

        let req = TestRequest::default()
            .param("key", "../etc")
            .to_http_request();
        assert!(SafeSettingKey::extract(&req).await.is_err());
    }

    #[actix_web::test]
    async fn test_file_token() {
        let token = uuid::Uuid::new_v4().to_string();
        let req = TestRequest::default().param("token", token.clone()).to_http_request();
        assert_eq!(SafeFileToken::extract(&req).await.unwrap().0, token);

        let req = TestRequest::default().param("token", "x").to_http_request();
        assert!(SafeFileToken::extract(&req).await.is_err());
    }
}
