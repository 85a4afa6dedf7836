use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::errors::PortalError;
use crate::models::ErrorCode;

// 统一的API响应结构
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/api.ts")]
pub struct ApiResponse<T: TS> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T: TS> ApiResponse<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Success as i32,
            message: message.into(),
            data: Some(data),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error(code: ErrorCode, data: T, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: Some(data),
            timestamp: chrono::Utc::now(),
        }
    }
}

impl ApiResponse<()> {
    pub fn success_empty(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Success as i32,
            message: message.into(),
            data: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error_empty(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: None,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// 500 响应，错误细节只写日志
pub fn internal_error_response(message: impl Into<String>) -> HttpResponse {
    HttpResponse::InternalServerError().json(ApiResponse::error_empty(
        ErrorCode::InternalServerError,
        message,
    ))
}

/// 领域错误转为 HTTP 响应
///
/// 状态码由错误类型决定，`code` 为业务错误码；存储等内部错误统一返回 500。
pub fn portal_error_response(err: &PortalError, code: ErrorCode) -> HttpResponse {
    let body = |code: ErrorCode| ApiResponse::error_empty(code, err.message());
    match err {
        PortalError::Validation(_) => HttpResponse::BadRequest().json(body(code)),
        PortalError::NotFound(_) => HttpResponse::NotFound().json(body(code)),
        PortalError::Conflict(_) => HttpResponse::Conflict().json(body(code)),
        PortalError::Authentication(_) => HttpResponse::Unauthorized().json(body(code)),
        PortalError::Authorization(_) => HttpResponse::Forbidden().json(body(code)),
        PortalError::Configuration(_) => HttpResponse::ServiceUnavailable().json(body(code)),
        PortalError::ExternalService(_) => HttpResponse::BadGateway().json(body(code)),
        _ => {
            tracing::error!("{}", err);
            internal_error_response("Internal server error")
        }
    }
}

/// 边缘函数的响应信封
///
/// 业务失败同样以 HTTP 200 返回，由 `success` 区分。
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/functions.ts")]
pub struct FunctionResponse<T: TS> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: TS> FunctionResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_shape() {
        let body = serde_json::to_value(ApiResponse::success(5, "ok")).unwrap();
        assert_eq!(body["code"], 0);
        assert_eq!(body["data"], 5);
    }

    #[test]
    fn test_portal_error_status() {
        let resp = portal_error_response(
            &PortalError::conflict("email taken"),
            ErrorCode::StudentEmailAlreadyExists,
        );
        assert_eq!(resp.status(), actix_web::http::StatusCode::CONFLICT);

        let resp = portal_error_response(
            &PortalError::database_operation("disk full"),
            ErrorCode::StudentNotFound,
        );
        assert_eq!(resp.status(), actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_function_failure_omits_data() {
        let body = serde_json::to_value(FunctionResponse::<i32>::fail("boom")).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "boom");
        assert!(body.get("data").is_none());
    }
}
