use actix_web::{
    HttpRequest,
    error::{InternalError, JsonPayloadError, QueryPayloadError},
    http::StatusCode,
};
use tracing::debug;

use crate::middlewares::create_error_response;
use crate::models::ErrorCode;

/// JSON 请求体解析失败时返回统一格式
pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!("Invalid JSON body for {}: {}", req.path(), err);
    let (status, message) = match &err {
        JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
            (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".to_string())
        }
        JsonPayloadError::ContentType => (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Content-Type must be application/json".to_string(),
        ),
        JsonPayloadError::Deserialize(e) => (StatusCode::BAD_REQUEST, format!("Invalid JSON: {e}")),
        other => (StatusCode::BAD_REQUEST, format!("Invalid request body: {other}")),
    };
    let response = create_error_response(status, ErrorCode::BadRequest, &message);
    InternalError::from_response(err, response).into()
}

/// 查询参数解析失败时返回统一格式
pub fn query_error_handler(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!("Invalid query for {}: {}", req.path(), err);
    let message = format!("Invalid query parameters: {err}");
    let response = create_error_response(StatusCode::BAD_REQUEST, ErrorCode::BadRequest, &message);
    InternalError::from_response(err, response).into()
}
