use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::warn;

use super::control::broadcast_error_code;
use super::direct;
use crate::errors::PortalError;
use crate::models::messaging::requests::{SendEmailRequest, SendWhatsAppRequest};
use crate::models::{ApiResponse, ErrorCode, portal_error_response};
use crate::services::integrations::get_integrations;

fn send_error(err: &PortalError) -> HttpResponse {
    warn!("Message sending failed: {}", err);
    let code = match err {
        PortalError::Validation(msg) if msg.starts_with("Invalid phone") => ErrorCode::InvalidPhone,
        other => broadcast_error_code(other),
    };
    portal_error_response(err, code)
}

pub async fn send_whatsapp(
    body: SendWhatsAppRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let integrations = get_integrations(request);

    match direct::send_whatsapp(&integrations, body).await {
        Ok(sent) => Ok(HttpResponse::Ok().json(ApiResponse::success(sent, "消息已发送"))),
        Err(e) => Ok(send_error(&e)),
    }
}

pub async fn send_email(body: SendEmailRequest, request: &HttpRequest) -> ActixResult<HttpResponse> {
    let integrations = get_integrations(request);

    match direct::send_email(&integrations, body).await {
        Ok(sent) => Ok(HttpResponse::Ok().json(ApiResponse::success(sent, "邮件已发送"))),
        Err(e) => Ok(send_error(&e)),
    }
}
