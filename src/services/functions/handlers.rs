use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use serde::de::DeserializeOwned;
use tracing::warn;
use ts_rs::TS;

use super::FunctionService;
use crate::config::AppConfig;
use crate::errors::{PortalError, Result};
use crate::models::FunctionResponse;
use crate::models::functions::{
    ApproveStudentFunctionRequest, CreatePaymentRequest, SendEmailRequest, SendWhatsAppRequest,
};
use crate::models::payments::responses::PaymentResponse;
use crate::models::students::requests::ApprovalAction;
use crate::services::integrations::get_integrations;
use crate::services::messaging::direct;
use crate::services::payments::charge::create_charge_for_student;
use crate::services::payments::webhook::{ASAAS_TOKEN_HEADER, process_asaas_webhook};
use crate::services::students::approval::{approve_student as approve, reject_student};

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| PortalError::validation(format!("Invalid request body: {e}")))
}

/// 业务结果统一包进信封，HTTP 状态固定为 200
fn envelope<T: serde::Serialize + TS>(name: &str, result: Result<T>) -> HttpResponse {
    match result {
        Ok(data) => HttpResponse::Ok().json(FunctionResponse::ok(data)),
        Err(e) => {
            warn!("Function {} failed: {}", name, e);
            HttpResponse::Ok().json(FunctionResponse::<()>::fail(e.message()))
        }
    }
}

pub async fn send_whatsapp(body: &[u8], request: &HttpRequest) -> ActixResult<HttpResponse> {
    let integrations = get_integrations(request);
    let result = match parse_body::<SendWhatsAppRequest>(body) {
        Ok(req) => direct::send_whatsapp(&integrations, req).await,
        Err(e) => Err(e),
    };
    Ok(envelope("send-whatsapp", result))
}

pub async fn send_email(body: &[u8], request: &HttpRequest) -> ActixResult<HttpResponse> {
    let integrations = get_integrations(request);
    let result = match parse_body::<SendEmailRequest>(body) {
        Ok(req) => direct::send_email(&integrations, req).await,
        Err(e) => Err(e),
    };
    Ok(envelope("send-email", result))
}

pub async fn approve_student(
    service: &FunctionService,
    body: &[u8],
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let integrations = get_integrations(request);

    let result = match parse_body::<ApproveStudentFunctionRequest>(body) {
        Ok(req) => match req.action {
            ApprovalAction::Approve => approve(&storage, &integrations, req.student_id).await,
            ApprovalAction::Reject => reject_student(&storage, req.student_id, req.reason).await,
        },
        Err(e) => Err(e),
    };
    Ok(envelope("approve-student", result))
}

pub async fn create_payment(
    service: &FunctionService,
    body: &[u8],
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let integrations = get_integrations(request);

    let result = match parse_body::<CreatePaymentRequest>(body) {
        Ok(req) => create_charge_for_student(&storage, &integrations, req)
            .await
            .map(|payment| PaymentResponse { payment }),
        Err(e) => Err(e),
    };
    Ok(envelope("create-payment", result))
}

/// 令牌错误返回 401，其余结果按信封返回 200
pub async fn asaas_webhook(
    service: &FunctionService,
    body: &[u8],
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let integrations = get_integrations(request);
    let token = request
        .headers()
        .get(ASAAS_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    let result = process_asaas_webhook(
        &storage,
        &integrations,
        &AppConfig::get().payments.asaas.webhook_token,
        token,
        body,
    )
    .await;

    if let Err(PortalError::Authentication(msg)) = &result {
        warn!("Function asaas-webhook rejected: {}", msg);
        return Ok(HttpResponse::Unauthorized().json(FunctionResponse::<()>::fail(msg.as_str())));
    }
    Ok(envelope("asaas-webhook", result))
}
