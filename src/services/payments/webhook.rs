//! 支付回调入口
//!
//! Asaas 通过 `asaas-access-token` 头认证，Mercado Pago 通过回调地址中的
//! `secret` 参数认证。找不到对应收款时同样返回 200，避免网关无限重试。

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::{error, warn};

use super::settlement::{asaas_event, mercado_pago_event, settle, verify_shared_secret};
use super::{PaymentService, payment_error_code};
use crate::config::AppConfig;
use crate::errors::{PortalError, Result};
use crate::models::payments::entities::PaymentProvider;
use crate::models::payments::requests::{
    AsaasWebhookPayload, MercadoPagoWebhookPayload, MercadoPagoWebhookQuery,
};
use crate::models::payments::responses::SettlementOutcome;
use crate::models::{ApiResponse, portal_error_response};
use crate::services::integrations::{Integrations, get_integrations};
use crate::storage::Storage;

pub const ASAAS_TOKEN_HEADER: &str = "asaas-access-token";

pub async fn process_asaas_webhook(
    storage: &Arc<dyn Storage>,
    integrations: &Integrations,
    expected_token: &str,
    provided_token: Option<&str>,
    body: &[u8],
) -> Result<SettlementOutcome> {
    if !verify_shared_secret(expected_token, provided_token) {
        return Err(PortalError::authentication("Invalid Asaas webhook token"));
    }
    let payload: AsaasWebhookPayload = serde_json::from_slice(body)
        .map_err(|e| PortalError::validation(format!("Invalid Asaas payload: {e}")))?;

    match asaas_event(&payload) {
        Some(event) => settle(storage, integrations, event).await,
        None => Ok(SettlementOutcome::Ignored),
    }
}

pub async fn process_mercado_pago_webhook(
    storage: &Arc<dyn Storage>,
    integrations: &Integrations,
    expected_secret: &str,
    provided_secret: Option<&str>,
    body: &[u8],
) -> Result<SettlementOutcome> {
    if !verify_shared_secret(expected_secret, provided_secret) {
        return Err(PortalError::authentication("Invalid Mercado Pago webhook secret"));
    }
    let payload: MercadoPagoWebhookPayload = serde_json::from_slice(body)
        .map_err(|e| PortalError::validation(format!("Invalid Mercado Pago payload: {e}")))?;

    let gateway = integrations.gateway(PaymentProvider::MercadoPago)?;
    match mercado_pago_event(&payload, gateway.as_ref()).await? {
        Some(event) => settle(storage, integrations, event).await,
        None => Ok(SettlementOutcome::Ignored),
    }
}

fn webhook_response(provider: &str, result: Result<SettlementOutcome>) -> HttpResponse {
    match result {
        Ok(outcome) => HttpResponse::Ok().json(ApiResponse::success(outcome, "Webhook processed")),
        Err(e) => {
            match &e {
                PortalError::Authentication(_) | PortalError::Validation(_) => {
                    warn!("{} webhook rejected: {}", provider, e)
                }
                _ => error!("{} webhook failed: {}", provider, e),
            }
            portal_error_response(&e, payment_error_code(&e))
        }
    }
}

pub async fn asaas_webhook(
    service: &PaymentService,
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
    Ok(webhook_response("Asaas", result))
}

pub async fn mercado_pago_webhook(
    service: &PaymentService,
    query: MercadoPagoWebhookQuery,
    body: &[u8],
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let integrations = get_integrations(request);

    let result = process_mercado_pago_webhook(
        &storage,
        &integrations,
        &AppConfig::get().payments.mercado_pago.webhook_secret,
        query.secret.as_deref(),
        body,
    )
    .await;
    Ok(webhook_response("Mercado Pago", result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{FakeEmail, FakeSender, fake_integrations, memory_storage};

    fn integrations() -> Integrations {
        fake_integrations(
            Arc::new(FakeEmail::default()),
            Arc::new(FakeSender::new()),
            vec![],
        )
    }

    #[tokio::test]
    async fn test_asaas_rejects_bad_token() {
        let storage = memory_storage().await;
        let body = br#"{"event":"PAYMENT_RECEIVED","payment":{"id":"pay_1"}}"#;

        let err = process_asaas_webhook(&storage, &integrations(), "tok", Some("nope"), body)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Authentication(_)));

        let err = process_asaas_webhook(&storage, &integrations(), "", None, body)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_asaas_malformed_body() {
        let storage = memory_storage().await;
        let err = process_asaas_webhook(&storage, &integrations(), "tok", Some("tok"), b"not json")
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));
    }

    #[tokio::test]
    async fn test_asaas_unknown_payment_acknowledged() {
        let storage = memory_storage().await;
        let body = br#"{"event":"PAYMENT_RECEIVED","payment":{"id":"pay_missing","externalReference":"77"}}"#;
        let outcome = process_asaas_webhook(&storage, &integrations(), "tok", Some("tok"), body)
            .await
            .unwrap();
        assert_eq!(outcome, SettlementOutcome::UnknownPayment);
    }

    #[tokio::test]
    async fn test_mercado_pago_without_gateway_is_configuration_error() {
        let storage = memory_storage().await;
        let body = br#"{"type":"payment","data":{"id":1}}"#;
        let err = process_mercado_pago_webhook(&storage, &integrations(), "s", Some("s"), body)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Configuration(_)));
    }

    #[test]
    fn test_webhook_response_status() {
        let ok = webhook_response("Asaas", Ok(SettlementOutcome::Ignored));
        assert_eq!(ok.status(), actix_web::http::StatusCode::OK);
        let denied = webhook_response("Asaas", Err(PortalError::authentication("bad token")));
        assert_eq!(denied.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    }
}
