pub mod asaas;
pub mod cancel;
pub mod charge;
pub mod create;
pub mod gateway;
pub mod get;
pub mod list;
pub mod mark_paid;
pub mod mercado_pago;
pub mod settlement;
pub mod webhook;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::errors::PortalError;
use crate::models::ErrorCode;
use crate::models::payments::requests::{
    CreatePaymentRequest, MercadoPagoWebhookQuery, PaymentListParams,
};
use crate::storage::Storage;

pub struct PaymentService {
    storage: Option<Arc<dyn Storage>>,
}

impl PaymentService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        if let Some(storage) = &self.storage {
            storage.clone()
        } else {
            request
                .app_data::<actix_web::web::Data<Arc<dyn Storage>>>()
                .expect("Storage not found in app data")
                .get_ref()
                .clone()
        }
    }

    pub async fn list_payments(
        &self,
        query: PaymentListParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        list::list_payments(self, query, request).await
    }

    pub async fn create_payment(
        &self,
        body: CreatePaymentRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        create::create_payment(self, body, request).await
    }

    pub async fn get_payment(&self, payment_id: i64, request: &HttpRequest) -> ActixResult<HttpResponse> {
        get::get_payment(self, payment_id, request).await
    }

    // 线下收款，手动结清
    pub async fn mark_paid(&self, payment_id: i64, request: &HttpRequest) -> ActixResult<HttpResponse> {
        mark_paid::mark_paid(self, payment_id, request).await
    }

    pub async fn cancel_payment(
        &self,
        payment_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        cancel::cancel_payment(self, payment_id, request).await
    }

    pub async fn asaas_webhook(&self, body: &[u8], request: &HttpRequest) -> ActixResult<HttpResponse> {
        webhook::asaas_webhook(self, body, request).await
    }

    pub async fn mercado_pago_webhook(
        &self,
        query: MercadoPagoWebhookQuery,
        body: &[u8],
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        webhook::mercado_pago_webhook(self, query, body, request).await
    }
}

/// 收款相关领域错误对应的业务错误码
pub(crate) fn payment_error_code(err: &PortalError) -> ErrorCode {
    match err {
        PortalError::NotFound(_) => ErrorCode::StudentNotFound,
        PortalError::Validation(_) => ErrorCode::PaymentInvalid,
        PortalError::Configuration(_) => ErrorCode::PaymentProviderNotConfigured,
        PortalError::ExternalService(_) => ErrorCode::PaymentGatewayError,
        PortalError::Authentication(_) => ErrorCode::WebhookUnauthorized,
        _ => ErrorCode::InternalServerError,
    }
}
