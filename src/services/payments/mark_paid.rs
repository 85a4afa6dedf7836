use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::{error, info};

use super::PaymentService;
use super::settlement::{PaymentEvent, SettlementEvent, settle};
use crate::models::payments::responses::SettlementOutcome;
use crate::models::{ApiResponse, ErrorCode, internal_error_response};
use crate::services::integrations::get_integrations;

/// 手动结清；报名费同样触发学籍审核
pub async fn mark_paid(
    service: &PaymentService,
    payment_id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let integrations = get_integrations(request);

    let payment = match storage.get_payment_by_id(payment_id).await {
        Ok(Some(payment)) => payment,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::PaymentNotFound,
                "Payment not found",
            )));
        }
        Err(e) => {
            error!("Failed to load payment {}: {}", payment_id, e);
            return Ok(internal_error_response("Failed to load payment"));
        }
    };

    if !payment.status.is_open() {
        return Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
            ErrorCode::PaymentInvalidState,
            format!("Payment is already {}", payment.status),
        )));
    }

    let event = SettlementEvent {
        provider: payment.provider,
        external_id: payment.external_id.clone().unwrap_or_default(),
        external_reference: Some(payment.id.to_string()),
        event: PaymentEvent::Paid,
    };

    match settle(&storage, &integrations, event).await {
        Ok(outcome @ SettlementOutcome::Settled { .. }) => {
            info!("Payment {} marked as paid manually", payment_id);
            Ok(HttpResponse::Ok().json(ApiResponse::success(outcome, "收款已结清")))
        }
        Ok(_) => Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
            ErrorCode::PaymentInvalidState,
            "Payment is already paid",
        ))),
        Err(e) => {
            error!("Manual settlement of payment {} failed: {}", payment_id, e);
            Ok(internal_error_response("Failed to settle payment"))
        }
    }
}
