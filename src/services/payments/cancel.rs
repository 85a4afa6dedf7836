use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::PaymentService;
use crate::models::payments::entities::PaymentStatus;
use crate::models::payments::responses::PaymentResponse;
use crate::models::{ApiResponse, ErrorCode, internal_error_response};

/// 只取消本地记录；网关侧的收款到期后自动失效
pub async fn cancel_payment(
    service: &PaymentService,
    payment_id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    let payment = match storage.get_payment_by_id(payment_id).await {
        Ok(Some(payment)) => payment,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::PaymentNotFound,
                "Payment not found",
            )));
        }
        Err(e) => return Ok(internal_error_response(format!("获取收款失败: {e}"))),
    };

    if !payment.status.is_open() {
        return Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
            ErrorCode::PaymentInvalidState,
            format!("Only pending or overdue payments can be cancelled (current: {})", payment.status),
        )));
    }

    match storage
        .update_payment_status(payment_id, PaymentStatus::Cancelled)
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            return Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
                ErrorCode::PaymentInvalidState,
                "Payment was settled in the meantime",
            )));
        }
        Err(e) => return Ok(internal_error_response(format!("取消收款失败: {e}"))),
    }
    info!("Payment {} cancelled", payment_id);

    match storage.get_payment_by_id(payment_id).await {
        Ok(Some(payment)) => Ok(HttpResponse::Ok()
            .json(ApiResponse::success(PaymentResponse { payment }, "收款已取消"))),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::PaymentNotFound,
            "Payment not found",
        ))),
        Err(e) => Ok(internal_error_response(format!("获取收款失败: {e}"))),
    }
}
