use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::charge::create_charge_for_student;
use super::{PaymentService, payment_error_code};
use crate::models::payments::{requests::CreatePaymentRequest, responses::PaymentResponse};
use crate::models::{ApiResponse, portal_error_response};
use crate::services::integrations::get_integrations;

pub async fn create_payment(
    service: &PaymentService,
    body: CreatePaymentRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let integrations = get_integrations(request);

    match create_charge_for_student(&storage, &integrations, body).await {
        Ok(payment) => Ok(HttpResponse::Created()
            .json(ApiResponse::success(PaymentResponse { payment }, "收款创建成功"))),
        Err(e) => Ok(portal_error_response(&e, payment_error_code(&e))),
    }
}
