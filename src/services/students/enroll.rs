use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::records::enroll_student;
use super::{StudentService, student_error_code};
use crate::models::students::requests::EnrollmentRequest;
use crate::models::{ApiResponse, portal_error_response};
use crate::services::integrations::get_integrations;
use crate::services::system::DynamicConfig;

pub async fn enroll(
    service: &StudentService,
    body: EnrollmentRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let integrations = get_integrations(request);
    let fee_cents = DynamicConfig::enrollment_fee_cents().await;

    match enroll_student(&storage, &integrations, body, fee_cents).await {
        Ok(response) => Ok(HttpResponse::Created().json(ApiResponse::success(
            response,
            "报名已提交，等待审核",
        ))),
        Err(e) => Ok(portal_error_response(&e, student_error_code(&e))),
    }
}
