use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::approval::{approve_student, reject_student};
use super::{StudentService, student_error_code};
use crate::errors::PortalError;
use crate::models::students::requests::RejectStudentRequest;
use crate::models::{ApiResponse, ErrorCode, portal_error_response};
use crate::services::integrations::get_integrations;

/// 审核时的冲突来自已存在同邮箱的账号
fn review_error(err: &PortalError) -> HttpResponse {
    let code = match err {
        PortalError::Conflict(_) => ErrorCode::UserAlreadyExists,
        other => student_error_code(other),
    };
    portal_error_response(err, code)
}

pub async fn approve(
    service: &StudentService,
    id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let integrations = get_integrations(request);

    match approve_student(&storage, &integrations, id).await {
        Ok(response) => {
            let message = if response.unchanged {
                "学生已是通过状态"
            } else {
                "学生审核通过"
            };
            Ok(HttpResponse::Ok().json(ApiResponse::success(response, message)))
        }
        Err(e) => Ok(review_error(&e)),
    }
}

pub async fn reject(
    service: &StudentService,
    id: i64,
    body: RejectStudentRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    match reject_student(&storage, id, body.reason).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "报名已拒绝"))),
        Err(e) => Ok(review_error(&e)),
    }
}
