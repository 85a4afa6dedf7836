use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::records::create_student_record;
use super::{StudentService, student_error_code};
use crate::models::students::requests::CreateStudentRequest;
use crate::models::students::responses::StudentResponse;
use crate::models::{ApiResponse, portal_error_response};

pub async fn create_student(
    service: &StudentService,
    body: CreateStudentRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    match create_student_record(&storage, body).await {
        Ok(student) => Ok(HttpResponse::Created().json(ApiResponse::success(
            StudentResponse { student },
            "学生创建成功",
        ))),
        Err(e) => Ok(portal_error_response(&e, student_error_code(&e))),
    }
}
