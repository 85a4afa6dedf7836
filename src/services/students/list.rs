use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::StudentService;
use super::report_card::load_report_card;
use crate::models::students::entities::EnrollmentStatus;
use crate::models::students::requests::{StudentListParams, StudentListQuery};
use crate::models::students::responses::StudentResponse;
use crate::models::{ApiResponse, ErrorCode, internal_error_response};

fn student_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::error_empty(
        ErrorCode::StudentNotFound,
        "Student not found",
    ))
}

pub async fn list_students(
    service: &StudentService,
    query: StudentListParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    match storage
        .list_students_with_pagination(StudentListQuery::from(query))
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "获取学生列表成功"))),
        Err(e) => Ok(internal_error_response(format!("获取学生列表失败: {e}"))),
    }
}

/// 只返回待审核的报名，忽略请求中的状态筛选
pub async fn list_pending(
    service: &StudentService,
    query: StudentListParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let query = StudentListQuery {
        status: Some(EnrollmentStatus::Pending),
        ..StudentListQuery::from(query)
    };

    match storage.list_students_with_pagination(query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "获取待审核列表成功"))),
        Err(e) => Ok(internal_error_response(format!("获取待审核列表失败: {e}"))),
    }
}

pub async fn get_student(
    service: &StudentService,
    id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    match service.get_storage(request).get_student_by_id(id).await {
        Ok(Some(student)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            StudentResponse { student },
            "获取学生信息成功",
        ))),
        Ok(None) => Ok(student_not_found()),
        Err(e) => Ok(internal_error_response(format!("获取学生信息失败: {e}"))),
    }
}

pub async fn report_card(
    service: &StudentService,
    id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    let student = match storage.get_student_by_id(id).await {
        Ok(Some(student)) => student,
        Ok(None) => return Ok(student_not_found()),
        Err(e) => return Ok(internal_error_response(format!("获取学生信息失败: {e}"))),
    };

    match load_report_card(&storage, &student).await {
        Ok(card) => Ok(HttpResponse::Ok().json(ApiResponse::success(card, "获取成绩单成功"))),
        Err(e) => Ok(internal_error_response(format!("生成成绩单失败: {e}"))),
    }
}
