use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::TeacherService;
use crate::models::teachers::requests::{TeacherListParams, TeacherListQuery, UpdateTeacherRequest};
use crate::models::teachers::responses::TeacherResponse;
use crate::models::{ApiResponse, ErrorCode, internal_error_response};
use crate::utils::normalize_phone;
use crate::utils::validate::validate_required_text;

fn teacher_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::error_empty(
        ErrorCode::TeacherNotFound,
        "Teacher not found",
    ))
}

pub async fn list_teachers(
    service: &TeacherService,
    query: TeacherListParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    match service
        .get_storage(request)
        .list_teachers_with_pagination(TeacherListQuery::from(query))
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "获取教师列表成功"))),
        Err(e) => Ok(internal_error_response(format!("获取教师列表失败: {e}"))),
    }
}

pub async fn get_teacher(
    service: &TeacherService,
    id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    match service.get_storage(request).get_teacher_by_id(id).await {
        Ok(Some(teacher)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            TeacherResponse { teacher },
            "获取教师信息成功",
        ))),
        Ok(None) => Ok(teacher_not_found()),
        Err(e) => Ok(internal_error_response(format!("获取教师信息失败: {e}"))),
    }
}

pub async fn update_teacher(
    service: &TeacherService,
    id: i64,
    mut body: UpdateTeacherRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    if let Some(name) = &body.full_name {
        if let Err(msg) = validate_required_text(name, "full_name", 120) {
            return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(ErrorCode::BadRequest, msg)));
        }
        body.full_name = Some(name.trim().to_string());
    }
    if let Some(raw) = body.phone.take() {
        match normalize_phone(&raw) {
            Some(phone) => body.phone = Some(phone),
            None => {
                return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                    ErrorCode::InvalidPhone,
                    format!("Invalid phone number: {raw}"),
                )));
            }
        }
    }

    match service.get_storage(request).update_teacher(id, body).await {
        Ok(Some(teacher)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            TeacherResponse { teacher },
            "教师信息更新成功",
        ))),
        Ok(None) => Ok(teacher_not_found()),
        Err(e) => Ok(internal_error_response(format!("更新教师信息失败: {e}"))),
    }
}

pub async fn delete_teacher(
    service: &TeacherService,
    id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    match service.get_storage(request).delete_teacher(id).await {
        Ok(true) => {
            tracing::info!("Teacher {} deleted", id);
            Ok(HttpResponse::Ok().json(ApiResponse::success_empty("教师已删除")))
        }
        Ok(false) => Ok(teacher_not_found()),
        Err(e) => Ok(internal_error_response(format!("删除教师失败: {e}"))),
    }
}
