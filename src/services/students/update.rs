use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::{info, warn};

use super::StudentService;
use crate::models::students::requests::UpdateStudentRequest;
use crate::models::students::responses::StudentResponse;
use crate::models::{ApiResponse, ErrorCode, internal_error_response};
use crate::utils::normalize_phone;
use crate::utils::validate::validate_required_text;

fn bad_request(code: ErrorCode, message: impl Into<String>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(code, message)))
}

pub async fn update_student(
    service: &StudentService,
    id: i64,
    mut body: UpdateStudentRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    if let Some(name) = &body.full_name {
        if let Err(msg) = validate_required_text(name, "full_name", 120) {
            return bad_request(ErrorCode::StudentInvalid, msg);
        }
        body.full_name = Some(name.trim().to_string());
    }
    for phone in [&mut body.phone, &mut body.guardian_phone] {
        if let Some(raw) = phone.take() {
            match normalize_phone(&raw) {
                Some(normalized) => *phone = Some(normalized),
                None => {
                    return bad_request(ErrorCode::InvalidPhone, format!("Invalid phone number: {raw}"));
                }
            }
        }
    }
    if let Some(class_name) = body.class_name.as_deref() {
        match storage.get_class_by_name(class_name).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return bad_request(ErrorCode::ClassNotFound, format!("Unknown class: {class_name}"));
            }
            Err(e) => return Ok(internal_error_response(format!("查询班级失败: {e}"))),
        }
    }

    match storage.update_student(id, body).await {
        Ok(Some(student)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            StudentResponse { student },
            "学生信息更新成功",
        ))),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::StudentNotFound,
            "Student not found",
        ))),
        Err(e) => Ok(internal_error_response(format!("更新学生信息失败: {e}"))),
    }
}

/// 删除学籍时一并删除其登录账号
pub async fn delete_student(
    service: &StudentService,
    id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    let student = match storage.get_student_by_id(id).await {
        Ok(Some(student)) => student,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::StudentNotFound,
                "Student not found",
            )));
        }
        Err(e) => return Ok(internal_error_response(format!("获取学生信息失败: {e}"))),
    };

    if let Err(e) = storage.delete_student(id).await {
        return Ok(internal_error_response(format!("删除学生失败: {e}")));
    }
    if let Some(user_id) = student.user_id
        && let Err(e) = storage.delete_user(user_id).await
    {
        warn!("Student {} deleted but account {} remains: {}", id, user_id, e);
    }
    info!("Student {} deleted", id);

    Ok(HttpResponse::Ok().json(ApiResponse::success_empty("学生已删除")))
}
