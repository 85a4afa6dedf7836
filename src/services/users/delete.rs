use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::info;

use super::UserService;
use crate::errors::{PortalError, Result};
use crate::middlewares::RequireJWT;
use crate::models::{ApiResponse, ErrorCode, portal_error_response};
use crate::storage::Storage;

/// 删除登录账号。
///
/// 教师账号与教师档案同生同灭，必须走 `/api/v1/teachers/{id}`；
/// 学生账号删除后档案保留，`user_id` 置空，可在审批时重新开通。
pub async fn remove_account(storage: &Arc<dyn Storage>, operator_id: i64, user_id: i64) -> Result<()> {
    if operator_id == user_id {
        return Err(PortalError::validation("Cannot delete current user"));
    }
    if storage.get_user_by_id(user_id).await?.is_none() {
        return Err(PortalError::not_found(format!("User {user_id} not found")));
    }
    if let Some(teacher) = storage.get_teacher_by_user_id(user_id).await? {
        return Err(PortalError::conflict(format!(
            "User {user_id} belongs to teacher {}, delete the teacher instead",
            teacher.id
        )));
    }

    let student = storage.get_student_by_user_id(user_id).await?;
    if !storage.delete_user(user_id).await? {
        return Err(PortalError::not_found(format!("User {user_id} not found")));
    }
    match student {
        Some(student) => info!("User {} deleted, student {} kept without account", user_id, student.id),
        None => info!("User {} deleted", user_id),
    }
    Ok(())
}

pub async fn delete_user(
    service: &UserService,
    user_id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(operator_id) = RequireJWT::extract_user_id(request) else {
        return Ok(HttpResponse::Unauthorized().json(ApiResponse::error_empty(
            ErrorCode::Unauthorized,
            "用户未登录",
        )));
    };
    let storage = service.get_storage(request);

    match remove_account(&storage, operator_id, user_id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_empty("用户已删除"))),
        Err(e) => {
            let code = match &e {
                PortalError::Validation(_) => ErrorCode::CanNotDeleteCurrentUser,
                PortalError::NotFound(_) => ErrorCode::UserNotFound,
                PortalError::Conflict(_) => ErrorCode::UserLinkedToTeacher,
                _ => ErrorCode::UserDeleteFailed,
            };
            Ok(portal_error_response(&e, code))
        }
    }
}
