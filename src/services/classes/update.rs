use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::{ClassService, check_homeroom_teacher, class_not_found};
use crate::errors::PortalError;
use crate::models::classes::requests::UpdateClassRequest;
use crate::models::classes::responses::ClassResponse;
use crate::models::{ApiResponse, ErrorCode, internal_error_response};
use crate::utils::validate::validate_required_text;

pub async fn update_class(
    service: &ClassService,
    request: &HttpRequest,
    class_id: i64,
    mut update_data: UpdateClassRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    if let Some(name) = &update_data.name {
        if let Err(msg) = validate_required_text(name, "name", 50) {
            return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(ErrorCode::BadRequest, msg)));
        }
        update_data.name = Some(name.trim().to_string());
    }
    if let Err(resp) = check_homeroom_teacher(&storage, update_data.homeroom_teacher_id).await {
        return Ok(resp);
    }

    match storage.update_class(class_id, update_data).await {
        Ok(Some(class)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            ClassResponse { class },
            "Class updated successfully",
        ))),
        Ok(None) => Ok(class_not_found()),
        Err(PortalError::Conflict(_)) => Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
            ErrorCode::ClassNameAlreadyExists,
            "Class name already exists",
        ))),
        Err(e) => Ok(internal_error_response(format!("Class update failed: {e}"))),
    }
}
