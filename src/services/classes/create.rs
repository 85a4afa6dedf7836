use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::{error, info};

use super::{ClassService, check_homeroom_teacher};
use crate::errors::PortalError;
use crate::models::classes::requests::CreateClassRequest;
use crate::models::classes::responses::ClassResponse;
use crate::models::{ApiResponse, ErrorCode, internal_error_response};
use crate::utils::validate::validate_required_text;

pub async fn create_class(
    service: &ClassService,
    request: &HttpRequest,
    mut class_data: CreateClassRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    if let Err(msg) = validate_required_text(&class_data.name, "name", 50) {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(ErrorCode::BadRequest, msg)));
    }
    class_data.name = class_data.name.trim().to_string();

    if let Err(resp) = check_homeroom_teacher(&storage, class_data.homeroom_teacher_id).await {
        return Ok(resp);
    }

    match storage.create_class(class_data).await {
        Ok(class) => {
            info!("Class {} created", class.name);
            Ok(HttpResponse::Created().json(ApiResponse::success(
                ClassResponse { class },
                "Class created successfully",
            )))
        }
        Err(PortalError::Conflict(_)) => Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
            ErrorCode::ClassNameAlreadyExists,
            "Class name already exists",
        ))),
        Err(e) => {
            error!("Class creation failed: {}", e);
            Ok(internal_error_response("Class creation failed"))
        }
    }
}
