use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::{ClassService, class_not_found};
use crate::models::classes::responses::{ClassResponse, ClassStudentsResponse};
use crate::models::students::requests::StudentFilter;
use crate::models::{ApiResponse, internal_error_response};

pub async fn get_class(
    service: &ClassService,
    request: &HttpRequest,
    class_id: i64,
) -> ActixResult<HttpResponse> {
    match service.get_storage(request).get_class_by_id(class_id).await {
        Ok(Some(class)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            ClassResponse { class },
            "Class information retrieved successfully",
        ))),
        Ok(None) => Ok(class_not_found()),
        Err(e) => Ok(internal_error_response(format!(
            "Failed to get class information: {e}"
        ))),
    }
}

/// 按班级名匹配的全部学生（不分状态）
pub async fn list_class_students(
    service: &ClassService,
    request: &HttpRequest,
    class_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    let class = match storage.get_class_by_id(class_id).await {
        Ok(Some(class)) => class,
        Ok(None) => return Ok(class_not_found()),
        Err(e) => {
            return Ok(internal_error_response(format!(
                "Failed to get class information: {e}"
            )));
        }
    };

    let filter = StudentFilter {
        status: None,
        class_name: Some(class.name),
    };
    match storage.list_students(filter).await {
        Ok(items) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            ClassStudentsResponse { items },
            "Class students retrieved successfully",
        ))),
        Err(e) => Ok(internal_error_response(format!(
            "Failed to list class students: {e}"
        ))),
    }
}
