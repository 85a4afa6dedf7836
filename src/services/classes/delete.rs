use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::{ClassService, class_not_found};
use crate::models::{ApiResponse, ErrorCode, internal_error_response};

pub async fn delete_class(
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

    // 学生和科目按名称关联，删除前必须先迁走
    match storage.count_class_references(&class.name).await {
        Ok(0) => {}
        Ok(count) => {
            return Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
                ErrorCode::ClassInUse,
                format!("Class {} is still referenced by {count} students or subjects", class.name),
            )));
        }
        Err(e) => return Ok(internal_error_response(format!("Class deletion failed: {e}"))),
    }

    match storage.delete_class(class_id).await {
        Ok(true) => {
            tracing::info!("Class {} deleted", class.name);
            Ok(HttpResponse::Ok().json(ApiResponse::success_empty("Class deleted successfully")))
        }
        Ok(false) => Ok(class_not_found()),
        Err(e) => Ok(internal_error_response(format!("Class deletion failed: {e}"))),
    }
}
