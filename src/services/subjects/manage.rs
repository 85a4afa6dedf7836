use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use super::SubjectService;
use crate::errors::{PortalError, Result};
use crate::models::subjects::requests::{
    CreateSubjectRequest, SubjectListParams, SubjectListQuery, UpdateSubjectRequest,
};
use crate::models::subjects::responses::SubjectResponse;
use crate::models::{ApiResponse, ErrorCode, internal_error_response, portal_error_response};
use crate::storage::Storage;
use crate::utils::validate::validate_required_text;

fn subject_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::error_empty(
        ErrorCode::SubjectNotFound,
        "Subject not found",
    ))
}

fn reference_error(err: &PortalError) -> HttpResponse {
    let code = match err {
        PortalError::NotFound(msg) if msg.starts_with("Class") => ErrorCode::ClassNotFound,
        PortalError::NotFound(_) => ErrorCode::TeacherNotFound,
        PortalError::Validation(_) => ErrorCode::BadRequest,
        _ => ErrorCode::InternalServerError,
    };
    portal_error_response(err, code)
}

/// 科目引用的班级和教师必须存在
async fn check_references(
    storage: &Arc<dyn Storage>,
    class_name: Option<&str>,
    teacher_id: Option<i64>,
) -> Result<()> {
    if let Some(name) = class_name
        && storage.get_class_by_name(name).await?.is_none()
    {
        return Err(PortalError::not_found(format!("Class {name} not found")));
    }
    if let Some(id) = teacher_id
        && storage.get_teacher_by_id(id).await?.is_none()
    {
        return Err(PortalError::not_found(format!("Teacher {id} not found")));
    }
    Ok(())
}

fn validate_workload(hours: Option<i32>) -> Result<()> {
    match hours {
        Some(h) if !(0..=2000).contains(&h) => Err(PortalError::validation(
            "workload_hours must be between 0 and 2000",
        )),
        _ => Ok(()),
    }
}

pub async fn create_subject(
    service: &SubjectService,
    mut body: CreateSubjectRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    if let Err(msg) = validate_required_text(&body.name, "name", 100) {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(ErrorCode::BadRequest, msg)));
    }
    body.name = body.name.trim().to_string();
    body.class_name = body.class_name.trim().to_string();

    let checked = match validate_workload(body.workload_hours) {
        Ok(()) => check_references(&storage, Some(&body.class_name), body.teacher_id).await,
        Err(e) => Err(e),
    };
    if let Err(e) = checked {
        return Ok(reference_error(&e));
    }

    match storage.create_subject(body).await {
        Ok(subject) => Ok(HttpResponse::Created().json(ApiResponse::success(
            SubjectResponse { subject },
            "科目创建成功",
        ))),
        Err(e) => Ok(internal_error_response(format!("创建科目失败: {e}"))),
    }
}

pub async fn list_subjects(
    service: &SubjectService,
    query: SubjectListParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    match service
        .get_storage(request)
        .list_subjects_with_pagination(SubjectListQuery::from(query))
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "获取科目列表成功"))),
        Err(e) => Ok(internal_error_response(format!("获取科目列表失败: {e}"))),
    }
}

pub async fn get_subject(
    service: &SubjectService,
    id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    match service.get_storage(request).get_subject_by_id(id).await {
        Ok(Some(subject)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            SubjectResponse { subject },
            "获取科目成功",
        ))),
        Ok(None) => Ok(subject_not_found()),
        Err(e) => Ok(internal_error_response(format!("获取科目失败: {e}"))),
    }
}

pub async fn update_subject(
    service: &SubjectService,
    id: i64,
    mut body: UpdateSubjectRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    if let Some(name) = &body.name {
        if let Err(msg) = validate_required_text(name, "name", 100) {
            return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(ErrorCode::BadRequest, msg)));
        }
        body.name = Some(name.trim().to_string());
    }
    let checked = match validate_workload(body.workload_hours) {
        Ok(()) => check_references(&storage, body.class_name.as_deref(), body.teacher_id).await,
        Err(e) => Err(e),
    };
    if let Err(e) = checked {
        return Ok(reference_error(&e));
    }

    match storage.update_subject(id, body).await {
        Ok(Some(subject)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            SubjectResponse { subject },
            "科目更新成功",
        ))),
        Ok(None) => Ok(subject_not_found()),
        Err(e) => Ok(internal_error_response(format!("更新科目失败: {e}"))),
    }
}

pub async fn delete_subject(
    service: &SubjectService,
    id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    match service.get_storage(request).delete_subject(id).await {
        Ok(true) => Ok(HttpResponse::Ok().json(ApiResponse::success_empty("科目已删除"))),
        Ok(false) => Ok(subject_not_found()),
        Err(e) => Ok(internal_error_response(format!("删除科目失败: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classes::entities::Shift;
    use crate::models::classes::requests::CreateClassRequest;
    use crate::services::testing::{json_body, memory_storage, request_as};
    use actix_web::http::StatusCode;

    fn subject(class_name: &str, teacher_id: Option<i64>) -> CreateSubjectRequest {
        CreateSubjectRequest {
            name: " Geografia ".to_string(),
            class_name: class_name.to_string(),
            teacher_id,
            workload_hours: Some(80),
        }
    }

    #[actix_web::test]
    async fn test_subject_requires_existing_class_and_teacher() {
        let storage = memory_storage().await;
        let req = request_as(&storage, None, None);
        let service = SubjectService::new_lazy();

        let resp = service.create_subject(subject("9A", None), &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(resp).await["code"], ErrorCode::ClassNotFound as i32);

        storage
            .create_class(CreateClassRequest {
                name: "9A".to_string(),
                grade_level: None,
                shift: Shift::Morning,
                school_year: 2025,
                homeroom_teacher_id: None,
            })
            .await
            .unwrap();

        let resp = service.create_subject(subject("9A", Some(77)), &req).await.unwrap();
        assert_eq!(json_body(resp).await["code"], ErrorCode::TeacherNotFound as i32);

        let resp = service.create_subject(subject("9A", None), &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = json_body(resp).await;
        assert_eq!(body["data"]["subject"]["name"], "Geografia");
        let id = body["data"]["subject"]["id"].as_i64().unwrap();

        let bad_hours = UpdateSubjectRequest {
            workload_hours: Some(-1),
            ..Default::default()
        };
        let resp = service.update_subject(id, bad_hours, &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = service.delete_subject(id, &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = service.get_subject(id, &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
