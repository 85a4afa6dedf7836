use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::access::{assessment_for_grading, subject_for_grading, taught_subject_ids};
use super::scores::{record_grades, validate_assessment_update, validate_new_assessment};
use super::{GradeService, grade_error_code};
use crate::errors::PortalError;
use crate::models::grades::requests::{
    AssessmentListParams, AssessmentListQuery, CreateAssessmentRequest, UpdateAssessmentRequest,
    UpsertGradesRequest,
};
use crate::models::grades::responses::{AssessmentGradesResponse, AssessmentResponse};
use crate::models::{ApiResponse, internal_error_response, portal_error_response};
use crate::services::current_user;

fn grade_error(err: &PortalError) -> HttpResponse {
    portal_error_response(err, grade_error_code(err))
}

pub async fn create_assessment(
    service: &GradeService,
    mut body: CreateAssessmentRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    if let Err(e) = validate_new_assessment(&body) {
        return Ok(grade_error(&e));
    }
    if let Err(e) = subject_for_grading(&storage, &user, body.subject_id).await {
        return Ok(grade_error(&e));
    }
    body.title = body.title.trim().to_string();

    match storage.create_assessment(body).await {
        Ok(assessment) => Ok(HttpResponse::Created().json(ApiResponse::success(
            AssessmentResponse { assessment },
            "评估创建成功",
        ))),
        Err(e) => Ok(internal_error_response(format!("创建评估失败: {e}"))),
    }
}

pub async fn list_assessments(
    service: &GradeService,
    query: AssessmentListParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    let subject_ids = match taught_subject_ids(&storage, &user).await {
        Ok(ids) => ids,
        Err(e) => return Ok(grade_error(&e)),
    };
    let list_query = AssessmentListQuery {
        page: Some(query.pagination.page),
        size: Some(query.pagination.size),
        subject_id: query.subject_id,
        subject_ids,
        term: query.term,
    };

    match storage.list_assessments_with_pagination(list_query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "获取评估列表成功"))),
        Err(e) => Ok(internal_error_response(format!("获取评估列表失败: {e}"))),
    }
}

pub async fn update_assessment(
    service: &GradeService,
    id: i64,
    mut body: UpdateAssessmentRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    if let Err(e) = assessment_for_grading(&storage, &user, id).await {
        return Ok(grade_error(&e));
    }
    let existing = match storage.list_grades_by_assessment(id).await {
        Ok(grades) => grades,
        Err(e) => return Ok(internal_error_response(format!("获取成绩失败: {e}"))),
    };
    if let Err(e) = validate_assessment_update(&body, &existing) {
        return Ok(grade_error(&e));
    }
    body.title = body.title.map(|t| t.trim().to_string());

    match storage.update_assessment(id, body).await {
        Ok(Some(assessment)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            AssessmentResponse { assessment },
            "评估更新成功",
        ))),
        Ok(None) => Ok(grade_error(&PortalError::not_found(format!(
            "Assessment {id} not found"
        )))),
        Err(e) => Ok(internal_error_response(format!("更新评估失败: {e}"))),
    }
}

/// 评估下的成绩一并删除
pub async fn delete_assessment(
    service: &GradeService,
    id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    if let Err(e) = assessment_for_grading(&storage, &user, id).await {
        return Ok(grade_error(&e));
    }

    match storage.delete_assessment(id).await {
        Ok(_) => Ok(HttpResponse::Ok().json(ApiResponse::success_empty("评估已删除"))),
        Err(e) => Ok(internal_error_response(format!("删除评估失败: {e}"))),
    }
}

pub async fn upsert_grades(
    service: &GradeService,
    id: i64,
    body: UpsertGradesRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    let assessment = match assessment_for_grading(&storage, &user, id).await {
        Ok((assessment, _)) => assessment,
        Err(e) => return Ok(grade_error(&e)),
    };

    match record_grades(&storage, &assessment, body.grades, user.id).await {
        Ok(grades) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            AssessmentGradesResponse { assessment, grades },
            "成绩已保存",
        ))),
        Err(e) => Ok(grade_error(&e)),
    }
}

pub async fn list_grades(
    service: &GradeService,
    id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    let assessment = match assessment_for_grading(&storage, &user, id).await {
        Ok((assessment, _)) => assessment,
        Err(e) => return Ok(grade_error(&e)),
    };

    match storage.list_grades_by_assessment(id).await {
        Ok(grades) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            AssessmentGradesResponse { assessment, grades },
            "获取成绩成功",
        ))),
        Err(e) => Ok(internal_error_response(format!("获取成绩失败: {e}"))),
    }
}
