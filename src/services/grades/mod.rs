pub mod access;
pub mod assessments;
pub mod scores;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::errors::PortalError;
use crate::models::ErrorCode;
use crate::models::grades::requests::{
    AssessmentListParams, CreateAssessmentRequest, UpdateAssessmentRequest, UpsertGradesRequest,
};
use crate::storage::Storage;

pub struct GradeService {
    storage: Option<Arc<dyn Storage>>,
}

impl GradeService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        if let Some(storage) = &self.storage {
            storage.clone()
        } else {
            request
                .app_data::<actix_web::web::Data<Arc<dyn Storage>>>()
                .expect("Storage not found in app data")
                .get_ref()
                .clone()
        }
    }

    pub async fn create_assessment(
        &self,
        body: CreateAssessmentRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        assessments::create_assessment(self, body, request).await
    }

    // 教师只能看到自己科目的评估
    pub async fn list_assessments(
        &self,
        query: AssessmentListParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        assessments::list_assessments(self, query, request).await
    }

    pub async fn update_assessment(
        &self,
        id: i64,
        body: UpdateAssessmentRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        assessments::update_assessment(self, id, body, request).await
    }

    pub async fn delete_assessment(
        &self,
        id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        assessments::delete_assessment(self, id, request).await
    }

    // 批量录入成绩
    pub async fn upsert_grades(
        &self,
        id: i64,
        body: UpsertGradesRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        assessments::upsert_grades(self, id, body, request).await
    }

    pub async fn list_grades(&self, id: i64, request: &HttpRequest) -> ActixResult<HttpResponse> {
        assessments::list_grades(self, id, request).await
    }
}

pub(crate) fn grade_error_code(err: &PortalError) -> ErrorCode {
    match err {
        PortalError::NotFound(msg) if msg.starts_with("Subject") => ErrorCode::SubjectNotFound,
        PortalError::NotFound(msg) if msg.starts_with("Student") => ErrorCode::StudentNotFound,
        PortalError::NotFound(_) => ErrorCode::AssessmentNotFound,
        PortalError::Authorization(_) => ErrorCode::GradePermissionDenied,
        PortalError::Validation(msg) if msg.starts_with("Score") => ErrorCode::ScoreOutOfRange,
        PortalError::Validation(_) => ErrorCode::BadRequest,
        _ => ErrorCode::InternalServerError,
    }
}
