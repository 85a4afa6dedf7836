pub mod list;
pub mod record;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::errors::PortalError;
use crate::models::ErrorCode;
use crate::models::attendance::requests::{
    AttendanceListParams, AttendanceSummaryParams, RecordAttendanceRequest,
};
use crate::storage::Storage;

pub struct AttendanceService {
    storage: Option<Arc<dyn Storage>>,
}

impl AttendanceService {
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

    // 点名，重复提交覆盖
    pub async fn record_attendance(
        &self,
        body: RecordAttendanceRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        record::record_attendance(self, body, request).await
    }

    pub async fn list_attendance(
        &self,
        query: AttendanceListParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        list::list_attendance(self, query, request).await
    }

    pub async fn attendance_summary(
        &self,
        query: AttendanceSummaryParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        list::attendance_summary(self, query, request).await
    }
}

pub(crate) fn attendance_error_code(err: &PortalError) -> ErrorCode {
    match err {
        PortalError::NotFound(msg) if msg.starts_with("Class") => ErrorCode::ClassNotFound,
        PortalError::NotFound(msg) if msg.starts_with("Subject") => ErrorCode::SubjectNotFound,
        PortalError::NotFound(_) => ErrorCode::StudentNotFound,
        PortalError::Authorization(_) => ErrorCode::Forbidden,
        PortalError::Validation(_) => ErrorCode::AttendanceInvalid,
        _ => ErrorCode::InternalServerError,
    }
}
