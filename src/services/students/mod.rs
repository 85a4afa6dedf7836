pub mod approval;
pub mod create;
pub mod enroll;
pub mod list;
pub mod records;
pub mod report_card;
pub mod review;
pub mod update;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::errors::PortalError;
use crate::models::ErrorCode;
use crate::models::students::requests::{
    CreateStudentRequest, EnrollmentRequest, RejectStudentRequest, StudentListParams,
    UpdateStudentRequest,
};
use crate::storage::Storage;

pub struct StudentService {
    storage: Option<Arc<dyn Storage>>,
}

impl StudentService {
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

    // 公开报名
    pub async fn enroll(
        &self,
        body: EnrollmentRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        enroll::enroll(self, body, request).await
    }

    pub async fn list_students(
        &self,
        query: StudentListParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        list::list_students(self, query, request).await
    }

    // 待审核报名
    pub async fn list_pending(
        &self,
        query: StudentListParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        list::list_pending(self, query, request).await
    }

    pub async fn get_student(&self, id: i64, request: &HttpRequest) -> ActixResult<HttpResponse> {
        list::get_student(self, id, request).await
    }

    pub async fn create_student(
        &self,
        body: CreateStudentRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        create::create_student(self, body, request).await
    }

    pub async fn update_student(
        &self,
        id: i64,
        body: UpdateStudentRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        update::update_student(self, id, body, request).await
    }

    pub async fn delete_student(&self, id: i64, request: &HttpRequest) -> ActixResult<HttpResponse> {
        update::delete_student(self, id, request).await
    }

    pub async fn approve_student(
        &self,
        id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        review::approve(self, id, request).await
    }

    pub async fn reject_student(
        &self,
        id: i64,
        body: RejectStudentRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        review::reject(self, id, body, request).await
    }

    pub async fn report_card(&self, id: i64, request: &HttpRequest) -> ActixResult<HttpResponse> {
        list::report_card(self, id, request).await
    }
}

/// 学生相关领域错误对应的业务码
pub(crate) fn student_error_code(err: &PortalError) -> ErrorCode {
    match err {
        PortalError::NotFound(_) => ErrorCode::StudentNotFound,
        PortalError::Conflict(_) => ErrorCode::StudentEmailAlreadyExists,
        PortalError::Validation(msg) if msg.starts_with("Invalid phone") => ErrorCode::InvalidPhone,
        PortalError::Validation(_) => ErrorCode::StudentInvalid,
        _ => ErrorCode::InternalServerError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::students::entities::EnrollmentStatus;
    use crate::models::users::entities::{UserRole, UserStatus};
    use crate::services::integrations::Integrations;
    use crate::services::testing::{
        FakeEmail, FakeSender, fake_integrations, json_body, memory_storage, request_as, seed_user,
    };
    use actix_web::http::StatusCode;

    fn integrations() -> Arc<Integrations> {
        Arc::new(fake_integrations(
            Arc::new(FakeEmail::default()),
            Arc::new(FakeSender::new()),
            vec![],
        ))
    }

    fn enrollment(email: &str) -> EnrollmentRequest {
        EnrollmentRequest {
            full_name: "Rafael Dias".to_string(),
            email: email.to_string(),
            password: "Matricula#2025".to_string(),
            phone: None,
            birth_date: None,
            guardian_name: None,
            guardian_phone: Some("11 91234-5678".to_string()),
            class_name: None,
        }
    }

    #[actix_web::test]
    async fn test_enroll_then_approve_flow() {
        let storage = memory_storage().await;
        let admin = seed_user(&storage, "admin", UserRole::Admin, UserStatus::Active).await;
        let service = StudentService::new_lazy();

        let public = request_as(&storage, None, Some(integrations()));
        let resp = service.enroll(enrollment("rafa@familia.test"), &public).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let student_id = json_body(resp).await["data"]["student"]["id"].as_i64().unwrap();

        let dup = service.enroll(enrollment("rafa@familia.test"), &public).await.unwrap();
        assert_eq!(dup.status(), StatusCode::CONFLICT);
        assert_eq!(
            json_body(dup).await["code"],
            ErrorCode::StudentEmailAlreadyExists as i32
        );

        let req = request_as(&storage, Some(&admin), Some(integrations()));
        let pending = service
            .list_pending(
                serde_json::from_str::<StudentListParams>(r#"{"status":"approved"}"#).unwrap(),
                &req,
            )
            .await
            .unwrap();
        let body = json_body(pending).await;
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

        let resp = service.approve_student(student_id, &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["data"]["student"]["enrollment_status"], "approved");
        assert_eq!(body["data"]["account_created"], false);

        let student = storage.get_student_by_id(student_id).await.unwrap().unwrap();
        let user = storage
            .get_user_by_id(student.user_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(user.is_active());
    }

    #[actix_web::test]
    async fn test_update_validates_and_delete_removes_account() {
        let storage = memory_storage().await;
        let admin = seed_user(&storage, "admin", UserRole::Admin, UserStatus::Active).await;
        let req = request_as(&storage, Some(&admin), Some(integrations()));
        let service = StudentService::new_lazy();

        let public = request_as(&storage, None, Some(integrations()));
        let resp = service.enroll(enrollment("del@familia.test"), &public).await.unwrap();
        let student_id = json_body(resp).await["data"]["student"]["id"].as_i64().unwrap();

        let bad = UpdateStudentRequest {
            phone: Some("12".to_string()),
            ..Default::default()
        };
        let resp = service.update_student(student_id, bad, &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let unknown_class = UpdateStudentRequest {
            class_name: Some("3C".to_string()),
            ..Default::default()
        };
        let resp = service.update_student(student_id, unknown_class, &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let ok = UpdateStudentRequest {
            phone: Some("(11) 95555-4444".to_string()),
            ..Default::default()
        };
        let body = json_body(service.update_student(student_id, ok, &req).await.unwrap()).await;
        assert_eq!(body["data"]["student"]["phone"], "5511955554444");

        let user_id = storage
            .get_student_by_id(student_id)
            .await
            .unwrap()
            .unwrap()
            .user_id
            .unwrap();
        let resp = service.delete_student(student_id, &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(storage.get_student_by_id(student_id).await.unwrap().is_none());
        assert!(storage.get_user_by_id(user_id).await.unwrap().is_none());

        let resp = service.delete_student(student_id, &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_reject_deactivates_account() {
        let storage = memory_storage().await;
        let service = StudentService::new_lazy();
        let req = request_as(&storage, None, Some(integrations()));

        let resp = service.enroll(enrollment("rej@familia.test"), &req).await.unwrap();
        let student_id = json_body(resp).await["data"]["student"]["id"].as_i64().unwrap();

        let body = RejectStudentRequest {
            reason: Some("Documentação incompleta".to_string()),
        };
        let resp = service.reject_student(student_id, body, &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let student = storage.get_student_by_id(student_id).await.unwrap().unwrap();
        assert_eq!(student.enrollment_status, EnrollmentStatus::Rejected);
        assert_eq!(student.notes.as_deref(), Some("Documentação incompleta"));
        let user = storage
            .get_user_by_id(student.user_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.status, UserStatus::Inactive);

        let resp = service.approve_student(9999, &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
