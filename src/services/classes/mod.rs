pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod update;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::classes::requests::{ClassListParams, CreateClassRequest, UpdateClassRequest};
use crate::models::{ApiResponse, ErrorCode, internal_error_response};
use crate::storage::Storage;

pub struct ClassService {
    storage: Option<Arc<dyn Storage>>,
}

impl ClassService {
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

    // 获取班级列表
    pub async fn list_classes(
        &self,
        request: &HttpRequest,
        query: ClassListParams,
    ) -> ActixResult<HttpResponse> {
        list::list_classes(self, request, query).await
    }

    pub async fn create_class(
        &self,
        req: &HttpRequest,
        class_data: CreateClassRequest,
    ) -> ActixResult<HttpResponse> {
        create::create_class(self, req, class_data).await
    }

    // 根据班级 ID 获取班级信息
    pub async fn get_class(&self, req: &HttpRequest, class_id: i64) -> ActixResult<HttpResponse> {
        get::get_class(self, req, class_id).await
    }

    // 班级内的学生
    pub async fn list_class_students(
        &self,
        req: &HttpRequest,
        class_id: i64,
    ) -> ActixResult<HttpResponse> {
        get::list_class_students(self, req, class_id).await
    }

    // 更新班级信息，改名会同步到引用方
    pub async fn update_class(
        &self,
        req: &HttpRequest,
        class_id: i64,
        update_data: UpdateClassRequest,
    ) -> ActixResult<HttpResponse> {
        update::update_class(self, req, class_id, update_data).await
    }

    // 仍有学生或科目引用时不能删除
    pub async fn delete_class(
        &self,
        req: &HttpRequest,
        class_id: i64,
    ) -> ActixResult<HttpResponse> {
        delete::delete_class(self, req, class_id).await
    }
}

/// 班主任必须是已存在的教师
pub(crate) async fn check_homeroom_teacher(
    storage: &Arc<dyn Storage>,
    teacher_id: Option<i64>,
) -> Result<(), HttpResponse> {
    let Some(teacher_id) = teacher_id else {
        return Ok(());
    };
    match storage.get_teacher_by_id(teacher_id).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::TeacherNotFound,
            "Homeroom teacher not found",
        ))),
        Err(e) => Err(internal_error_response(format!("查询教师失败: {e}"))),
    }
}

pub(crate) fn class_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::error_empty(
        ErrorCode::ClassNotFound,
        "Class not found",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classes::entities::Shift;
    use crate::models::students::entities::EnrollmentStatus;
    use crate::models::students::requests::NewStudent;
    use crate::services::testing::{json_body, memory_storage, request_as};
    use actix_web::http::StatusCode;

    fn class(name: &str) -> CreateClassRequest {
        CreateClassRequest {
            name: name.to_string(),
            grade_level: Some("6º ano".to_string()),
            shift: Shift::Afternoon,
            school_year: 2025,
            homeroom_teacher_id: None,
        }
    }

    fn student_in(class_name: &str, email: &str) -> NewStudent {
        NewStudent {
            user_id: None,
            full_name: "Davi Rocha".to_string(),
            email: email.to_string(),
            phone: None,
            birth_date: None,
            guardian_name: None,
            guardian_phone: None,
            class_name: Some(class_name.to_string()),
            registration_number: format!("2025{}", email.len()),
            enrollment_status: EnrollmentStatus::Approved,
            notes: None,
        }
    }

    #[actix_web::test]
    async fn test_create_duplicate_and_unknown_teacher() {
        let storage = memory_storage().await;
        let req = request_as(&storage, None, None);
        let service = ClassService::new_lazy();

        let resp = service.create_class(&req, class("6A")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = service.create_class(&req, class(" 6A ")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let mut with_teacher = class("6B");
        with_teacher.homeroom_teacher_id = Some(404);
        let resp = service.create_class(&req, with_teacher).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_delete_blocked_while_referenced_and_students_listing() {
        let storage = memory_storage().await;
        let req = request_as(&storage, None, None);
        let service = ClassService::new_lazy();

        let created = storage.create_class(class("7C")).await.unwrap();
        storage
            .create_student(student_in("7C", "davi@familia.test"))
            .await
            .unwrap();

        let body = json_body(service.list_class_students(&req, created.id).await.unwrap()).await;
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

        let resp = service.delete_class(&req, created.id).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        // 改名后学生随之迁移，旧名不再被引用
        let rename = UpdateClassRequest {
            name: Some("7D".to_string()),
            ..Default::default()
        };
        let resp = service.update_class(&req, created.id, rename).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(storage.count_class_references("7D").await.unwrap(), 1);

        let empty = storage.create_class(class("8A")).await.unwrap();
        let resp = service.delete_class(&req, empty.id).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = service.get_class(&req, empty.id).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
