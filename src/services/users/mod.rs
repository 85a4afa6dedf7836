pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod update;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::users::requests::{CreateUserRequest, UpdateUserRequest, UserListParams};
use crate::storage::Storage;

pub struct UserService {
    storage: Option<Arc<dyn Storage>>,
}

impl UserService {
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

    // 获取用户列表
    pub async fn list_users(
        &self,
        query: UserListParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        list::list_users(self, query, request).await
    }

    // 创建用户
    pub async fn create_user(
        &self,
        user_data: CreateUserRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        create::create_user(self, user_data, request).await
    }

    // 根据ID获取用户
    pub async fn get_user(&self, user_id: i64, request: &HttpRequest) -> ActixResult<HttpResponse> {
        get::get_user(self, user_id, request).await
    }

    // 更新用户信息
    pub async fn update_user(
        &self,
        user_id: i64,
        update_data: UpdateUserRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        update::update_user(self, user_id, update_data, request).await
    }

    // 删除用户
    pub async fn delete_user(
        &self,
        user_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        delete::delete_user(self, user_id, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ErrorCode;
    use crate::models::users::entities::{UserRole, UserStatus};
    use crate::services::testing::{json_body, memory_storage, request_as, seed_user};
    use actix_web::http::StatusCode;

    fn create_request(username: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            email: format!("{username}@Escola.test"),
            password: "Forte#2025".to_string(),
            role: UserRole::Teacher,
            status: None,
            display_name: Some("Prof. Lia".to_string()),
            phone: Some("21 3333-4444".to_string()),
        }
    }

    #[actix_web::test]
    async fn test_create_user_and_duplicate() {
        let storage = memory_storage().await;
        let admin = seed_user(&storage, "admin", UserRole::Admin, UserStatus::Active).await;
        let req = request_as(&storage, Some(&admin), None);
        let service = UserService::new_lazy();

        let resp = service.create_user(create_request("prof.lia"), &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = json_body(resp).await;
        assert_eq!(body["data"]["user"]["email"], "prof.lia@escola.test");
        assert_eq!(body["data"]["user"]["phone"], "552133334444");
        assert_eq!(body["data"]["user"]["status"], "active");

        let dup = service.create_user(create_request("prof.lia"), &req).await.unwrap();
        assert_eq!(dup.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_create_user_rejects_weak_password() {
        let storage = memory_storage().await;
        let req = request_as(&storage, None, None);
        let mut body = create_request("prof.leo");
        body.password = "fraca".to_string();

        let resp = UserService::new_lazy().create_user(body, &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["code"], ErrorCode::UserPasswordInvalid as i32);
    }

    #[actix_web::test]
    async fn test_admin_cannot_delete_or_demote_self() {
        let storage = memory_storage().await;
        let admin = seed_user(&storage, "admin", UserRole::Admin, UserStatus::Active).await;
        let other = seed_user(&storage, "prof.bia", UserRole::Teacher, UserStatus::Active).await;
        let req = request_as(&storage, Some(&admin), None);
        let service = UserService::new_lazy();

        let resp = service.delete_user(admin.id, &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let demote = UpdateUserRequest {
            role: Some(UserRole::Teacher),
            ..Default::default()
        };
        let resp = service.update_user(admin.id, demote, &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let suspend = UpdateUserRequest {
            status: Some(UserStatus::Suspended),
            ..Default::default()
        };
        let resp = service.update_user(other.id, suspend, &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = service.delete_user(other.id, &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(storage.get_user_by_id(other.id).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn test_teacher_account_is_deleted_through_teacher_profile() {
        use crate::models::teachers::requests::CreateTeacherRequest;
        use crate::services::teachers::create::create_teacher_account;

        let storage = memory_storage().await;
        let admin = seed_user(&storage, "admin", UserRole::Admin, UserStatus::Active).await;
        let created = create_teacher_account(
            &storage,
            CreateTeacherRequest {
                full_name: "Rita Souza".to_string(),
                email: "rita@escola.test".to_string(),
                phone: None,
                specialty: Some("Historia".to_string()),
                username: None,
                password: None,
            },
        )
        .await
        .unwrap();
        let req = request_as(&storage, Some(&admin), None);

        let resp = UserService::new_lazy()
            .delete_user(created.teacher.user_id, &req)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(resp).await["code"], ErrorCode::UserLinkedToTeacher as i32);
        assert!(storage.get_user_by_id(created.teacher.user_id).await.unwrap().is_some());

        let missing = UserService::new_lazy().delete_user(9999, &req).await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_list_users_filters_by_role() {
        let storage = memory_storage().await;
        let admin = seed_user(&storage, "admin", UserRole::Admin, UserStatus::Active).await;
        seed_user(&storage, "prof.ana", UserRole::Teacher, UserStatus::Active).await;
        seed_user(&storage, "aluno.caio", UserRole::Student, UserStatus::Pending).await;
        let req = request_as(&storage, Some(&admin), None);

        let params: UserListParams =
            serde_json::from_value(serde_json::json!({ "role": "teacher" })).unwrap();
        let resp = UserService::new_lazy().list_users(params, &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        let items = body["data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["username"], "prof.ana");
    }
}
