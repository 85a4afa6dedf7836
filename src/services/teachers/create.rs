use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::info;

use super::TeacherService;
use crate::errors::{PortalError, Result};
use crate::models::teachers::requests::{CreateTeacherRequest, NewTeacher};
use crate::models::teachers::responses::CreateTeacherResponse;
use crate::models::users::entities::{UserRole, UserStatus};
use crate::models::users::requests::NewUser;
use crate::models::{ApiResponse, ErrorCode, portal_error_response};
use crate::storage::Storage;
use crate::utils::normalize_phone;
use crate::utils::password::{generate_password, hash_password};
use crate::utils::validate::{
    validate_email, validate_password_simple, validate_required_text, validate_username,
};

const GENERATED_PASSWORD_LENGTH: usize = 12;

/// 创建教师档案和教师账号；未提供密码时生成一次性初始密码
pub async fn create_teacher_account(
    storage: &Arc<dyn Storage>,
    request: CreateTeacherRequest,
) -> Result<CreateTeacherResponse> {
    validate_required_text(&request.full_name, "full_name", 120).map_err(PortalError::validation)?;
    let email = request.email.trim().to_lowercase();
    validate_email(&email).map_err(PortalError::validation)?;

    let username = match request.username.map(|u| u.trim().to_string()) {
        Some(username) if !username.is_empty() => {
            validate_username(&username).map_err(PortalError::validation)?;
            username
        }
        _ => email.clone(),
    };
    let phone = match request.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(raw) => Some(
            normalize_phone(raw)
                .ok_or_else(|| PortalError::validation(format!("Invalid phone number: {raw}")))?,
        ),
        None => None,
    };

    let (password, generated) = match request.password.filter(|p| !p.is_empty()) {
        Some(password) => {
            validate_password_simple(&password).map_err(PortalError::validation)?;
            (password, false)
        }
        None => (generate_password(GENERATED_PASSWORD_LENGTH), true),
    };

    if storage.get_teacher_by_email(&email).await?.is_some()
        || storage.get_user_by_email(&email).await?.is_some()
    {
        return Err(PortalError::conflict(format!(
            "A teacher with email {email} already exists"
        )));
    }

    let full_name = request.full_name.trim().to_string();
    let account = NewUser {
        username: username.clone(),
        email: email.clone(),
        password_hash: hash_password(&password)?,
        role: UserRole::Teacher,
        status: UserStatus::Active,
        display_name: Some(full_name.clone()),
        phone: phone.clone(),
    };
    let profile = NewTeacher {
        full_name,
        email,
        phone,
        specialty: request
            .specialty
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    };

    let (_, teacher) = storage.create_teacher_with_account(account, profile).await?;
    info!("Teacher {} created with account {}", teacher.id, teacher.user_id);

    Ok(CreateTeacherResponse {
        teacher,
        username,
        generated_password: generated.then_some(password),
    })
}

pub async fn create_teacher(
    service: &TeacherService,
    body: CreateTeacherRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    match create_teacher_account(&storage, body).await {
        Ok(response) => Ok(HttpResponse::Created().json(ApiResponse::success(response, "教师创建成功"))),
        Err(e) => {
            let code = match &e {
                PortalError::Conflict(_) => ErrorCode::TeacherEmailAlreadyExists,
                PortalError::Validation(msg) if msg.starts_with("Invalid phone") => {
                    ErrorCode::InvalidPhone
                }
                PortalError::Validation(_) => ErrorCode::BadRequest,
                _ => ErrorCode::InternalServerError,
            };
            Ok(portal_error_response(&e, code))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::memory_storage;
    use crate::utils::password::verify_password;

    fn request(email: &str) -> CreateTeacherRequest {
        CreateTeacherRequest {
            full_name: "Carla Mendes".to_string(),
            email: email.to_string(),
            phone: Some("21 99876-5432".to_string()),
            specialty: Some("Química".to_string()),
            username: None,
            password: None,
        }
    }

    #[tokio::test]
    async fn test_generates_password_once() {
        let storage = memory_storage().await;
        let response = create_teacher_account(&storage, request("Carla@Escola.test"))
            .await
            .unwrap();

        assert_eq!(response.username, "carla@escola.test");
        let password = response.generated_password.unwrap();
        let user = storage
            .get_user_by_id(response.teacher.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.role, UserRole::Teacher);
        assert!(verify_password(&password, &user.password_hash));
        assert_eq!(response.teacher.phone.as_deref(), Some("5521998765432"));
    }

    #[tokio::test]
    async fn test_explicit_credentials_and_duplicate() {
        let storage = memory_storage().await;
        let mut body = request("paulo@escola.test");
        body.username = Some("prof.paulo".to_string());
        body.password = Some("Quimica#2025".to_string());

        let response = create_teacher_account(&storage, body).await.unwrap();
        assert_eq!(response.username, "prof.paulo");
        assert!(response.generated_password.is_none());

        let err = create_teacher_account(&storage, request("paulo@escola.test"))
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Conflict(_)));
    }
}
