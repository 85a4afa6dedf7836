use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::info;

use super::MaterialService;
use crate::errors::{PortalError, Result};
use crate::models::materials::entities::Material;
use crate::models::materials::requests::{
    CreateMaterialRequest, MaterialListParams, MaterialListQuery, NewMaterial,
    UpdateMaterialRequest,
};
use crate::models::materials::responses::MaterialResponse;
use crate::models::users::entities::{User, UserRole};
use crate::models::{ApiResponse, ErrorCode, internal_error_response, portal_error_response};
use crate::services::current_user;
use crate::storage::Storage;
use crate::utils::validate::{validate_http_url, validate_required_text};

fn material_error(err: &PortalError) -> HttpResponse {
    let code = match err {
        PortalError::NotFound(msg) if msg.starts_with("Subject") => ErrorCode::SubjectNotFound,
        PortalError::NotFound(msg) if msg.starts_with("File") => ErrorCode::FileNotFound,
        PortalError::NotFound(_) => ErrorCode::MaterialNotFound,
        PortalError::Authorization(_) => ErrorCode::Forbidden,
        PortalError::Validation(msg) if msg.starts_with("A file or a link") => {
            ErrorCode::MaterialSourceMissing
        }
        PortalError::Validation(_) => ErrorCode::BadRequest,
        _ => ErrorCode::InternalServerError,
    };
    portal_error_response(err, code)
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// 资料来源：文件令牌必须对应已上传的文件，链接必须是 http(s)
async fn check_source(
    storage: &Arc<dyn Storage>,
    file_token: Option<&str>,
    link_url: Option<&str>,
) -> Result<()> {
    if file_token.is_none() && link_url.is_none() {
        return Err(PortalError::validation("A file or a link is required"));
    }
    if let Some(token) = file_token {
        storage
            .get_file_by_token(token)
            .await?
            .ok_or_else(|| PortalError::not_found(format!("File {token} not found")))?;
    }
    if let Some(url) = link_url {
        validate_http_url(url).map_err(PortalError::validation)?;
    }
    Ok(())
}

async fn check_subject(
    storage: &Arc<dyn Storage>,
    subject_id: i64,
    class_name: &str,
) -> Result<()> {
    let subject = storage
        .get_subject_by_id(subject_id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Subject {subject_id} not found")))?;
    if subject.class_name != class_name {
        return Err(PortalError::validation(format!(
            "Subject {subject_id} does not belong to class {class_name}"
        )));
    }
    Ok(())
}

fn check_uploader(user: &User, material: &Material) -> Result<()> {
    if user.role == UserRole::Admin || material.uploaded_by == user.id {
        Ok(())
    } else {
        Err(PortalError::authorization(
            "Only the uploader or an admin can change this material",
        ))
    }
}

pub async fn publish_material(
    storage: &Arc<dyn Storage>,
    user: &User,
    request: CreateMaterialRequest,
) -> Result<Material> {
    validate_required_text(&request.title, "title", 200).map_err(PortalError::validation)?;
    let class_name = request.class_name.trim().to_string();
    storage
        .get_class_by_name(&class_name)
        .await?
        .ok_or_else(|| PortalError::validation(format!("Unknown class: {class_name}")))?;
    if let Some(subject_id) = request.subject_id {
        check_subject(storage, subject_id, &class_name).await?;
    }

    let file_token = blank_to_none(request.file_token);
    let link_url = blank_to_none(request.link_url);
    check_source(storage, file_token.as_deref(), link_url.as_deref()).await?;

    let material = storage
        .create_material(NewMaterial {
            title: request.title.trim().to_string(),
            description: blank_to_none(request.description),
            subject_id: request.subject_id,
            class_name,
            file_token,
            link_url,
            uploaded_by: user.id,
        })
        .await?;
    info!(
        "Material {} shared with {} by user {}",
        material.id, material.class_name, user.id
    );
    Ok(material)
}

pub async fn revise_material(
    storage: &Arc<dyn Storage>,
    user: &User,
    id: i64,
    mut update: UpdateMaterialRequest,
) -> Result<Material> {
    let existing = storage
        .get_material_by_id(id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Material {id} not found")))?;
    check_uploader(user, &existing)?;

    if let Some(ref title) = update.title {
        validate_required_text(title, "title", 200).map_err(PortalError::validation)?;
        update.title = Some(title.trim().to_string());
    }
    if let Some(subject_id) = update.subject_id {
        check_subject(storage, subject_id, &existing.class_name).await?;
    }

    // 空字符串表示移除该来源，合并后仍需至少保留一个
    let file_token = match update.file_token.take() {
        Some(token) => blank_to_none(Some(token)),
        None => existing.file_token.clone(),
    };
    let link_url = match update.link_url.take() {
        Some(url) => blank_to_none(Some(url)),
        None => existing.link_url.clone(),
    };
    check_source(storage, file_token.as_deref(), link_url.as_deref()).await?;
    update.file_token = Some(file_token.unwrap_or_default());
    update.link_url = Some(link_url.unwrap_or_default());

    storage
        .update_material(id, update)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Material {id} not found")))
}

pub async fn create_material(
    service: &MaterialService,
    body: CreateMaterialRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    match publish_material(&storage, &user, body).await {
        Ok(material) => Ok(HttpResponse::Created().json(ApiResponse::success(
            MaterialResponse { material },
            "资料已发布",
        ))),
        Err(e) => Ok(material_error(&e)),
    }
}

pub async fn list_materials(
    service: &MaterialService,
    query: MaterialListParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    match storage
        .list_materials_with_pagination(MaterialListQuery::from(query))
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "获取资料列表成功"))),
        Err(e) => Ok(internal_error_response(format!("获取资料列表失败: {e}"))),
    }
}

pub async fn get_material(
    service: &MaterialService,
    id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    match storage.get_material_by_id(id).await {
        Ok(Some(material)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            MaterialResponse { material },
            "获取资料成功",
        ))),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::MaterialNotFound,
            "Material not found",
        ))),
        Err(e) => Ok(internal_error_response(format!("获取资料失败: {e}"))),
    }
}

pub async fn update_material(
    service: &MaterialService,
    id: i64,
    body: UpdateMaterialRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    match revise_material(&storage, &user, id, body).await {
        Ok(material) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            MaterialResponse { material },
            "资料已更新",
        ))),
        Err(e) => Ok(material_error(&e)),
    }
}

pub async fn delete_material(
    service: &MaterialService,
    id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    let existing = match storage.get_material_by_id(id).await {
        Ok(Some(m)) => m,
        Ok(None) => {
            return Ok(material_error(&PortalError::not_found(format!(
                "Material {id} not found"
            ))));
        }
        Err(e) => return Ok(internal_error_response(format!("删除资料失败: {e}"))),
    };
    if let Err(e) = check_uploader(&user, &existing) {
        return Ok(material_error(&e));
    }

    match storage.delete_material(id).await {
        Ok(_) => Ok(HttpResponse::Ok().json(ApiResponse::success_empty("资料已删除"))),
        Err(e) => Ok(internal_error_response(format!("删除资料失败: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classes::entities::Shift;
    use crate::models::classes::requests::CreateClassRequest;
    use crate::models::users::entities::UserStatus;
    use crate::services::testing::{memory_storage, request_as, seed_user};
    use actix_web::http::StatusCode;

    async fn with_class() -> Arc<dyn Storage> {
        let storage = memory_storage().await;
        storage
            .create_class(CreateClassRequest {
                name: "8B".to_string(),
                grade_level: None,
                shift: Shift::Evening,
                school_year: 2025,
                homeroom_teacher_id: None,
            })
            .await
            .unwrap();
        storage
    }

    fn link(url: &str) -> CreateMaterialRequest {
        CreateMaterialRequest {
            title: "Lista de exercícios".to_string(),
            description: None,
            subject_id: None,
            class_name: "8B".to_string(),
            file_token: None,
            link_url: Some(url.to_string()),
        }
    }

    #[tokio::test]
    async fn test_material_needs_a_source() {
        let storage = with_class().await;
        let teacher = seed_user(&storage, "prof", UserRole::Teacher, UserStatus::Active).await;

        let mut missing = link("");
        missing.file_token = Some("  ".to_string());
        let err = publish_material(&storage, &teacher, missing).await.unwrap_err();
        assert!(matches!(err, PortalError::Validation(ref m) if m.starts_with("A file or a link")));

        let err = publish_material(&storage, &teacher, link("ftp://arquivos.test/a.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));

        let mut unknown_file = link("");
        unknown_file.file_token = Some("nope".to_string());
        let err = publish_material(&storage, &teacher, unknown_file)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::NotFound(_)));

        let material = publish_material(&storage, &teacher, link("https://exemplo.test/lista"))
            .await
            .unwrap();
        assert_eq!(material.uploaded_by, teacher.id);
        assert_eq!(material.file_token, None);
    }

    #[tokio::test]
    async fn test_update_cannot_remove_last_source() {
        let storage = with_class().await;
        let teacher = seed_user(&storage, "prof", UserRole::Teacher, UserStatus::Active).await;
        let material = publish_material(&storage, &teacher, link("https://exemplo.test/lista"))
            .await
            .unwrap();

        let err = revise_material(
            &storage,
            &teacher,
            material.id,
            UpdateMaterialRequest {
                link_url: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));

        let updated = revise_material(
            &storage,
            &teacher,
            material.id,
            UpdateMaterialRequest {
                title: Some("Lista 2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "Lista 2");
        assert_eq!(updated.link_url.as_deref(), Some("https://exemplo.test/lista"));
    }

    #[actix_web::test]
    async fn test_only_uploader_or_admin_deletes() {
        let storage = with_class().await;
        let owner = seed_user(&storage, "prof", UserRole::Teacher, UserStatus::Active).await;
        let other = seed_user(&storage, "outro", UserRole::Teacher, UserStatus::Active).await;
        let admin = seed_user(&storage, "admin", UserRole::Admin, UserStatus::Active).await;
        let material = publish_material(&storage, &owner, link("https://exemplo.test/lista"))
            .await
            .unwrap();

        let service = MaterialService::new_lazy();
        let resp = service
            .delete_material(material.id, &request_as(&storage, Some(&other), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = service
            .delete_material(material.id, &request_as(&storage, Some(&admin), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
