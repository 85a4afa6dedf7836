use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::info;

use super::AnnouncementService;
use crate::errors::{PortalError, Result};
use crate::models::announcements::entities::{Announcement, AnnouncementVisibility, Audience};
use crate::models::announcements::requests::{
    AnnouncementListParams, AnnouncementListQuery, CreateAnnouncementRequest, NewAnnouncement,
    UpdateAnnouncementRequest,
};
use crate::models::announcements::responses::AnnouncementResponse;
use crate::models::users::entities::{User, UserRole};
use crate::models::{ApiResponse, ErrorCode, internal_error_response, portal_error_response};
use crate::services::current_user;
use crate::storage::Storage;
use crate::utils::validate::validate_required_text;

/// 当前读者可见的公告范围；学生按所在班级额外可见班级公告
pub async fn reader_visibility(
    storage: &Arc<dyn Storage>,
    user: &User,
) -> Result<AnnouncementVisibility> {
    let class_name = match user.role {
        UserRole::Student => storage
            .get_student_by_user_id(user.id)
            .await?
            .and_then(|s| s.class_name),
        _ => None,
    };
    Ok(AnnouncementVisibility::for_reader(user.role, class_name))
}

/// 班级公告必须指向已存在的班级，其他受众不保留班级名
async fn resolve_class(
    storage: &Arc<dyn Storage>,
    audience: Audience,
    class_name: Option<String>,
) -> Result<Option<String>> {
    if audience != Audience::Class {
        return Ok(None);
    }
    let name = class_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| PortalError::validation("class_name is required for class announcements"))?;
    storage
        .get_class_by_name(&name)
        .await?
        .ok_or_else(|| PortalError::validation(format!("Unknown class: {name}")))?;
    Ok(Some(name))
}

fn check_author(user: &User, announcement: &Announcement) -> Result<()> {
    if user.role == UserRole::Admin || announcement.author_id == user.id {
        Ok(())
    } else {
        Err(PortalError::authorization(
            "Only the author or an admin can change this announcement",
        ))
    }
}

fn announcement_error(err: &PortalError) -> HttpResponse {
    let code = match err {
        PortalError::NotFound(_) => ErrorCode::AnnouncementNotFound,
        PortalError::Authorization(_) => ErrorCode::Forbidden,
        PortalError::Validation(_) => ErrorCode::BadRequest,
        _ => ErrorCode::InternalServerError,
    };
    portal_error_response(err, code)
}

pub async fn publish_announcement(
    storage: &Arc<dyn Storage>,
    author: &User,
    request: CreateAnnouncementRequest,
) -> Result<Announcement> {
    validate_required_text(&request.title, "title", 200).map_err(PortalError::validation)?;
    validate_required_text(&request.content, "content", 10_000).map_err(PortalError::validation)?;
    let class_name = resolve_class(storage, request.audience, request.class_name).await?;

    let announcement = storage
        .create_announcement(NewAnnouncement {
            title: request.title.trim().to_string(),
            content: request.content,
            audience: request.audience,
            class_name,
            pinned: request.pinned,
            author_id: author.id,
        })
        .await?;
    info!(
        "Announcement {} published by user {} for {}",
        announcement.id, author.id, announcement.audience
    );
    Ok(announcement)
}

pub async fn revise_announcement(
    storage: &Arc<dyn Storage>,
    user: &User,
    id: i64,
    mut update: UpdateAnnouncementRequest,
) -> Result<Announcement> {
    let existing = storage
        .get_announcement_by_id(id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Announcement {id} not found")))?;
    check_author(user, &existing)?;

    if let Some(ref title) = update.title {
        validate_required_text(title, "title", 200).map_err(PortalError::validation)?;
        update.title = Some(title.trim().to_string());
    }
    if let Some(ref content) = update.content {
        validate_required_text(content, "content", 10_000).map_err(PortalError::validation)?;
    }

    // 受众或班级变化时按合并后的结果重新校验
    if update.audience.is_some() || update.class_name.is_some() {
        let audience = update.audience.unwrap_or(existing.audience);
        let class_name = update.class_name.take().or(existing.class_name);
        update.audience = Some(audience);
        update.class_name = resolve_class(storage, audience, class_name).await?;
    }

    storage
        .update_announcement(id, update)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Announcement {id} not found")))
}

pub async fn create_announcement(
    service: &AnnouncementService,
    body: CreateAnnouncementRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    match publish_announcement(&storage, &user, body).await {
        Ok(announcement) => Ok(HttpResponse::Created().json(ApiResponse::success(
            AnnouncementResponse { announcement },
            "公告已发布",
        ))),
        Err(e) => Ok(announcement_error(&e)),
    }
}

pub async fn list_announcements(
    service: &AnnouncementService,
    query: AnnouncementListParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    let visibility = match reader_visibility(&storage, &user).await {
        Ok(v) => v,
        Err(e) => return Ok(internal_error_response(format!("获取公告列表失败: {e}"))),
    };
    let list_query = AnnouncementListQuery {
        page: Some(query.pagination.page),
        size: Some(query.pagination.size),
        visibility,
        audience: query.audience,
    };

    match storage.list_announcements_with_pagination(list_query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "获取公告列表成功"))),
        Err(e) => Ok(internal_error_response(format!("获取公告列表失败: {e}"))),
    }
}

pub async fn get_announcement(
    service: &AnnouncementService,
    id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    let visibility = match reader_visibility(&storage, &user).await {
        Ok(v) => v,
        Err(e) => return Ok(internal_error_response(format!("获取公告失败: {e}"))),
    };

    match storage.get_announcement_by_id(id).await {
        // 不可见的公告与不存在同样处理
        Ok(Some(announcement)) if visibility.can_see(&announcement) => Ok(HttpResponse::Ok()
            .json(ApiResponse::success(
                AnnouncementResponse { announcement },
                "获取公告成功",
            ))),
        Ok(_) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::AnnouncementNotFound,
            "Announcement not found",
        ))),
        Err(e) => Ok(internal_error_response(format!("获取公告失败: {e}"))),
    }
}

pub async fn update_announcement(
    service: &AnnouncementService,
    id: i64,
    body: UpdateAnnouncementRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    match revise_announcement(&storage, &user, id, body).await {
        Ok(announcement) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            AnnouncementResponse { announcement },
            "公告已更新",
        ))),
        Err(e) => Ok(announcement_error(&e)),
    }
}

pub async fn delete_announcement(
    service: &AnnouncementService,
    id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    let existing = match storage.get_announcement_by_id(id).await {
        Ok(Some(a)) => a,
        Ok(None) => {
            return Ok(announcement_error(&PortalError::not_found(format!(
                "Announcement {id} not found"
            ))));
        }
        Err(e) => return Ok(internal_error_response(format!("删除公告失败: {e}"))),
    };
    if let Err(e) = check_author(&user, &existing) {
        return Ok(announcement_error(&e));
    }

    match storage.delete_announcement(id).await {
        Ok(_) => Ok(HttpResponse::Ok().json(ApiResponse::success_empty("公告已删除"))),
        Err(e) => Ok(internal_error_response(format!("删除公告失败: {e}"))),
    }
}
