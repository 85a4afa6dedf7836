use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::control::{
    broadcast_error_code, create_broadcast as create, pause_broadcast, resume_broadcast,
    retry_failed, stop_broadcast,
};
use super::{BroadcastAction, MessagingService};
use crate::models::messaging::requests::{
    BroadcastListParams, CreateBroadcastRequest, RecipientListParams,
};
use crate::models::messaging::responses::{BroadcastResponse, RecipientListResponse};
use crate::models::{ApiResponse, ErrorCode, internal_error_response, portal_error_response};
use crate::services::current_user;
use crate::services::integrations::get_integrations;

pub async fn create_broadcast(
    service: &MessagingService,
    body: CreateBroadcastRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);
    let integrations = get_integrations(request);

    match create(&storage, &integrations, user.id, body).await {
        Ok(response) => Ok(HttpResponse::Created().json(ApiResponse::success(response, "群发任务已开始"))),
        Err(e) => Ok(portal_error_response(&e, broadcast_error_code(&e))),
    }
}

pub async fn list_broadcasts(
    service: &MessagingService,
    query: BroadcastListParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    match storage
        .list_broadcasts_with_pagination(Some(query.pagination.page), Some(query.pagination.size))
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "获取群发列表成功"))),
        Err(e) => Ok(internal_error_response(format!("获取群发列表失败: {e}"))),
    }
}

pub async fn get_broadcast(
    service: &MessagingService,
    id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    match storage.get_broadcast_by_id(id).await {
        Ok(Some(broadcast)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            BroadcastResponse {
                broadcast,
                skipped: None,
            },
            "获取群发任务成功",
        ))),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::BroadcastNotFound,
            "Broadcast not found",
        ))),
        Err(e) => Ok(internal_error_response(format!("获取群发任务失败: {e}"))),
    }
}

pub async fn list_recipients(
    service: &MessagingService,
    id: i64,
    query: RecipientListParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    match storage.get_broadcast_by_id(id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::BroadcastNotFound,
                "Broadcast not found",
            )));
        }
        Err(e) => return Ok(internal_error_response(format!("获取群发任务失败: {e}"))),
    }

    match storage.list_broadcast_recipients(id, query.status).await {
        Ok(items) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            RecipientListResponse { items },
            "获取接收人列表成功",
        ))),
        Err(e) => Ok(internal_error_response(format!("获取接收人列表失败: {e}"))),
    }
}

pub async fn control_broadcast(
    service: &MessagingService,
    id: i64,
    action: BroadcastAction,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let integrations = get_integrations(request);

    let (result, message) = match action {
        BroadcastAction::Pause => (pause_broadcast(&storage, &integrations, id).await, "群发已暂停"),
        BroadcastAction::Resume => (resume_broadcast(&storage, &integrations, id).await, "群发已恢复"),
        BroadcastAction::Stop => (stop_broadcast(&storage, &integrations, id).await, "群发已停止"),
        BroadcastAction::RetryFailed => {
            (retry_failed(&storage, &integrations, id).await, "失败的接收人已重新排队")
        }
    };

    match result {
        Ok(broadcast) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            BroadcastResponse {
                broadcast,
                skipped: None,
            },
            message,
        ))),
        Err(e) => Ok(portal_error_response(&e, broadcast_error_code(&e))),
    }
}
