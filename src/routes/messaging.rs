use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::messaging::requests::{
    BroadcastListParams, CreateBroadcastRequest, RecipientListParams, SendEmailRequest,
    SendWhatsAppRequest,
};
use crate::models::users::entities::UserRole;
use crate::services::MessagingService;
use crate::services::messaging::BroadcastAction;
use crate::utils::SafeIDI64;

// 懒加载的全局 MessagingService 实例
static MESSAGING_SERVICE: Lazy<MessagingService> = Lazy::new(MessagingService::new_lazy);

pub async fn send_whatsapp(
    req: HttpRequest,
    body: web::Json<SendWhatsAppRequest>,
) -> ActixResult<HttpResponse> {
    MESSAGING_SERVICE.send_whatsapp(body.into_inner(), &req).await
}

pub async fn send_email(
    req: HttpRequest,
    body: web::Json<SendEmailRequest>,
) -> ActixResult<HttpResponse> {
    MESSAGING_SERVICE.send_email(body.into_inner(), &req).await
}

pub async fn create_broadcast(
    req: HttpRequest,
    body: web::Json<CreateBroadcastRequest>,
) -> ActixResult<HttpResponse> {
    MESSAGING_SERVICE
        .create_broadcast(body.into_inner(), &req)
        .await
}

pub async fn list_broadcasts(
    req: HttpRequest,
    query: web::Query<BroadcastListParams>,
) -> ActixResult<HttpResponse> {
    MESSAGING_SERVICE
        .list_broadcasts(query.into_inner(), &req)
        .await
}

pub async fn get_broadcast(req: HttpRequest, broadcast_id: SafeIDI64) -> ActixResult<HttpResponse> {
    MESSAGING_SERVICE.get_broadcast(broadcast_id.0, &req).await
}

pub async fn list_recipients(
    req: HttpRequest,
    broadcast_id: SafeIDI64,
    query: web::Query<RecipientListParams>,
) -> ActixResult<HttpResponse> {
    MESSAGING_SERVICE
        .list_recipients(broadcast_id.0, query.into_inner(), &req)
        .await
}

pub async fn pause_broadcast(req: HttpRequest, broadcast_id: SafeIDI64) -> ActixResult<HttpResponse> {
    MESSAGING_SERVICE
        .control_broadcast(broadcast_id.0, BroadcastAction::Pause, &req)
        .await
}

pub async fn resume_broadcast(
    req: HttpRequest,
    broadcast_id: SafeIDI64,
) -> ActixResult<HttpResponse> {
    MESSAGING_SERVICE
        .control_broadcast(broadcast_id.0, BroadcastAction::Resume, &req)
        .await
}

pub async fn stop_broadcast(req: HttpRequest, broadcast_id: SafeIDI64) -> ActixResult<HttpResponse> {
    MESSAGING_SERVICE
        .control_broadcast(broadcast_id.0, BroadcastAction::Stop, &req)
        .await
}

pub async fn retry_failed(req: HttpRequest, broadcast_id: SafeIDI64) -> ActixResult<HttpResponse> {
    MESSAGING_SERVICE
        .control_broadcast(broadcast_id.0, BroadcastAction::RetryFailed, &req)
        .await
}

// 配置路由
pub fn configure_messaging_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/messaging")
            .wrap(middlewares::RequireJWT)
            .service(
                web::scope("")
                    .wrap(middlewares::RequireRole::new_any(UserRole::admin_roles()))
                    .route("/whatsapp", web::post().to(send_whatsapp))
                    .route("/email", web::post().to(send_email))
                    .route("/broadcasts", web::get().to(list_broadcasts))
                    .route("/broadcasts", web::post().to(create_broadcast))
                    .route("/broadcasts/{id}", web::get().to(get_broadcast))
                    .route("/broadcasts/{id}/recipients", web::get().to(list_recipients))
                    .route("/broadcasts/{id}/pause", web::post().to(pause_broadcast))
                    .route("/broadcasts/{id}/resume", web::post().to(resume_broadcast))
                    .route("/broadcasts/{id}/stop", web::post().to(stop_broadcast))
                    .route("/broadcasts/{id}/retry-failed", web::post().to(retry_failed)),
            ),
    );
}
