//! Edge Function 兼容入口：`/functions/v1/{name}`
//!
//! 统一返回 `{ success, data | error }`，已处理的失败同样是 HTTP 200。

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::users::entities::UserRole;
use crate::services::FunctionService;

static FUNCTION_SERVICE: Lazy<FunctionService> = Lazy::new(FunctionService::new_lazy);

pub async fn send_whatsapp(req: HttpRequest, body: web::Bytes) -> ActixResult<HttpResponse> {
    FUNCTION_SERVICE.send_whatsapp(&body, &req).await
}

pub async fn send_email(req: HttpRequest, body: web::Bytes) -> ActixResult<HttpResponse> {
    FUNCTION_SERVICE.send_email(&body, &req).await
}

pub async fn approve_student(req: HttpRequest, body: web::Bytes) -> ActixResult<HttpResponse> {
    FUNCTION_SERVICE.approve_student(&body, &req).await
}

pub async fn create_payment(req: HttpRequest, body: web::Bytes) -> ActixResult<HttpResponse> {
    FUNCTION_SERVICE.create_payment(&body, &req).await
}

pub async fn asaas_webhook(req: HttpRequest, body: web::Bytes) -> ActixResult<HttpResponse> {
    FUNCTION_SERVICE.asaas_webhook(&body, &req).await
}

pub fn configure_function_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/functions/v1")
            .service(
                web::resource("/asaas-webhook")
                    .wrap(middlewares::RateLimit::webhook())
                    .route(web::post().to(asaas_webhook)),
            )
            .service(
                web::scope("")
                    .wrap(middlewares::RateLimit::functions())
                    .wrap(middlewares::RequireRole::new_any(UserRole::admin_roles()))
                    .wrap(middlewares::RequireJWT)
                    .route("/send-whatsapp", web::post().to(send_whatsapp))
                    .route("/send-email", web::post().to(send_email))
                    .route("/approve-student", web::post().to(approve_student))
                    .route("/create-payment", web::post().to(create_payment)),
            ),
    );
}
