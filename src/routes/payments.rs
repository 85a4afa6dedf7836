use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::payments::requests::{
    CreatePaymentRequest, MercadoPagoWebhookQuery, PaymentListParams,
};
use crate::models::users::entities::UserRole;
use crate::services::PaymentService;
use crate::utils::SafeIDI64;

// 懒加载的全局 PaymentService 实例
static PAYMENT_SERVICE: Lazy<PaymentService> = Lazy::new(PaymentService::new_lazy);

pub async fn list_payments(
    req: HttpRequest,
    query: web::Query<PaymentListParams>,
) -> ActixResult<HttpResponse> {
    PAYMENT_SERVICE.list_payments(query.into_inner(), &req).await
}

// 为学生生成收款
pub async fn create_payment(
    req: HttpRequest,
    body: web::Json<CreatePaymentRequest>,
) -> ActixResult<HttpResponse> {
    PAYMENT_SERVICE.create_payment(body.into_inner(), &req).await
}

pub async fn get_payment(req: HttpRequest, payment_id: SafeIDI64) -> ActixResult<HttpResponse> {
    PAYMENT_SERVICE.get_payment(payment_id.0, &req).await
}

pub async fn mark_paid(req: HttpRequest, payment_id: SafeIDI64) -> ActixResult<HttpResponse> {
    PAYMENT_SERVICE.mark_paid(payment_id.0, &req).await
}

pub async fn cancel_payment(req: HttpRequest, payment_id: SafeIDI64) -> ActixResult<HttpResponse> {
    PAYMENT_SERVICE.cancel_payment(payment_id.0, &req).await
}

// 网关回调，原始请求体交给业务层解析
pub async fn asaas_webhook(req: HttpRequest, body: web::Bytes) -> ActixResult<HttpResponse> {
    PAYMENT_SERVICE.asaas_webhook(&body, &req).await
}

pub async fn mercado_pago_webhook(
    req: HttpRequest,
    query: web::Query<MercadoPagoWebhookQuery>,
    body: web::Bytes,
) -> ActixResult<HttpResponse> {
    PAYMENT_SERVICE
        .mercado_pago_webhook(query.into_inner(), &body, &req)
        .await
}

pub fn configure_payment_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/payments")
            .wrap(middlewares::RequireJWT)
            .service(
                web::scope("")
                    .wrap(middlewares::RequireRole::new_any(UserRole::admin_roles()))
                    .route("", web::get().to(list_payments))
                    .route("", web::post().to(create_payment))
                    .route("/{id}", web::get().to(get_payment))
                    .route("/{id}/mark-paid", web::post().to(mark_paid))
                    .route("/{id}/cancel", web::post().to(cancel_payment)),
            ),
    );
}

// 网关回调不走 JWT，由业务层校验令牌
pub fn configure_webhook_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/webhooks")
            .wrap(middlewares::RateLimit::webhook())
            .route("/asaas", web::post().to(asaas_webhook))
            .route("/mercado-pago", web::post().to(mercado_pago_webhook)),
    );
}
