use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::announcements::requests::AnnouncementListParams;
use crate::models::materials::requests::MaterialListParams;
use crate::models::users::entities::UserRole;
use crate::services::PortalService;

// 懒加载的全局 PortalService 实例
static PORTAL_SERVICE: Lazy<PortalService> = Lazy::new(PortalService::new_lazy);

pub async fn overview(req: HttpRequest) -> ActixResult<HttpResponse> {
    PORTAL_SERVICE.overview(&req).await
}

pub async fn report_card(req: HttpRequest) -> ActixResult<HttpResponse> {
    PORTAL_SERVICE.report_card(&req).await
}

pub async fn attendance(req: HttpRequest) -> ActixResult<HttpResponse> {
    PORTAL_SERVICE.attendance(&req).await
}

pub async fn payments(req: HttpRequest) -> ActixResult<HttpResponse> {
    PORTAL_SERVICE.payments(&req).await
}

pub async fn announcements(
    req: HttpRequest,
    query: web::Query<AnnouncementListParams>,
) -> ActixResult<HttpResponse> {
    PORTAL_SERVICE.announcements(query.into_inner(), &req).await
}

pub async fn materials(
    req: HttpRequest,
    query: web::Query<MaterialListParams>,
) -> ActixResult<HttpResponse> {
    PORTAL_SERVICE.materials(query.into_inner(), &req).await
}

// 学生门户，只看自己的数据
pub fn configure_portal_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/portal")
            .wrap(middlewares::RequireJWT)
            .service(
                web::scope("")
                    .wrap(middlewares::RequireRole::new_any(UserRole::student_roles()))
                    .route("", web::get().to(overview))
                    .route("/report-card", web::get().to(report_card))
                    .route("/attendance", web::get().to(attendance))
                    .route("/payments", web::get().to(payments))
                    .route("/announcements", web::get().to(announcements))
                    .route("/materials", web::get().to(materials)),
            ),
    );
}
