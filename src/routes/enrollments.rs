use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::students::requests::EnrollmentRequest;
use crate::services::StudentService;

static STUDENT_SERVICE: Lazy<StudentService> = Lazy::new(StudentService::new_lazy);

pub async fn enroll(
    req: HttpRequest,
    body: web::Json<EnrollmentRequest>,
) -> ActixResult<HttpResponse> {
    STUDENT_SERVICE.enroll(body.into_inner(), &req).await
}

// 公开的报名入口，只做限流
pub fn configure_enrollment_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/enrollments")
            .wrap(middlewares::RateLimit::enrollment())
            .route("", web::post().to(enroll)),
    );
}
