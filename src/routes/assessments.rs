use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::grades::requests::{
    AssessmentListParams, CreateAssessmentRequest, UpdateAssessmentRequest, UpsertGradesRequest,
};
use crate::models::users::entities::UserRole;
use crate::services::GradeService;
use crate::utils::SafeIDI64;

// 懒加载的全局 GradeService 实例
static GRADE_SERVICE: Lazy<GradeService> = Lazy::new(GradeService::new_lazy);

pub async fn list_assessments(
    req: HttpRequest,
    query: web::Query<AssessmentListParams>,
) -> ActixResult<HttpResponse> {
    GRADE_SERVICE.list_assessments(query.into_inner(), &req).await
}

pub async fn create_assessment(
    req: HttpRequest,
    body: web::Json<CreateAssessmentRequest>,
) -> ActixResult<HttpResponse> {
    GRADE_SERVICE.create_assessment(body.into_inner(), &req).await
}

pub async fn update_assessment(
    req: HttpRequest,
    assessment_id: SafeIDI64,
    body: web::Json<UpdateAssessmentRequest>,
) -> ActixResult<HttpResponse> {
    GRADE_SERVICE
        .update_assessment(assessment_id.0, body.into_inner(), &req)
        .await
}

pub async fn delete_assessment(
    req: HttpRequest,
    assessment_id: SafeIDI64,
) -> ActixResult<HttpResponse> {
    GRADE_SERVICE.delete_assessment(assessment_id.0, &req).await
}

pub async fn list_grades(req: HttpRequest, assessment_id: SafeIDI64) -> ActixResult<HttpResponse> {
    GRADE_SERVICE.list_grades(assessment_id.0, &req).await
}

// 批量录入成绩
pub async fn upsert_grades(
    req: HttpRequest,
    assessment_id: SafeIDI64,
    body: web::Json<UpsertGradesRequest>,
) -> ActixResult<HttpResponse> {
    GRADE_SERVICE
        .upsert_grades(assessment_id.0, body.into_inner(), &req)
        .await
}

// 配置路由
pub fn configure_assessment_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/assessments")
            .wrap(middlewares::RequireJWT)
            .service(
                // 是否任课教师在业务层检查
                web::scope("")
                    .wrap(middlewares::RequireRole::new_any(UserRole::staff_roles()))
                    .route("", web::get().to(list_assessments))
                    .route("", web::post().to(create_assessment))
                    .route("/{id}", web::put().to(update_assessment))
                    .route("/{id}", web::delete().to(delete_assessment))
                    .route("/{id}/grades", web::get().to(list_grades))
                    .route("/{id}/grades", web::put().to(upsert_grades)),
            ),
    );
}
