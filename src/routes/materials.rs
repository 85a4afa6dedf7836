use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::materials::requests::{
    CreateMaterialRequest, MaterialListParams, UpdateMaterialRequest,
};
use crate::models::users::entities::UserRole;
use crate::services::MaterialService;
use crate::utils::SafeIDI64;

static MATERIAL_SERVICE: Lazy<MaterialService> = Lazy::new(MaterialService::new_lazy);

pub async fn list_materials(
    req: HttpRequest,
    query: web::Query<MaterialListParams>,
) -> ActixResult<HttpResponse> {
    MATERIAL_SERVICE.list_materials(query.into_inner(), &req).await
}

pub async fn create_material(
    req: HttpRequest,
    body: web::Json<CreateMaterialRequest>,
) -> ActixResult<HttpResponse> {
    MATERIAL_SERVICE.create_material(body.into_inner(), &req).await
}

pub async fn get_material(req: HttpRequest, material_id: SafeIDI64) -> ActixResult<HttpResponse> {
    MATERIAL_SERVICE.get_material(material_id.0, &req).await
}

pub async fn update_material(
    req: HttpRequest,
    material_id: SafeIDI64,
    body: web::Json<UpdateMaterialRequest>,
) -> ActixResult<HttpResponse> {
    MATERIAL_SERVICE
        .update_material(material_id.0, body.into_inner(), &req)
        .await
}

pub async fn delete_material(
    req: HttpRequest,
    material_id: SafeIDI64,
) -> ActixResult<HttpResponse> {
    MATERIAL_SERVICE.delete_material(material_id.0, &req).await
}

// 学生通过 /portal/materials 查看本班资料
pub fn configure_material_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/materials")
            .wrap(middlewares::RequireJWT)
            .service(
                web::scope("")
                    .wrap(middlewares::RequireRole::new_any(UserRole::staff_roles()))
                    .route("", web::get().to(list_materials))
                    .route("", web::post().to(create_material))
                    .route("/{id}", web::get().to(get_material))
                    .route("/{id}", web::put().to(update_material))
                    .route("/{id}", web::delete().to(delete_material)),
            ),
    );
}
