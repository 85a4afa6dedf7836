pub mod manage;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::materials::requests::{
    CreateMaterialRequest, MaterialListParams, UpdateMaterialRequest,
};
use crate::storage::Storage;

pub struct MaterialService {
    storage: Option<Arc<dyn Storage>>,
}

impl MaterialService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        if let Some(storage) = &self.storage {
            storage.clone()
        } else {
            request
                .app_data::<actix_web::web::Data<Arc<dyn Storage>>>()
                .expect("Storage not found in app data")
                .get_ref()
                .clone()
        }
    }

    pub async fn create_material(
        &self,
        body: CreateMaterialRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        manage::create_material(self, body, request).await
    }

    pub async fn list_materials(
        &self,
        query: MaterialListParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        manage::list_materials(self, query, request).await
    }

    pub async fn get_material(&self, id: i64, request: &HttpRequest) -> ActixResult<HttpResponse> {
        manage::get_material(self, id, request).await
    }

    pub async fn update_material(
        &self,
        id: i64,
        body: UpdateMaterialRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        manage::update_material(self, id, body, request).await
    }

    pub async fn delete_material(
        &self,
        id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        manage::delete_material(self, id, request).await
    }
}
