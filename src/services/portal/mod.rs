pub mod overview;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::announcements::requests::AnnouncementListParams;
use crate::models::materials::requests::MaterialListParams;
use crate::storage::Storage;

/// 学生门户：所有数据都限定为当前登录学生本人
pub struct PortalService {
    storage: Option<Arc<dyn Storage>>,
}

impl PortalService {
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

    pub async fn overview(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        overview::overview(self, request).await
    }

    pub async fn report_card(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        overview::report_card(self, request).await
    }

    pub async fn attendance(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        overview::attendance(self, request).await
    }

    pub async fn payments(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        overview::payments(self, request).await
    }

    pub async fn announcements(
        &self,
        query: AnnouncementListParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        overview::announcements(self, query, request).await
    }

    pub async fn materials(
        &self,
        query: MaterialListParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        overview::materials(self, query, request).await
    }
}
