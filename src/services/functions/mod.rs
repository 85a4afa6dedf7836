//! 边缘函数接口 `/functions/v1/{name}`
//!
//! 请求体自行解析，失败时同样返回 `{ success: false, error }`，HTTP 状态保持 200。

pub mod handlers;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::storage::Storage;

pub struct FunctionService {
    storage: Option<Arc<dyn Storage>>,
}

impl FunctionService {
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

    pub async fn send_whatsapp(&self, body: &[u8], request: &HttpRequest) -> ActixResult<HttpResponse> {
        handlers::send_whatsapp(body, request).await
    }

    pub async fn send_email(&self, body: &[u8], request: &HttpRequest) -> ActixResult<HttpResponse> {
        handlers::send_email(body, request).await
    }

    pub async fn approve_student(
        &self,
        body: &[u8],
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        handlers::approve_student(self, body, request).await
    }

    pub async fn create_payment(
        &self,
        body: &[u8],
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        handlers::create_payment(self, body, request).await
    }

    // 与 REST 回调共用结算流程
    pub async fn asaas_webhook(&self, body: &[u8], request: &HttpRequest) -> ActixResult<HttpResponse> {
        handlers::asaas_webhook(self, body, request).await
    }
}
