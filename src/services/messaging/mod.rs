pub mod broadcast;
pub mod broadcasts;
pub mod control;
pub mod direct;
pub mod email;
pub mod recipients;
pub mod send;
pub mod whatsapp;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::messaging::requests::{
    BroadcastListParams, CreateBroadcastRequest, RecipientListParams, SendEmailRequest,
    SendWhatsAppRequest,
};
use crate::storage::Storage;

/// 群发控制动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastAction {
    Pause,
    Resume,
    Stop,
    RetryFailed,
}

pub struct MessagingService {
    storage: Option<Arc<dyn Storage>>,
}

impl MessagingService {
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

    pub async fn send_whatsapp(
        &self,
        body: SendWhatsAppRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        send::send_whatsapp(body, request).await
    }

    pub async fn send_email(
        &self,
        body: SendEmailRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        send::send_email(body, request).await
    }

    pub async fn create_broadcast(
        &self,
        body: CreateBroadcastRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        broadcasts::create_broadcast(self, body, request).await
    }

    pub async fn list_broadcasts(
        &self,
        query: BroadcastListParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        broadcasts::list_broadcasts(self, query, request).await
    }

    pub async fn get_broadcast(&self, id: i64, request: &HttpRequest) -> ActixResult<HttpResponse> {
        broadcasts::get_broadcast(self, id, request).await
    }

    pub async fn list_recipients(
        &self,
        id: i64,
        query: RecipientListParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        broadcasts::list_recipients(self, id, query, request).await
    }

    // 暂停 / 恢复 / 停止 / 重试失败
    pub async fn control_broadcast(
        &self,
        id: i64,
        action: BroadcastAction,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        broadcasts::control_broadcast(self, id, action, request).await
    }
}
