//! 测试用的外部服务替身

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use super::integrations::Integrations;
use super::messaging::broadcast::RunSignal;
use super::messaging::email::{EmailSender, OutgoingEmail};
use super::messaging::whatsapp::{WhatsAppReceipt, WhatsAppSender};
use super::payments::gateway::{Charge, ChargeRequest, GatewayPaymentStatus, PaymentGateway};
use crate::errors::{PortalError, Result};
use crate::models::payments::entities::PaymentProvider;
use crate::models::users::entities::{User, UserRole, UserStatus};
use crate::models::users::requests::NewUser;
use crate::storage::Storage;
use crate::storage::sea_orm_storage::SeaOrmStorage;
use crate::utils::password::hash_password;

pub(crate) async fn memory_storage() -> Arc<dyn Storage> {
    Arc::new(SeaOrmStorage::new_in_memory().await.unwrap())
}

/// 密码统一为 `Senha@2025`，邮箱为 `<username>@escola.test`
pub(crate) async fn seed_user(
    storage: &Arc<dyn Storage>,
    username: &str,
    role: UserRole,
    status: UserStatus,
) -> User {
    storage
        .create_user(NewUser {
            username: username.to_string(),
            email: format!("{username}@escola.test"),
            password_hash: hash_password("Senha@2025").unwrap(),
            role,
            status,
            display_name: None,
            phone: None,
        })
        .await
        .unwrap()
}

/// 模拟经过 RequireJWT 的请求；`integrations` 为空时不注入
pub(crate) fn request_as(
    storage: &Arc<dyn Storage>,
    user: Option<&User>,
    integrations: Option<Arc<Integrations>>,
) -> actix_web::HttpRequest {
    use actix_web::{HttpMessage, test::TestRequest, web};

    let mut builder = TestRequest::default().app_data(web::Data::new(storage.clone()));
    if let Some(integrations) = integrations {
        builder = builder.app_data(web::Data::new(integrations));
    }
    let req = builder.to_http_request();
    if let Some(user) = user {
        req.extensions_mut().insert(user.clone());
    }
    req
}

pub(crate) async fn json_body(resp: actix_web::HttpResponse) -> serde_json::Value {
    let bytes = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// 记录发送过的号码；可指定失败号码和发送第 N 条后触发的信号
pub(crate) struct FakeSender {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail_phones: Vec<String>,
    pub trigger: Option<(usize, RunSignal, Arc<watch::Sender<RunSignal>>)>,
}

impl FakeSender {
    pub(crate) fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_phones: Vec::new(),
            trigger: None,
        }
    }

    pub(crate) fn phones(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(phone, _)| phone.clone())
            .collect()
    }
}

#[async_trait]
impl WhatsAppSender for FakeSender {
    async fn send_text(&self, phone: &str, message: &str) -> Result<WhatsAppReceipt> {
        let count = {
            let mut sent = self.sent.lock().unwrap();
            sent.push((phone.to_string(), message.to_string()));
            sent.len()
        };
        if let Some((after, signal, tx)) = &self.trigger
            && count == *after
        {
            let _ = tx.send(*signal);
        }
        if self.fail_phones.iter().any(|p| p == phone) {
            return Err(PortalError::external_service("number not on WhatsApp"));
        }
        Ok(WhatsAppReceipt {
            message_id: Some(format!("msg_{count}")),
        })
    }
}

#[derive(Default)]
pub(crate) struct FakeEmail {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub fail: bool,
}

#[async_trait]
impl EmailSender for FakeEmail {
    async fn send(&self, email: &OutgoingEmail) -> Result<String> {
        if self.fail {
            return Err(PortalError::external_service("Resend returned 500"));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(email.clone());
        Ok(format!("email_{}", sent.len()))
    }
}

pub(crate) struct FakeGateway {
    pub provider: PaymentProvider,
    pub fail: bool,
    pub remote_status: Mutex<Option<GatewayPaymentStatus>>,
    pub charges: Mutex<Vec<ChargeRequest>>,
}

impl FakeGateway {
    pub(crate) fn new(provider: PaymentProvider) -> Self {
        Self {
            provider,
            fail: false,
            remote_status: Mutex::new(None),
            charges: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn provider(&self) -> PaymentProvider {
        self.provider
    }

    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge> {
        if self.fail {
            return Err(PortalError::external_service("gateway unavailable"));
        }
        self.charges.lock().unwrap().push(request.clone());
        Ok(Charge {
            external_id: format!("ext_{}", request.payment_id),
            payment_url: Some(format!("https://pay.test/{}", request.payment_id)),
        })
    }

    async fn fetch_status(&self, _external_id: &str) -> Result<GatewayPaymentStatus> {
        self.remote_status
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PortalError::external_service("payment not found"))
    }
}

/// 带假邮件、假 WhatsApp 与指定网关的集成集合
pub(crate) fn fake_integrations(
    email: Arc<FakeEmail>,
    whatsapp: Arc<FakeSender>,
    gateways: Vec<Arc<FakeGateway>>,
) -> Integrations {
    let mut integrations = Integrations::new(email).with_whatsapp(whatsapp);
    for gateway in gateways {
        integrations = integrations.with_gateway(gateway);
    }
    integrations
}
