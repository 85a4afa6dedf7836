//! 外部服务集合
//!
//! 启动时按配置创建支付网关与消息客户端，作为 `app_data` 注入；
//! 测试中可以直接组装假的实现。

use actix_web::{HttpRequest, web};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::messaging::broadcast::BroadcastRegistry;
use super::messaging::email::{EmailSender, ResendClient};
use super::messaging::whatsapp::{WhatsAppSender, ZApiClient};
use super::payments::asaas::AsaasGateway;
use super::payments::gateway::PaymentGateway;
use super::payments::mercado_pago::MercadoPagoGateway;
use crate::config::AppConfig;
use crate::errors::{PortalError, Result};
use crate::models::payments::entities::PaymentProvider;
use crate::utils::http::build_http_client;

pub struct Integrations {
    gateways: HashMap<PaymentProvider, Arc<dyn PaymentGateway>>,
    whatsapp: Option<Arc<dyn WhatsAppSender>>,
    email: Arc<dyn EmailSender>,
    broadcasts: Arc<BroadcastRegistry>,
}

impl Integrations {
    pub fn new(email: Arc<dyn EmailSender>) -> Self {
        Self {
            gateways: HashMap::new(),
            whatsapp: None,
            email,
            broadcasts: Arc::new(BroadcastRegistry::new()),
        }
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.insert(gateway.provider(), gateway);
        self
    }

    pub fn with_whatsapp(mut self, sender: Arc<dyn WhatsAppSender>) -> Self {
        self.whatsapp = Some(sender);
        self
    }

    /// 只创建已配置凭据的网关；邮件客户端始终创建，密钥可在运行时设置
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let payments_client = build_http_client(config.payments.request_timeout)?;
        let messaging_client = build_http_client(config.messaging.request_timeout)?;

        let mut integrations = Self::new(Arc::new(ResendClient::new(
            messaging_client.clone(),
            &config.messaging.resend,
        )));

        if config.payments.asaas.is_configured() {
            integrations = integrations.with_gateway(Arc::new(AsaasGateway::new(
                payments_client.clone(),
                &config.payments.asaas,
            )));
            info!("Asaas gateway enabled");
        }
        if config.payments.mercado_pago.is_configured() {
            integrations = integrations.with_gateway(Arc::new(MercadoPagoGateway::new(
                payments_client,
                &config.payments.mercado_pago,
                &config.app.public_url,
            )));
            info!("Mercado Pago gateway enabled");
        }
        if integrations.gateways.is_empty() {
            warn!("No payment gateway configured, charges can only be settled manually");
        }

        if config.messaging.zapi.is_configured() {
            integrations = integrations.with_whatsapp(Arc::new(ZApiClient::new(
                messaging_client,
                &config.messaging.zapi,
            )));
            info!("Z-API WhatsApp sender enabled");
        } else {
            warn!("Z-API is not configured, WhatsApp sending is disabled");
        }

        Ok(integrations)
    }

    pub fn gateway(&self, provider: PaymentProvider) -> Result<Arc<dyn PaymentGateway>> {
        self.gateways.get(&provider).cloned().ok_or_else(|| {
            PortalError::configuration(format!("Payment provider '{provider}' is not configured"))
        })
    }

    pub fn has_gateway(&self, provider: PaymentProvider) -> bool {
        self.gateways.contains_key(&provider)
    }

    pub fn whatsapp(&self) -> Result<Arc<dyn WhatsAppSender>> {
        self.whatsapp
            .clone()
            .ok_or_else(|| PortalError::configuration("WhatsApp sender (Z-API) is not configured"))
    }

    pub fn email(&self) -> Arc<dyn EmailSender> {
        self.email.clone()
    }

    pub fn broadcasts(&self) -> &Arc<BroadcastRegistry> {
        &self.broadcasts
    }
}

pub(crate) fn get_integrations(request: &HttpRequest) -> Arc<Integrations> {
    request
        .app_data::<web::Data<Arc<Integrations>>>()
        .expect("Integrations not found in app data")
        .get_ref()
        .clone()
}
