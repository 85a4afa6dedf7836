//! 支付网关抽象
//!
//! 业务代码只依赖 `PaymentGateway`，Asaas 与 Mercado Pago 各自实现。

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::Result;
use crate::models::payments::entities::{PaymentProvider, PaymentStatus};

/// 付款人信息
#[derive(Debug, Clone)]
pub struct ChargeCustomer {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChargeRequest {
    /// 本地收款 ID，作为 externalReference 回传
    pub payment_id: i64,
    pub customer: ChargeCustomer,
    pub amount_cents: i64,
    pub description: String,
    pub due_date: NaiveDate,
    pub billing_type: Option<String>,
}

/// 网关创建的收款
#[derive(Debug, Clone, PartialEq)]
pub struct Charge {
    pub external_id: String,
    pub payment_url: Option<String>,
}

/// 网关侧查询到的支付状态
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayPaymentStatus {
    /// 无法映射的状态为空
    pub status: Option<PaymentStatus>,
    pub external_reference: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge>;

    async fn fetch_status(&self, external_id: &str) -> Result<GatewayPaymentStatus>;
}
