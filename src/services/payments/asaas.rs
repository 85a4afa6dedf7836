//! Asaas 客户端
//!
//! 先按邮箱查找客户，不存在则创建，再为客户创建收款。请求头 `access_token` 携带 API Key。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::gateway::{Charge, ChargeCustomer, ChargeRequest, GatewayPaymentStatus, PaymentGateway};
use crate::config::AsaasConfig;
use crate::errors::{PortalError, Result};
use crate::models::payments::entities::{PaymentProvider, PaymentStatus, cents_to_decimal};
use crate::utils::http::{ensure_success, join_url};

pub struct AsaasGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    default_billing_type: String,
}

#[derive(Debug, Deserialize)]
struct AsaasCustomer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AsaasCustomerList {
    #[serde(default)]
    data: Vec<AsaasCustomer>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewAsaasCustomer<'a> {
    name: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mobile_phone: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewAsaasPayment<'a> {
    customer: &'a str,
    billing_type: &'a str,
    value: f64,
    due_date: String,
    description: &'a str,
    external_reference: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AsaasPayment {
    id: String,
    invoice_url: Option<String>,
    status: Option<String>,
    external_reference: Option<String>,
}

/// Asaas 收款状态映射
pub fn map_asaas_status(status: &str) -> Option<PaymentStatus> {
    match status {
        "PENDING" | "AWAITING_RISK_ANALYSIS" => Some(PaymentStatus::Pending),
        "RECEIVED" | "CONFIRMED" | "RECEIVED_IN_CASH" => Some(PaymentStatus::Paid),
        "OVERDUE" => Some(PaymentStatus::Overdue),
        "REFUNDED" | "REFUND_REQUESTED" | "CHARGEBACK_REQUESTED" => Some(PaymentStatus::Refunded),
        "DELETED" => Some(PaymentStatus::Cancelled),
        _ => None,
    }
}

impl AsaasGateway {
    pub fn new(client: reqwest::Client, config: &AsaasConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            default_billing_type: config.default_billing_type.clone(),
        }
    }

    async fn find_or_create_customer(&self, customer: &ChargeCustomer) -> Result<String> {
        let response = self
            .client
            .get(join_url(&self.base_url, "/v3/customers"))
            .header("access_token", &self.api_key)
            .query(&[("email", customer.email.as_str())])
            .send()
            .await?;
        let existing: AsaasCustomerList = ensure_success("Asaas", response).await?.json().await?;

        if let Some(found) = existing.data.into_iter().next() {
            debug!("Reusing Asaas customer {} for {}", found.id, customer.email);
            return Ok(found.id);
        }

        let response = self
            .client
            .post(join_url(&self.base_url, "/v3/customers"))
            .header("access_token", &self.api_key)
            .json(&NewAsaasCustomer {
                name: &customer.name,
                email: &customer.email,
                mobile_phone: customer.phone.as_deref(),
            })
            .send()
            .await?;
        let created: AsaasCustomer = ensure_success("Asaas", response).await?.json().await?;
        Ok(created.id)
    }
}

#[async_trait]
impl PaymentGateway for AsaasGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Asaas
    }

    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge> {
        let customer_id = self.find_or_create_customer(&request.customer).await?;

        let billing_type = request
            .billing_type
            .as_deref()
            .unwrap_or(&self.default_billing_type);

        let response = self
            .client
            .post(join_url(&self.base_url, "/v3/payments"))
            .header("access_token", &self.api_key)
            .json(&NewAsaasPayment {
                customer: &customer_id,
                billing_type,
                value: cents_to_decimal(request.amount_cents),
                due_date: request.due_date.format("%Y-%m-%d").to_string(),
                description: &request.description,
                external_reference: request.payment_id.to_string(),
            })
            .send()
            .await?;
        let payment: AsaasPayment = ensure_success("Asaas", response).await?.json().await?;

        Ok(Charge {
            external_id: payment.id,
            payment_url: payment.invoice_url,
        })
    }

    async fn fetch_status(&self, external_id: &str) -> Result<GatewayPaymentStatus> {
        if external_id.is_empty() {
            return Err(PortalError::validation("Missing Asaas payment id"));
        }
        let response = self
            .client
            .get(join_url(&self.base_url, &format!("/v3/payments/{external_id}")))
            .header("access_token", &self.api_key)
            .send()
            .await?;
        let payment: AsaasPayment = ensure_success("Asaas", response).await?.json().await?;

        Ok(GatewayPaymentStatus {
            status: payment.status.as_deref().and_then(map_asaas_status),
            external_reference: payment.external_reference,
        })
    }
}
