//! Mercado Pago 客户端
//!
//! 收款通过 Checkout Pro 偏好（preference）创建，付款链接为 `init_point`。
//! 回调只带支付 ID，状态通过 `GET /v1/payments/{id}` 回查。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::gateway::{Charge, ChargeRequest, GatewayPaymentStatus, PaymentGateway};
use crate::config::MercadoPagoConfig;
use crate::errors::Result;
use crate::models::payments::entities::{PaymentProvider, PaymentStatus, cents_to_decimal};
use crate::utils::http::{ensure_success, join_url};

pub struct MercadoPagoGateway {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    notification_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct PreferenceItem<'a> {
    title: &'a str,
    quantity: u32,
    unit_price: f64,
    currency_id: &'static str,
}

#[derive(Debug, Serialize)]
struct PreferencePayer<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct NewPreference<'a> {
    items: Vec<PreferenceItem<'a>>,
    payer: PreferencePayer<'a>,
    external_reference: String,
    date_of_expiration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct Preference {
    id: String,
    init_point: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MercadoPagoPayment {
    status: Option<String>,
    external_reference: Option<String>,
}

pub fn map_mercado_pago_status(status: &str) -> Option<PaymentStatus> {
    match status {
        "approved" => Some(PaymentStatus::Paid),
        "pending" | "in_process" | "authorized" => Some(PaymentStatus::Pending),
        "rejected" | "cancelled" => Some(PaymentStatus::Cancelled),
        "refunded" | "charged_back" => Some(PaymentStatus::Refunded),
        _ => None,
    }
}

impl MercadoPagoGateway {
    /// `public_url` 非空时，偏好中带上回调地址
    pub fn new(client: reqwest::Client, config: &MercadoPagoConfig, public_url: &str) -> Self {
        let notification_url = (!public_url.is_empty()).then(|| {
            let mut url = join_url(public_url, "/api/v1/webhooks/mercado-pago");
            if !config.webhook_secret.is_empty() {
                url.push_str("?secret=");
                url.push_str(&config.webhook_secret);
            }
            url
        });

        Self {
            client,
            base_url: config.base_url.clone(),
            access_token: config.access_token.clone(),
            notification_url,
        }
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::MercadoPago
    }

    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge> {
        let preference = NewPreference {
            items: vec![PreferenceItem {
                title: &request.description,
                quantity: 1,
                unit_price: cents_to_decimal(request.amount_cents),
                currency_id: "BRL",
            }],
            payer: PreferencePayer {
                name: &request.customer.name,
                email: &request.customer.email,
            },
            external_reference: request.payment_id.to_string(),
            date_of_expiration: format!("{}T23:59:59.000-03:00", request.due_date.format("%Y-%m-%d")),
            notification_url: self.notification_url.as_deref(),
        };

        let response = self
            .client
            .post(join_url(&self.base_url, "/checkout/preferences"))
            .bearer_auth(&self.access_token)
            .json(&preference)
            .send()
            .await?;
        let created: Preference = ensure_success("Mercado Pago", response).await?.json().await?;

        Ok(Charge {
            external_id: created.id,
            payment_url: created.init_point,
        })
    }

    async fn fetch_status(&self, external_id: &str) -> Result<GatewayPaymentStatus> {
        let response = self
            .client
            .get(join_url(&self.base_url, &format!("/v1/payments/{external_id}")))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let payment: MercadoPagoPayment =
            ensure_success("Mercado Pago", response).await?.json().await?;

        Ok(GatewayPaymentStatus {
            status: payment.status.as_deref().and_then(map_mercado_pago_status),
            external_reference: payment.external_reference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::payments::gateway::ChargeCustomer;
    use chrono::NaiveDate;
    use httpmock::prelude::*;
    use serde_json::json;

    fn config(base_url: String) -> MercadoPagoConfig {
        MercadoPagoConfig {
            base_url,
            access_token: "TEST-token".to_string(),
            webhook_secret: "s3cret".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_preference() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/checkout/preferences")
                    .header("authorization", "Bearer TEST-token")
                    .json_body_partial(
                        r#"{"external_reference":"7","notification_url":"https://escola.test/api/v1/webhooks/mercado-pago?secret=s3cret"}"#,
                    );
                then.status(201).json_body(json!({
                    "id": "pref_7",
                    "init_point": "https://www.mercadopago.com.br/checkout/v1/redirect?pref_id=pref_7"
                }));
            })
            .await;

        let gateway = MercadoPagoGateway::new(
            reqwest::Client::new(),
            &config(server.base_url()),
            "https://escola.test",
        );
        let charge = gateway
            .create_charge(&ChargeRequest {
                payment_id: 7,
                customer: ChargeCustomer {
                    name: "Bruno".to_string(),
                    email: "bruno@escola.test".to_string(),
                    phone: None,
                },
                amount_cents: 9990,
                description: "Mensalidade março".to_string(),
                due_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
                billing_type: None,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(charge.external_id, "pref_7");
        assert!(charge.payment_url.unwrap().contains("pref_7"));
    }

    #[tokio::test]
    async fn test_fetch_payment_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/payments/123456");
                then.status(200).json_body(json!({
                    "id": 123456,
                    "status": "approved",
                    "external_reference": "7"
                }));
            })
            .await;

        let gateway = MercadoPagoGateway::new(reqwest::Client::new(), &config(server.base_url()), "");
        let status = gateway.fetch_status("123456").await.unwrap();
        assert_eq!(status.status, Some(PaymentStatus::Paid));
        assert_eq!(status.external_reference.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn test_not_found_is_external_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/payments/999");
                then.status(404).json_body(json!({ "message": "Payment not found" }));
            })
            .await;

        let gateway = MercadoPagoGateway::new(reqwest::Client::new(), &config(server.base_url()), "");
        assert!(gateway.fetch_status("999").await.unwrap_err().is_external());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(map_mercado_pago_status("approved"), Some(PaymentStatus::Paid));
        assert_eq!(map_mercado_pago_status("in_process"), Some(PaymentStatus::Pending));
        assert_eq!(map_mercado_pago_status("charged_back"), Some(PaymentStatus::Refunded));
        assert_eq!(map_mercado_pago_status("weird"), None);
    }
}
