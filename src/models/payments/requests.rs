use chrono::NaiveDate;
use serde::Deserialize;
use ts_rs::TS;

use super::entities::{PaymentKind, PaymentProvider, PaymentStatus};
use crate::models::common::PaginationQuery;

/// 为学生创建收款
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/payment.ts")]
pub struct CreatePaymentRequest {
    pub student_id: i64,
    pub amount_cents: i64,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub kind: Option<PaymentKind>,
    /// 缺省时使用系统设置中的默认渠道
    pub provider: Option<PaymentProvider>,
    /// Asaas 收款方式：BOLETO / PIX / CREDIT_CARD / UNDEFINED
    pub billing_type: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/payment.ts")]
pub struct PaymentListParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    pub status: Option<PaymentStatus>,
    pub student_id: Option<i64>,
    pub provider: Option<PaymentProvider>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub student_id: i64,
    pub description: String,
    pub kind: PaymentKind,
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    pub provider: PaymentProvider,
    pub billing_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PaymentListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub status: Option<PaymentStatus>,
    pub student_id: Option<i64>,
    pub provider: Option<PaymentProvider>,
}

impl From<PaymentListParams> for PaymentListQuery {
    fn from(params: PaymentListParams) -> Self {
        Self {
            page: Some(params.pagination.page),
            size: Some(params.pagination.size),
            status: params.status,
            student_id: params.student_id,
            provider: params.provider,
        }
    }
}

/// Asaas 回调
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/payment.ts")]
pub struct AsaasWebhookPayload {
    pub event: String,
    pub payment: Option<AsaasWebhookPayment>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/payment.ts")]
#[serde(rename_all = "camelCase")]
pub struct AsaasWebhookPayment {
    pub id: String,
    pub external_reference: Option<String>,
    pub status: Option<String>,
    pub value: Option<f64>,
}

/// Mercado Pago 回调，只携带支付 ID，状态需要回查
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/payment.ts")]
pub struct MercadoPagoWebhookPayload {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub action: Option<String>,
    pub data: Option<MercadoPagoWebhookData>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/payment.ts")]
pub struct MercadoPagoWebhookData {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct MercadoPagoWebhookQuery {
    pub secret: Option<String>,
}

// Mercado Pago 的 data.id 可能是数字也可能是字符串
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid id: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mercado_pago_numeric_id() {
        let payload: MercadoPagoWebhookPayload =
            serde_json::from_str(r#"{"type":"payment","data":{"id":123456}}"#).unwrap();
        assert_eq!(payload.data.unwrap().id, "123456");
    }

    #[test]
    fn test_asaas_payload_camel_case() {
        let payload: AsaasWebhookPayload = serde_json::from_str(
            r#"{"event":"PAYMENT_RECEIVED","payment":{"id":"pay_1","externalReference":"42","value":150.0}}"#,
        )
        .unwrap();
        let payment = payload.payment.unwrap();
        assert_eq!(payment.external_reference.as_deref(), Some("42"));
    }
}
