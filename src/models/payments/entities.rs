use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

crate::string_enum! {
    pub enum PaymentKind export "../frontend/src/types/generated/payment.ts" {
        Enrollment => "enrollment",
        Tuition => "tuition",
        Other => "other",
    }
}

crate::string_enum! {
    pub enum PaymentStatus export "../frontend/src/types/generated/payment.ts" {
        Pending => "pending",
        Paid => "paid",
        Overdue => "overdue",
        Cancelled => "cancelled",
        Refunded => "refunded",
    }
}

impl PaymentStatus {
    /// 仍可收款或取消
    pub fn is_open(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Overdue)
    }
}

crate::string_enum! {
    /// 收款渠道；manual 为线下收款
    pub enum PaymentProvider export "../frontend/src/types/generated/payment.ts" {
        Asaas => "asaas",
        MercadoPago => "mercado_pago",
        Manual => "manual",
    }
}

/// 金额一律以分为单位的整数保存
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/payment.ts")]
pub struct Payment {
    pub id: i64,
    pub student_id: i64,
    pub description: String,
    pub kind: PaymentKind,
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
    pub provider: PaymentProvider,
    /// 网关侧的收款 ID（Asaas payment id / Mercado Pago preference id）
    pub external_id: Option<String>,
    pub payment_url: Option<String>,
    pub billing_type: Option<String>,
    pub paid_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// 分转为网关使用的十进制金额
pub fn cents_to_decimal(cents: i64) -> f64 {
    cents as f64 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cents_to_decimal() {
        assert_eq!(cents_to_decimal(15000), 150.0);
        assert_eq!(cents_to_decimal(1999), 19.99);
    }

    #[test]
    fn test_open_statuses() {
        assert!(PaymentStatus::Pending.is_open());
        assert!(PaymentStatus::Overdue.is_open());
        assert!(!PaymentStatus::Paid.is_open());
        assert!(!PaymentStatus::Cancelled.is_open());
    }

    #[test]
    fn test_provider_strings() {
        assert_eq!(PaymentProvider::MercadoPago.as_str(), "mercado_pago");
        assert_eq!("asaas".parse::<PaymentProvider>(), Ok(PaymentProvider::Asaas));
    }
}
