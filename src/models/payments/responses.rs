use serde::Serialize;
use ts_rs::TS;

use super::entities::{Payment, PaymentStatus};
use crate::models::common::PaginationInfo;

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/payment.ts")]
pub struct PaymentResponse {
    pub payment: Payment,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/payment.ts")]
pub struct PaymentListResponse {
    pub items: Vec<Payment>,
    pub pagination: PaginationInfo,
}

/// 回调处理结果
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(tag = "outcome", rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/payment.ts")]
pub enum SettlementOutcome {
    /// 本次将收款标记为已支付
    Settled { payment_id: i64, student_approved: bool },
    /// 收款此前已结清，重复回调
    AlreadySettled { payment_id: i64 },
    StatusUpdated { payment_id: i64, status: PaymentStatus },
    /// 找不到对应收款，记录日志后确认
    UnknownPayment,
    /// 与收款状态无关的事件
    Ignored,
}

/// 学生门户中的本人收款
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/payment.ts")]
pub struct StudentPaymentsResponse {
    pub items: Vec<Payment>,
}
