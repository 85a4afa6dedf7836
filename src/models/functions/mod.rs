//! `/functions/v1/*` 的请求体
//!
//! 边缘函数接口与前端旧调用方式保持一致，响应统一使用 `FunctionResponse`。

use serde::Deserialize;
use ts_rs::TS;

use crate::models::students::requests::ApprovalAction;

pub use crate::models::messaging::requests::{SendEmailRequest, SendWhatsAppRequest};
pub use crate::models::payments::requests::{AsaasWebhookPayload, CreatePaymentRequest};

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/functions.ts")]
pub struct ApproveStudentFunctionRequest {
    pub student_id: i64,
    #[serde(default = "default_action")]
    pub action: ApprovalAction,
    pub reason: Option<String>,
}

fn default_action() -> ApprovalAction {
    ApprovalAction::Approve
}
