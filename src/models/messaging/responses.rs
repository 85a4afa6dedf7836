use serde::Serialize;
use ts_rs::TS;

use super::entities::{Broadcast, BroadcastRecipient};
use crate::models::common::PaginationInfo;

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/messaging.ts")]
pub struct WhatsAppSendResponse {
    pub phone: String,
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/messaging.ts")]
pub struct EmailSendResponse {
    pub id: String,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/messaging.ts")]
pub struct BroadcastResponse {
    pub broadcast: Broadcast,
    /// 号码无效或重复而被跳过的数量（仅创建时）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<usize>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/messaging.ts")]
pub struct BroadcastListResponse {
    pub items: Vec<Broadcast>,
    pub pagination: PaginationInfo,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/messaging.ts")]
pub struct RecipientListResponse {
    pub items: Vec<BroadcastRecipient>,
}
