use serde::Deserialize;
use ts_rs::TS;

use super::entities::{BroadcastAudience, RecipientStatus};
use crate::models::common::PaginationQuery;

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/messaging.ts")]
pub struct SendWhatsAppRequest {
    pub phone: String,
    pub message: String,
}

/// `to` 可以是单个地址或地址列表
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/messaging.ts")]
pub struct SendEmailRequest {
    #[serde(alias = "email", deserialize_with = "one_or_many")]
    #[ts(type = "string | string[]")]
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/messaging.ts")]
pub struct CreateBroadcastRequest {
    pub message: String,
    pub audience: BroadcastAudience,
    /// audience 为 class 时必填
    pub class_name: Option<String>,
    /// audience 为 phones 时必填
    pub phones: Option<Vec<String>>,
    pub min_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/messaging.ts")]
pub struct BroadcastListParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/messaging.ts")]
pub struct RecipientListParams {
    pub status: Option<RecipientStatus>,
}

#[derive(Debug, Clone)]
pub struct NewBroadcast {
    pub message: String,
    pub created_by: i64,
    pub min_delay_ms: i64,
    pub max_delay_ms: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipient {
    pub student_id: Option<i64>,
    pub name: Option<String>,
    pub phone: String,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}
