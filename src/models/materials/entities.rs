use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// 学习资料：上传的文件或外部链接，至少其一
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/material.ts")]
pub struct Material {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub subject_id: Option<i64>,
    pub class_name: String,
    pub file_token: Option<String>,
    pub link_url: Option<String>,
    pub uploaded_by: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
