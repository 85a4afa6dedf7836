use serde::Deserialize;
use ts_rs::TS;

use crate::models::common::PaginationQuery;

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/material.ts")]
pub struct CreateMaterialRequest {
    pub title: String,
    pub description: Option<String>,
    pub subject_id: Option<i64>,
    pub class_name: String,
    pub file_token: Option<String>,
    pub link_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/material.ts")]
pub struct UpdateMaterialRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject_id: Option<i64>,
    pub file_token: Option<String>,
    pub link_url: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/material.ts")]
pub struct MaterialListParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    pub class_name: Option<String>,
    pub subject_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub title: String,
    pub description: Option<String>,
    pub subject_id: Option<i64>,
    pub class_name: String,
    pub file_token: Option<String>,
    pub link_url: Option<String>,
    pub uploaded_by: i64,
}

#[derive(Debug, Clone, Default)]
pub struct MaterialListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub class_name: Option<String>,
    pub subject_id: Option<i64>,
}

impl From<MaterialListParams> for MaterialListQuery {
    fn from(params: MaterialListParams) -> Self {
        Self {
            page: Some(params.pagination.page),
            size: Some(params.pagination.size),
            class_name: params.class_name,
            subject_id: params.subject_id,
        }
    }
}
