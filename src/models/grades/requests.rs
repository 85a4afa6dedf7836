use chrono::NaiveDate;
use serde::Deserialize;
use ts_rs::TS;

use crate::models::common::PaginationQuery;

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct CreateAssessmentRequest {
    pub subject_id: i64,
    pub title: String,
    pub term: i32,
    pub max_score: f64,
    pub applied_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct UpdateAssessmentRequest {
    pub title: Option<String>,
    pub term: Option<i32>,
    pub max_score: Option<f64>,
    pub applied_on: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct AssessmentListParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    pub subject_id: Option<i64>,
    pub term: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct GradeEntry {
    pub student_id: i64,
    pub score: f64,
    pub comment: Option<String>,
}

/// 批量录入成绩，已存在的记录会被覆盖
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct UpsertGradesRequest {
    pub grades: Vec<GradeEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct AssessmentListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub subject_id: Option<i64>,
    /// 教师只能看到自己任教科目的评估
    pub subject_ids: Option<Vec<i64>>,
    pub term: Option<i32>,
}
