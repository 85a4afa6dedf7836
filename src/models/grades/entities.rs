use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// 评估（考试、作业等），属于某个科目的某个学期
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct Assessment {
    pub id: i64,
    pub subject_id: i64,
    pub title: String,
    /// 学期序号，从 1 开始
    pub term: i32,
    pub max_score: f64,
    pub applied_on: Option<NaiveDate>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// 每个学生在每个评估上至多一条成绩
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct Grade {
    pub id: i64,
    pub assessment_id: i64,
    pub student_id: i64,
    pub score: f64,
    pub comment: Option<String>,
    pub graded_by: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// 成绩单中单个学期的平均分（满分 10 分制）
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct TermAverage {
    pub term: i32,
    pub average: f64,
    pub assessments: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct SubjectReport {
    pub subject_id: i64,
    pub subject_name: String,
    pub terms: Vec<TermAverage>,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/grade.ts")]
pub struct ReportCard {
    pub student_id: i64,
    pub student_name: String,
    pub class_name: Option<String>,
    pub subjects: Vec<SubjectReport>,
    pub overall_average: Option<f64>,
}
