use serde::Deserialize;
use ts_rs::TS;

use super::entities::Shift;
use crate::models::common::PaginationQuery;

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/class.ts")]
pub struct CreateClassRequest {
    pub name: String,
    pub grade_level: Option<String>,
    pub shift: Shift,
    pub school_year: i32,
    pub homeroom_teacher_id: Option<i64>,
}

/// 改名会同步更新按名称引用该班级的学生、科目、公告和资料
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/class.ts")]
pub struct UpdateClassRequest {
    pub name: Option<String>,
    pub grade_level: Option<String>,
    pub shift: Option<Shift>,
    pub school_year: Option<i32>,
    pub homeroom_teacher_id: Option<i64>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/class.ts")]
pub struct ClassListParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    pub school_year: Option<i32>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ClassListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub school_year: Option<i32>,
    pub search: Option<String>,
}

impl From<ClassListParams> for ClassListQuery {
    fn from(params: ClassListParams) -> Self {
        Self {
            page: Some(params.pagination.page),
            size: Some(params.pagination.size),
            school_year: params.school_year,
            search: params.search,
        }
    }
}
