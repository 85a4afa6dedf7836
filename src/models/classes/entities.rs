use serde::{Deserialize, Serialize};
use ts_rs::TS;

crate::string_enum! {
    /// 上课时段
    pub enum Shift export "../frontend/src/types/generated/class.ts" {
        Morning => "morning",
        Afternoon => "afternoon",
        Evening => "evening",
        FullTime => "full_time",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/class.ts")]
pub struct Class {
    pub id: i64,
    /// 班级名唯一，学生、科目等按名称关联
    pub name: String,
    pub grade_level: Option<String>,
    pub shift: Shift,
    pub school_year: i32,
    pub homeroom_teacher_id: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
