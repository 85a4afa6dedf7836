use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

crate::string_enum! {
    pub enum AttendanceStatus export "../frontend/src/types/generated/attendance.ts" {
        Present => "present",
        Absent => "absent",
        Late => "late",
        Excused => "excused",
    }
}

/// 同一学生、日期、科目（可为空）只有一条记录
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub struct AttendanceRecord {
    pub id: i64,
    pub student_id: i64,
    pub class_name: String,
    pub subject_id: Option<i64>,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub note: Option<String>,
    pub recorded_by: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// 出勤统计；迟到计为出勤，请假不计入分母
#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub struct AttendanceSummary {
    pub total: u64,
    pub present: u64,
    pub absent: u64,
    pub late: u64,
    pub excused: u64,
    /// 0 到 100 的百分比，保留一位小数；没有可计算记录时为空
    pub attendance_rate: Option<f64>,
}

impl AttendanceSummary {
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = AttendanceStatus>,
    {
        let mut summary = Self::default();
        for status in statuses {
            summary.total += 1;
            match status {
                AttendanceStatus::Present => summary.present += 1,
                AttendanceStatus::Absent => summary.absent += 1,
                AttendanceStatus::Late => summary.late += 1,
                AttendanceStatus::Excused => summary.excused += 1,
            }
        }

        let counted = summary.total - summary.excused;
        summary.attendance_rate = (counted > 0).then(|| {
            let rate = (summary.present + summary.late) as f64 / counted as f64 * 100.0;
            (rate * 10.0).round() / 10.0
        });
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AttendanceStatus::*;

    #[test]
    fn test_summary_counts_and_rate() {
        let summary = AttendanceSummary::from_statuses([Present, Present, Late, Absent, Excused]);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.present, 2);
        assert_eq!(summary.late, 1);
        assert_eq!(summary.absent, 1);
        assert_eq!(summary.excused, 1);
        assert_eq!(summary.attendance_rate, Some(75.0));
    }

    #[test]
    fn test_summary_rounding() {
        let summary = AttendanceSummary::from_statuses([Present, Present, Absent]);
        assert_eq!(summary.attendance_rate, Some(66.7));
    }

    #[test]
    fn test_summary_without_countable_records() {
        assert_eq!(AttendanceSummary::from_statuses([]).attendance_rate, None);
        assert_eq!(
            AttendanceSummary::from_statuses([Excused]).attendance_rate,
            None
        );
    }
}
