use serde::Serialize;
use ts_rs::TS;

use crate::models::announcements::entities::Announcement;
use crate::models::attendance::entities::AttendanceSummary;
use crate::models::grades::entities::ReportCard;
use crate::models::materials::entities::Material;
use crate::models::payments::entities::Payment;
use crate::models::students::entities::{EnrollmentStatus, Student};
use crate::models::subjects::entities::Subject;
use crate::models::teachers::entities::Teacher;

#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/dashboard.ts")]
pub struct StudentCounts {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub total: u64,
}

impl StudentCounts {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (EnrollmentStatus, u64)>,
    {
        let mut counts = Self::default();
        for (status, n) in pairs {
            match status {
                EnrollmentStatus::Pending => counts.pending += n,
                EnrollmentStatus::Approved => counts.approved += n,
                EnrollmentStatus::Rejected => counts.rejected += n,
            }
            counts.total += n;
        }
        counts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/dashboard.ts")]
pub struct PaymentCounts {
    pub pending: u64,
    pub overdue: u64,
    /// 本月已收金额（分）
    pub received_this_month_cents: i64,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/dashboard.ts")]
pub struct AdminDashboard {
    pub students: StudentCounts,
    pub teachers: u64,
    pub classes: u64,
    pub subjects: u64,
    pub payments: PaymentCounts,
    pub active_broadcasts: u64,
    pub latest_announcements: Vec<Announcement>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/dashboard.ts")]
pub struct TeacherDashboard {
    pub teacher: Teacher,
    pub subjects: Vec<Subject>,
    pub assessments: u64,
    pub latest_announcements: Vec<Announcement>,
}

/// 学生门户首页
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/dashboard.ts")]
pub struct StudentPortal {
    pub student: Student,
    pub report_card: ReportCard,
    pub attendance: AttendanceSummary,
    pub open_payments: Vec<Payment>,
    pub latest_announcements: Vec<Announcement>,
    pub latest_materials: Vec<Material>,
}
