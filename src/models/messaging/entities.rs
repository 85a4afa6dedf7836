use serde::{Deserialize, Serialize};
use ts_rs::TS;

crate::string_enum! {
    pub enum BroadcastStatus export "../frontend/src/types/generated/messaging.ts" {
        Running => "running",
        Paused => "paused",
        Stopped => "stopped",
        Completed => "completed",
    }
}

impl BroadcastStatus {
    /// 已结束的群发不再接受暂停或恢复
    pub fn is_finished(&self) -> bool {
        matches!(self, BroadcastStatus::Stopped | BroadcastStatus::Completed)
    }
}

crate::string_enum! {
    pub enum RecipientStatus export "../frontend/src/types/generated/messaging.ts" {
        Pending => "pending",
        Sent => "sent",
        Failed => "failed",
    }
}

crate::string_enum! {
    /// 群发对象
    pub enum BroadcastAudience export "../frontend/src/types/generated/messaging.ts" {
        /// 已审核通过的学生
        AllStudents => "all_students",
        Class => "class",
        PendingStudents => "pending_students",
        /// 直接给出的号码列表
        Phones => "phones",
    }
}

/// WhatsApp 群发任务
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/messaging.ts")]
pub struct Broadcast {
    pub id: i64,
    pub message: String,
    pub status: BroadcastStatus,
    pub total: i32,
    pub sent: i32,
    pub failed: i32,
    pub created_by: i64,
    pub min_delay_ms: i64,
    pub max_delay_ms: i64,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Broadcast {
    pub fn pending(&self) -> i32 {
        (self.total - self.sent - self.failed).max(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/messaging.ts")]
pub struct BroadcastRecipient {
    pub id: i64,
    pub broadcast_id: i64,
    pub student_id: Option<i64>,
    pub name: Option<String>,
    /// 规范化后的号码
    pub phone: String,
    pub status: RecipientStatus,
    pub error: Option<String>,
    pub sent_at: Option<chrono::DateTime<chrono::Utc>>,
}
