use serde::{Deserialize, Serialize};
use ts_rs::TS;

crate::string_enum! {
    /// 用户角色
    pub enum UserRole export "../frontend/src/types/generated/user.ts" {
        Student => "student",
        Teacher => "teacher",
        Admin => "admin",
    }
}

impl UserRole {
    pub fn admin_roles() -> &'static [UserRole] {
        &[UserRole::Admin]
    }

    /// 教师及以上
    pub fn staff_roles() -> &'static [UserRole] {
        &[UserRole::Teacher, UserRole::Admin]
    }

    pub fn student_roles() -> &'static [UserRole] {
        &[UserRole::Student]
    }
}

crate::string_enum! {
    /// 账号状态；报名待审核的学生为 pending
    pub enum UserStatus export "../frontend/src/types/generated/user.ts" {
        Active => "active",
        Pending => "pending",
        Inactive => "inactive",
        Suspended => "suspended",
    }
}

// 用户实体
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/user.ts")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub last_login: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_and_error() {
        assert_eq!("teacher".parse::<UserRole>(), Ok(UserRole::Teacher));
        assert_eq!(UserRole::Admin.to_string(), "admin");
        let err = "user".parse::<UserRole>().unwrap_err();
        assert!(err.contains("student, teacher, admin"));
    }

    #[test]
    fn test_status_serde() {
        let status: UserStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(status, UserStatus::Pending);
        assert_eq!(serde_json::to_string(&UserStatus::Suspended).unwrap(), "\"suspended\"");
    }
}
