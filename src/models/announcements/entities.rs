use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::users::entities::UserRole;

crate::string_enum! {
    /// 公告受众
    pub enum Audience export "../frontend/src/types/generated/announcement.ts" {
        All => "all",
        Students => "students",
        Teachers => "teachers",
        /// 仅指定班级的学生（以及全体教师）
        Class => "class",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/announcement.ts")]
pub struct Announcement {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub audience: Audience,
    pub class_name: Option<String>,
    pub pinned: bool,
    pub author_id: i64,
    pub published_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// 读者可见范围
#[derive(Debug, Clone, PartialEq)]
pub enum AnnouncementVisibility {
    Everything,
    Restricted {
        audiences: Vec<Audience>,
        /// 可见的班级公告（学生所在班级）；为空表示不额外可见
        class_name: Option<String>,
    },
}

impl AnnouncementVisibility {
    pub fn for_reader(role: UserRole, class_name: Option<String>) -> Self {
        match role {
            UserRole::Admin => Self::Everything,
            UserRole::Teacher => Self::Restricted {
                audiences: vec![Audience::All, Audience::Teachers, Audience::Class],
                class_name: None,
            },
            UserRole::Student => Self::Restricted {
                audiences: vec![Audience::All, Audience::Students],
                class_name,
            },
        }
    }

    pub fn can_see(&self, announcement: &Announcement) -> bool {
        match self {
            Self::Everything => true,
            Self::Restricted {
                audiences,
                class_name,
            } => {
                audiences.contains(&announcement.audience)
                    || (announcement.audience == Audience::Class
                        && class_name.is_some()
                        && announcement.class_name == *class_name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn announcement(audience: Audience, class_name: Option<&str>) -> Announcement {
        let now = chrono::Utc::now();
        Announcement {
            id: 1,
            title: "t".into(),
            content: "c".into(),
            audience,
            class_name: class_name.map(String::from),
            pinned: false,
            author_id: 1,
            published_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_student_visibility() {
        let v = AnnouncementVisibility::for_reader(UserRole::Student, Some("7A".into()));
        assert!(v.can_see(&announcement(Audience::All, None)));
        assert!(v.can_see(&announcement(Audience::Students, None)));
        assert!(v.can_see(&announcement(Audience::Class, Some("7A"))));
        assert!(!v.can_see(&announcement(Audience::Class, Some("8B"))));
        assert!(!v.can_see(&announcement(Audience::Teachers, None)));
    }

    #[test]
    fn test_student_without_class() {
        let v = AnnouncementVisibility::for_reader(UserRole::Student, None);
        assert!(!v.can_see(&announcement(Audience::Class, Some("7A"))));
    }

    #[test]
    fn test_teacher_and_admin_visibility() {
        let teacher = AnnouncementVisibility::for_reader(UserRole::Teacher, None);
        assert!(teacher.can_see(&announcement(Audience::Class, Some("8B"))));
        assert!(!teacher.can_see(&announcement(Audience::Students, None)));

        let admin = AnnouncementVisibility::for_reader(UserRole::Admin, None);
        assert!(admin.can_see(&announcement(Audience::Students, None)));
    }
}
