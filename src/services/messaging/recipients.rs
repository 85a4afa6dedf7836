//! 群发对象解析
//!
//! 号码统一规范化后去重，无效或重复的号码计入 `skipped`。

use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::{PortalError, Result};
use crate::models::messaging::entities::BroadcastAudience;
use crate::models::messaging::requests::{CreateBroadcastRequest, NewRecipient};
use crate::models::students::entities::{EnrollmentStatus, Student};
use crate::models::students::requests::StudentFilter;
use crate::storage::Storage;
use crate::utils::normalize_phone;

#[derive(Debug, Default, PartialEq)]
pub struct ResolvedRecipients {
    pub recipients: Vec<NewRecipient>,
    pub skipped: usize,
}

impl ResolvedRecipients {
    fn push(&mut self, seen: &mut HashSet<String>, raw: Option<&str>, student: Option<&Student>) {
        match raw.and_then(normalize_phone) {
            Some(phone) if seen.insert(phone.clone()) => self.recipients.push(NewRecipient {
                student_id: student.map(|s| s.id),
                name: student.map(|s| s.full_name.clone()),
                phone,
            }),
            _ => self.skipped += 1,
        }
    }
}

pub fn from_students(students: &[Student]) -> ResolvedRecipients {
    let mut resolved = ResolvedRecipients::default();
    let mut seen = HashSet::new();
    for student in students {
        resolved.push(&mut seen, student.contact_phone(), Some(student));
    }
    resolved
}

pub fn from_phones(phones: &[String]) -> ResolvedRecipients {
    let mut resolved = ResolvedRecipients::default();
    let mut seen = HashSet::new();
    for phone in phones {
        resolved.push(&mut seen, Some(phone), None);
    }
    resolved
}

pub async fn resolve_audience(
    storage: &Arc<dyn Storage>,
    request: &CreateBroadcastRequest,
) -> Result<ResolvedRecipients> {
    let filter = match request.audience {
        BroadcastAudience::Phones => {
            let phones = request
                .phones
                .as_deref()
                .ok_or_else(|| PortalError::validation("phones is required for the phones audience"))?;
            return Ok(from_phones(phones));
        }
        BroadcastAudience::AllStudents => StudentFilter {
            status: Some(EnrollmentStatus::Approved),
            class_name: None,
        },
        BroadcastAudience::PendingStudents => StudentFilter {
            status: Some(EnrollmentStatus::Pending),
            class_name: None,
        },
        BroadcastAudience::Class => {
            let class_name = request
                .class_name
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .ok_or_else(|| PortalError::validation("class_name is required for the class audience"))?;
            StudentFilter {
                status: Some(EnrollmentStatus::Approved),
                class_name: Some(class_name.to_string()),
            }
        }
    };

    let students = storage.list_students(filter).await?;
    Ok(from_students(&students))
}
