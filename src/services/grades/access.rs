//! 成绩相关的权限：管理员可操作全部科目，教师只能操作自己任教的科目

use std::sync::Arc;

use crate::errors::{PortalError, Result};
use crate::models::grades::entities::Assessment;
use crate::models::subjects::entities::Subject;
use crate::models::users::entities::{User, UserRole};
use crate::storage::Storage;

/// 教师任教的科目 ID；管理员返回 `None` 表示不限
pub async fn taught_subject_ids(storage: &Arc<dyn Storage>, user: &User) -> Result<Option<Vec<i64>>> {
    match user.role {
        UserRole::Admin => Ok(None),
        UserRole::Teacher => {
            let Some(teacher) = storage.get_teacher_by_user_id(user.id).await? else {
                return Ok(Some(Vec::new()));
            };
            let subjects = storage.list_subjects_by_teacher(teacher.id).await?;
            Ok(Some(subjects.into_iter().map(|s| s.id).collect()))
        }
        UserRole::Student => Err(PortalError::authorization("Students cannot manage grades")),
    }
}

/// 取出科目并校验当前用户可以为其录入成绩
pub async fn subject_for_grading(
    storage: &Arc<dyn Storage>,
    user: &User,
    subject_id: i64,
) -> Result<Subject> {
    let subject = storage
        .get_subject_by_id(subject_id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Subject {subject_id} not found")))?;

    match user.role {
        UserRole::Admin => Ok(subject),
        UserRole::Teacher => {
            let teacher = storage.get_teacher_by_user_id(user.id).await?;
            match (teacher, subject.teacher_id) {
                (Some(teacher), Some(owner)) if teacher.id == owner => Ok(subject),
                _ => Err(PortalError::authorization(
                    "Only the subject's teacher can manage its assessments",
                )),
            }
        }
        UserRole::Student => Err(PortalError::authorization("Students cannot manage grades")),
    }
}

/// 取出评估并校验当前用户对其科目的权限
pub async fn assessment_for_grading(
    storage: &Arc<dyn Storage>,
    user: &User,
    assessment_id: i64,
) -> Result<(Assessment, Subject)> {
    let assessment = storage
        .get_assessment_by_id(assessment_id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Assessment {assessment_id} not found")))?;
    let subject = subject_for_grading(storage, user, assessment.subject_id).await?;
    Ok((assessment, subject))
}
