use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use super::{AttendanceService, attendance_error_code};
use crate::errors::{PortalError, Result};
use crate::models::attendance::entities::AttendanceRecord;
use crate::models::attendance::requests::RecordAttendanceRequest;
use crate::models::attendance::responses::AttendanceBatchResponse;
use crate::models::users::entities::User;
use crate::models::{ApiResponse, portal_error_response};
use crate::services::current_user;
use crate::services::grades::access::subject_for_grading;
use crate::storage::Storage;

/// 校验并写入一次点名
///
/// 班级必须存在，名单里的学生必须属于该班级；带科目时科目也要属于该班级，
/// 教师只能为自己任教的科目点名。
pub async fn record_roll_call(
    storage: &Arc<dyn Storage>,
    user: &User,
    request: RecordAttendanceRequest,
) -> Result<Vec<AttendanceRecord>> {
    let class_name = request.class_name.trim().to_string();
    if request.entries.is_empty() {
        return Err(PortalError::validation("At least one attendance entry is required"));
    }
    storage
        .get_class_by_name(&class_name)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Class {class_name} not found")))?;

    if let Some(subject_id) = request.subject_id {
        let subject = subject_for_grading(storage, user, subject_id).await?;
        if subject.class_name != class_name {
            return Err(PortalError::validation(format!(
                "Subject {subject_id} does not belong to class {class_name}"
            )));
        }
    }

    let mut seen = HashSet::new();
    for entry in &request.entries {
        if !seen.insert(entry.student_id) {
            return Err(PortalError::validation(format!(
                "Student {} appears more than once",
                entry.student_id
            )));
        }
    }

    let ids: Vec<i64> = seen.into_iter().collect();
    let students = storage.get_students_by_ids(&ids).await?;
    for id in &ids {
        match students.iter().find(|s| s.id == *id) {
            None => return Err(PortalError::not_found(format!("Student {id} not found"))),
            Some(student) if student.class_name.as_deref() != Some(class_name.as_str()) => {
                return Err(PortalError::validation(format!(
                    "Student {id} is not in class {class_name}"
                )));
            }
            Some(_) => {}
        }
    }

    let records = storage
        .upsert_attendance(
            &class_name,
            request.date,
            request.subject_id,
            request.entries,
            user.id,
        )
        .await?;
    info!(
        "Attendance for {} on {} recorded by user {} ({} entries)",
        class_name,
        request.date,
        user.id,
        records.len()
    );
    Ok(records)
}

pub async fn record_attendance(
    service: &AttendanceService,
    body: RecordAttendanceRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    match record_roll_call(&storage, &user, body).await {
        Ok(records) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            AttendanceBatchResponse { records },
            "考勤已记录",
        ))),
        Err(e) => Ok(portal_error_response(&e, attendance_error_code(&e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attendance::entities::AttendanceStatus;
    use crate::models::attendance::requests::AttendanceEntry;
    use crate::models::classes::entities::Shift;
    use crate::models::classes::requests::CreateClassRequest;
    use crate::models::students::entities::{EnrollmentStatus, Student};
    use crate::models::students::requests::NewStudent;
    use crate::models::users::entities::{UserRole, UserStatus};
    use crate::services::testing::{memory_storage, seed_user};
    use chrono::NaiveDate;

    async fn class(storage: &Arc<dyn Storage>, name: &str) {
        storage
            .create_class(CreateClassRequest {
                name: name.to_string(),
                grade_level: None,
                shift: Shift::Afternoon,
                school_year: 2025,
                homeroom_teacher_id: None,
            })
            .await
            .unwrap();
    }

    async fn student(storage: &Arc<dyn Storage>, name: &str, class_name: &str) -> Student {
        storage
            .create_student(NewStudent {
                user_id: None,
                full_name: name.to_string(),
                email: format!("{}@familia.test", name.to_lowercase()),
                phone: None,
                birth_date: None,
                guardian_name: None,
                guardian_phone: None,
                class_name: Some(class_name.to_string()),
                registration_number: format!("2025{}", name.to_uppercase()),
                enrollment_status: EnrollmentStatus::Approved,
                notes: None,
            })
            .await
            .unwrap()
    }

    fn roll_call(class_name: &str, entries: Vec<(i64, AttendanceStatus)>) -> RecordAttendanceRequest {
        RecordAttendanceRequest {
            class_name: class_name.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
            subject_id: None,
            entries: entries
                .into_iter()
                .map(|(student_id, status)| AttendanceEntry {
                    student_id,
                    status,
                    note: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_roll_call_checks_class_membership() {
        let storage = memory_storage().await;
        class(&storage, "6A").await;
        class(&storage, "6B").await;
        let caio = student(&storage, "Caio", "6A").await;
        let duda = student(&storage, "Duda", "6B").await;
        let admin = seed_user(&storage, "admin", UserRole::Admin, UserStatus::Active).await;

        let err = record_roll_call(
            &storage,
            &admin,
            roll_call("6A", vec![(duda.id, AttendanceStatus::Present)]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));

        let err = record_roll_call(
            &storage,
            &admin,
            roll_call("9Z", vec![(caio.id, AttendanceStatus::Present)]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PortalError::NotFound(_)));

        let records = record_roll_call(
            &storage,
            &admin,
            roll_call("6A", vec![(caio.id, AttendanceStatus::Late)]),
        )
        .await
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AttendanceStatus::Late);
        assert_eq!(records[0].recorded_by, Some(admin.id));
    }

    #[tokio::test]
    async fn test_roll_call_rejects_empty_and_duplicates() {
        let storage = memory_storage().await;
        class(&storage, "6A").await;
        let caio = student(&storage, "Caio", "6A").await;
        let admin = seed_user(&storage, "admin", UserRole::Admin, UserStatus::Active).await;

        assert!(matches!(
            record_roll_call(&storage, &admin, roll_call("6A", vec![])).await,
            Err(PortalError::Validation(_))
        ));
        assert!(matches!(
            record_roll_call(
                &storage,
                &admin,
                roll_call(
                    "6A",
                    vec![
                        (caio.id, AttendanceStatus::Present),
                        (caio.id, AttendanceStatus::Absent)
                    ]
                )
            )
            .await,
            Err(PortalError::Validation(_))
        ));
    }
}
