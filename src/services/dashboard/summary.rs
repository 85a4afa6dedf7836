use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use super::DashboardService;
use crate::errors::{PortalError, Result};
use crate::models::announcements::entities::{Announcement, AnnouncementVisibility};
use crate::models::announcements::requests::AnnouncementListQuery;
use crate::models::dashboard::{AdminDashboard, PaymentCounts, StudentCounts, TeacherDashboard};
use crate::models::payments::entities::PaymentStatus;
use crate::models::users::entities::User;
use crate::models::{ApiResponse, ErrorCode, internal_error_response, portal_error_response};
use crate::services::current_user;
use crate::storage::Storage;
use crate::utils::time::month_start;

const LATEST_ANNOUNCEMENTS: i64 = 5;

pub(crate) async fn latest_announcements(
    storage: &Arc<dyn Storage>,
    visibility: AnnouncementVisibility,
) -> Result<Vec<Announcement>> {
    let page = storage
        .list_announcements_with_pagination(AnnouncementListQuery {
            page: Some(1),
            size: Some(LATEST_ANNOUNCEMENTS),
            visibility,
            audience: None,
        })
        .await?;
    Ok(page.items)
}

pub async fn load_admin_dashboard(storage: &Arc<dyn Storage>) -> Result<AdminDashboard> {
    let now = chrono::Utc::now();

    Ok(AdminDashboard {
        students: StudentCounts::from_pairs(storage.count_students_by_status().await?),
        teachers: storage.count_teachers().await?,
        classes: storage.count_classes().await?,
        subjects: storage.count_subjects().await?,
        payments: PaymentCounts {
            pending: storage.count_payments_by_status(PaymentStatus::Pending).await?,
            overdue: storage.count_payments_by_status(PaymentStatus::Overdue).await?,
            received_this_month_cents: storage
                .sum_payments_paid_since(month_start(now).timestamp())
                .await?,
        },
        active_broadcasts: storage.count_active_broadcasts().await?,
        latest_announcements: latest_announcements(storage, AnnouncementVisibility::Everything)
            .await?,
    })
}

pub async fn load_teacher_dashboard(
    storage: &Arc<dyn Storage>,
    user: &User,
) -> Result<TeacherDashboard> {
    let teacher = storage
        .get_teacher_by_user_id(user.id)
        .await?
        .ok_or_else(|| PortalError::not_found("Teacher profile not found"))?;
    let subjects = storage.list_subjects_by_teacher(teacher.id).await?;
    let subject_ids: Vec<i64> = subjects.iter().map(|s| s.id).collect();
    let assessments = storage.count_assessments_for_subjects(&subject_ids).await?;
    let visibility = AnnouncementVisibility::for_reader(user.role, None);

    Ok(TeacherDashboard {
        teacher,
        subjects,
        assessments,
        latest_announcements: latest_announcements(storage, visibility).await?,
    })
}

pub async fn admin_dashboard(
    service: &DashboardService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    match load_admin_dashboard(&storage).await {
        Ok(dashboard) => Ok(HttpResponse::Ok().json(ApiResponse::success(dashboard, "获取仪表盘成功"))),
        Err(e) => Ok(internal_error_response(format!("获取仪表盘失败: {e}"))),
    }
}

pub async fn teacher_dashboard(
    service: &DashboardService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    match load_teacher_dashboard(&storage, &user).await {
        Ok(dashboard) => Ok(HttpResponse::Ok().json(ApiResponse::success(dashboard, "获取仪表盘成功"))),
        Err(e) => Ok(portal_error_response(&e, ErrorCode::TeacherNotFound)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::announcements::entities::Audience;
    use crate::models::announcements::requests::NewAnnouncement;
    use crate::models::classes::entities::Shift;
    use crate::models::classes::requests::CreateClassRequest;
    use crate::models::payments::entities::{PaymentKind, PaymentProvider};
    use crate::models::payments::requests::NewPayment;
    use crate::models::students::entities::EnrollmentStatus;
    use crate::models::students::requests::NewStudent;
    use crate::models::subjects::requests::CreateSubjectRequest;
    use crate::models::teachers::requests::CreateTeacherRequest;
    use crate::models::users::entities::{UserRole, UserStatus};
    use crate::services::teachers::create::create_teacher_account;
    use crate::services::testing::{memory_storage, seed_user};
    use chrono::NaiveDate;

    fn student(name: &str, status: EnrollmentStatus) -> NewStudent {
        NewStudent {
            user_id: None,
            full_name: name.to_string(),
            email: format!("{}@familia.test", name.to_lowercase()),
            phone: None,
            birth_date: None,
            guardian_name: None,
            guardian_phone: None,
            class_name: None,
            registration_number: format!("2025{}", name.to_uppercase()),
            enrollment_status: status,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_admin_dashboard_aggregates_counts() {
        let storage = memory_storage().await;
        let admin = seed_user(&storage, "admin", UserRole::Admin, UserStatus::Active).await;
        storage
            .create_student(student("Ana", EnrollmentStatus::Pending))
            .await
            .unwrap();
        let bia = storage
            .create_student(student("Bia", EnrollmentStatus::Approved))
            .await
            .unwrap();
        storage
            .create_class(CreateClassRequest {
                name: "1A".to_string(),
                grade_level: None,
                shift: Shift::Morning,
                school_year: 2025,
                homeroom_teacher_id: None,
            })
            .await
            .unwrap();

        let payment = storage
            .create_payment(NewPayment {
                student_id: bia.id,
                description: "Mensalidade".to_string(),
                kind: PaymentKind::Tuition,
                amount_cents: 45_000,
                due_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
                provider: PaymentProvider::Manual,
                billing_type: None,
            })
            .await
            .unwrap();
        storage
            .create_payment(NewPayment {
                student_id: bia.id,
                description: "Material".to_string(),
                kind: PaymentKind::Other,
                amount_cents: 9_900,
                due_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
                provider: PaymentProvider::Manual,
                billing_type: None,
            })
            .await
            .unwrap();
        storage
            .mark_payment_paid(payment.id, chrono::Utc::now().timestamp())
            .await
            .unwrap();

        storage
            .create_announcement(NewAnnouncement {
                title: "Reunião".to_string(),
                content: "Sexta".to_string(),
                audience: Audience::Teachers,
                class_name: None,
                pinned: false,
                author_id: admin.id,
            })
            .await
            .unwrap();

        let dashboard = load_admin_dashboard(&storage).await.unwrap();
        assert_eq!(dashboard.students.pending, 1);
        assert_eq!(dashboard.students.approved, 1);
        assert_eq!(dashboard.students.total, 2);
        assert_eq!(dashboard.classes, 1);
        assert_eq!(dashboard.payments.pending, 1);
        assert_eq!(dashboard.payments.received_this_month_cents, 45_000);
        assert_eq!(dashboard.active_broadcasts, 0);
        assert_eq!(dashboard.latest_announcements.len(), 1);
    }

    #[tokio::test]
    async fn test_teacher_dashboard_lists_own_subjects() {
        let storage = memory_storage().await;
        let created = create_teacher_account(
            &storage,
            CreateTeacherRequest {
                full_name: "Prof. Rui".to_string(),
                email: "rui@escola.test".to_string(),
                phone: None,
                specialty: None,
                username: None,
                password: Some("Ensino#2025".to_string()),
            },
        )
        .await
        .unwrap();
        storage
            .create_class(CreateClassRequest {
                name: "2A".to_string(),
                grade_level: None,
                shift: Shift::Morning,
                school_year: 2025,
                homeroom_teacher_id: None,
            })
            .await
            .unwrap();
        storage
            .create_subject(CreateSubjectRequest {
                name: "Geografia".to_string(),
                class_name: "2A".to_string(),
                teacher_id: Some(created.teacher.id),
                workload_hours: Some(80),
            })
            .await
            .unwrap();
        let user = storage
            .get_user_by_id(created.teacher.user_id)
            .await
            .unwrap()
            .unwrap();

        let dashboard = load_teacher_dashboard(&storage, &user).await.unwrap();
        assert_eq!(dashboard.subjects.len(), 1);
        assert_eq!(dashboard.assessments, 0);

        let admin = seed_user(&storage, "admin", UserRole::Admin, UserStatus::Active).await;
        assert!(matches!(
            load_teacher_dashboard(&storage, &admin).await,
            Err(PortalError::NotFound(_))
        ));
    }
}
