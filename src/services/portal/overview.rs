use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use super::PortalService;
use crate::errors::{PortalError, Result};
use crate::models::announcements::entities::AnnouncementVisibility;
use crate::models::announcements::requests::{AnnouncementListParams, AnnouncementListQuery};
use crate::models::attendance::entities::AttendanceSummary;
use crate::models::attendance::requests::AttendanceFilter;
use crate::models::attendance::responses::AttendanceSummaryResponse;
use crate::models::dashboard::StudentPortal;
use crate::models::materials::requests::{MaterialListParams, MaterialListQuery};
use crate::models::materials::responses::MaterialListResponse;
use crate::models::payments::responses::StudentPaymentsResponse;
use crate::models::students::entities::Student;
use crate::models::users::entities::User;
use crate::models::{ApiResponse, ErrorCode, PaginationInfo, portal_error_response};
use crate::services::current_user;
use crate::services::dashboard::summary::latest_announcements;
use crate::services::students::report_card::load_report_card;
use crate::storage::Storage;

const LATEST_MATERIALS: i64 = 5;

/// 当前账号关联的学生档案
async fn own_student(storage: &Arc<dyn Storage>, user: &User) -> Result<Student> {
    storage
        .get_student_by_user_id(user.id)
        .await?
        .ok_or_else(|| PortalError::not_found("No student record is linked to this account"))
}

fn portal_error(err: &PortalError) -> HttpResponse {
    let code = match err {
        PortalError::NotFound(_) => ErrorCode::StudentNotFound,
        _ => ErrorCode::InternalServerError,
    };
    portal_error_response(err, code)
}

fn visibility_for(student: &Student, user: &User) -> AnnouncementVisibility {
    AnnouncementVisibility::for_reader(user.role, student.class_name.clone())
}

async fn attendance_of(storage: &Arc<dyn Storage>, student: &Student) -> Result<AttendanceSummary> {
    let statuses = storage
        .list_attendance_statuses(AttendanceFilter {
            student_id: Some(student.id),
            ..Default::default()
        })
        .await?;
    Ok(AttendanceSummary::from_statuses(statuses))
}

/// 未设置班级的学生没有可见资料
async fn materials_of(
    storage: &Arc<dyn Storage>,
    student: &Student,
    page: i64,
    size: i64,
    subject_id: Option<i64>,
) -> Result<MaterialListResponse> {
    let Some(class_name) = student.class_name.clone() else {
        return Ok(MaterialListResponse {
            items: Vec::new(),
            pagination: PaginationInfo::new(1, size.max(1) as u64, 0, 0),
        });
    };
    storage
        .list_materials_with_pagination(MaterialListQuery {
            page: Some(page),
            size: Some(size),
            class_name: Some(class_name),
            subject_id,
        })
        .await
}

pub async fn load_student_portal(storage: &Arc<dyn Storage>, user: &User) -> Result<StudentPortal> {
    let student = own_student(storage, user).await?;
    let report_card = load_report_card(storage, &student).await?;
    let attendance = attendance_of(storage, &student).await?;
    let open_payments = storage
        .list_payments_by_student(student.id)
        .await?
        .into_iter()
        .filter(|p| p.status.is_open())
        .collect();
    let latest_announcements =
        latest_announcements(storage, visibility_for(&student, user)).await?;
    let latest_materials = materials_of(storage, &student, 1, LATEST_MATERIALS, None)
        .await?
        .items;

    Ok(StudentPortal {
        student,
        report_card,
        attendance,
        open_payments,
        latest_announcements,
        latest_materials,
    })
}

pub async fn overview(service: &PortalService, request: &HttpRequest) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    match load_student_portal(&storage, &user).await {
        Ok(portal) => Ok(HttpResponse::Ok().json(ApiResponse::success(portal, "获取门户首页成功"))),
        Err(e) => Ok(portal_error(&e)),
    }
}

pub async fn report_card(
    service: &PortalService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    let result = match own_student(&storage, &user).await {
        Ok(student) => load_report_card(&storage, &student).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(card) => Ok(HttpResponse::Ok().json(ApiResponse::success(card, "获取成绩单成功"))),
        Err(e) => Ok(portal_error(&e)),
    }
}

pub async fn attendance(
    service: &PortalService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    let result = match own_student(&storage, &user).await {
        Ok(student) => attendance_of(&storage, &student).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(summary) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            AttendanceSummaryResponse { summary },
            "获取考勤统计成功",
        ))),
        Err(e) => Ok(portal_error(&e)),
    }
}

pub async fn payments(service: &PortalService, request: &HttpRequest) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    let result = match own_student(&storage, &user).await {
        Ok(student) => storage.list_payments_by_student(student.id).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(items) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            StudentPaymentsResponse { items },
            "获取收款列表成功",
        ))),
        Err(e) => Ok(portal_error(&e)),
    }
}

pub async fn announcements(
    service: &PortalService,
    query: AnnouncementListParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    let student = match own_student(&storage, &user).await {
        Ok(student) => student,
        Err(e) => return Ok(portal_error(&e)),
    };
    let list_query = AnnouncementListQuery {
        page: Some(query.pagination.page),
        size: Some(query.pagination.size),
        visibility: visibility_for(&student, &user),
        audience: query.audience,
    };

    match storage.list_announcements_with_pagination(list_query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "获取公告列表成功"))),
        Err(e) => Ok(portal_error(&e)),
    }
}

/// 只列出本班资料，忽略请求中的班级参数
pub async fn materials(
    service: &PortalService,
    query: MaterialListParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    let result = match own_student(&storage, &user).await {
        Ok(student) => {
            materials_of(
                &storage,
                &student,
                query.pagination.page,
                query.pagination.size,
                query.subject_id,
            )
            .await
        }
        Err(e) => Err(e),
    };
    match result {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "获取资料列表成功"))),
        Err(e) => Ok(portal_error(&e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::announcements::entities::Audience;
    use crate::models::announcements::requests::NewAnnouncement;
    use crate::models::attendance::entities::AttendanceStatus;
    use crate::models::attendance::requests::AttendanceEntry;
    use crate::models::materials::requests::NewMaterial;
    use crate::models::payments::entities::{PaymentKind, PaymentProvider};
    use crate::models::payments::requests::NewPayment;
    use crate::models::students::entities::EnrollmentStatus;
    use crate::models::students::requests::NewStudent;
    use crate::models::users::entities::{UserRole, UserStatus};
    use crate::services::testing::{json_body, memory_storage, request_as, seed_user};
    use actix_web::http::StatusCode;
    use chrono::NaiveDate;

    async fn linked_student(storage: &Arc<dyn Storage>, class_name: &str) -> (User, Student) {
        let user = seed_user(storage, "aluna", UserRole::Student, UserStatus::Active).await;
        let student = storage
            .create_student(NewStudent {
                user_id: Some(user.id),
                full_name: "Helena Costa".to_string(),
                email: "helena@familia.test".to_string(),
                phone: None,
                birth_date: None,
                guardian_name: None,
                guardian_phone: None,
                class_name: Some(class_name.to_string()),
                registration_number: "2025HELENA".to_string(),
                enrollment_status: EnrollmentStatus::Approved,
                notes: None,
            })
            .await
            .unwrap();
        (user, student)
    }

    #[tokio::test]
    async fn test_portal_scopes_everything_to_the_student() {
        let storage = memory_storage().await;
        let admin = seed_user(&storage, "admin", UserRole::Admin, UserStatus::Active).await;
        let (user, student) = linked_student(&storage, "4B").await;

        for (audience, class_name) in [
            (Audience::Students, None),
            (Audience::Class, Some("4B")),
            (Audience::Class, Some("4C")),
            (Audience::Teachers, None),
        ] {
            storage
                .create_announcement(NewAnnouncement {
                    title: "Aviso".to_string(),
                    content: "Texto".to_string(),
                    audience,
                    class_name: class_name.map(String::from),
                    pinned: false,
                    author_id: admin.id,
                })
                .await
                .unwrap();
        }
        for class_name in ["4B", "4C"] {
            storage
                .create_material(NewMaterial {
                    title: format!("Apostila {class_name}"),
                    description: None,
                    subject_id: None,
                    class_name: class_name.to_string(),
                    file_token: None,
                    link_url: Some("https://exemplo.test/apostila".to_string()),
                    uploaded_by: admin.id,
                })
                .await
                .unwrap();
        }
        let paid = storage
            .create_payment(NewPayment {
                student_id: student.id,
                description: "Matrícula".to_string(),
                kind: PaymentKind::Enrollment,
                amount_cents: 15_000,
                due_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                provider: PaymentProvider::Manual,
                billing_type: None,
            })
            .await
            .unwrap();
        storage.mark_payment_paid(paid.id, 1_738_368_000).await.unwrap();
        storage
            .create_payment(NewPayment {
                student_id: student.id,
                description: "Mensalidade".to_string(),
                kind: PaymentKind::Tuition,
                amount_cents: 45_000,
                due_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                provider: PaymentProvider::Manual,
                billing_type: None,
            })
            .await
            .unwrap();
        storage
            .upsert_attendance(
                "4B",
                NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
                None,
                vec![AttendanceEntry {
                    student_id: student.id,
                    status: AttendanceStatus::Present,
                    note: None,
                }],
                admin.id,
            )
            .await
            .unwrap();

        let portal = load_student_portal(&storage, &user).await.unwrap();
        assert_eq!(portal.student.id, student.id);
        assert_eq!(portal.open_payments.len(), 1);
        assert_eq!(portal.open_payments[0].description, "Mensalidade");
        assert_eq!(portal.latest_announcements.len(), 2);
        assert_eq!(portal.latest_materials.len(), 1);
        assert_eq!(portal.latest_materials[0].class_name, "4B");
        assert_eq!(portal.attendance.attendance_rate, Some(100.0));
        assert!(portal.report_card.subjects.is_empty());
    }

    #[actix_web::test]
    async fn test_account_without_student_record() {
        let storage = memory_storage().await;
        let user = seed_user(&storage, "sem-ficha", UserRole::Student, UserStatus::Active).await;
        let service = PortalService::new_lazy();

        let resp = service
            .payments(&request_as(&storage, Some(&user), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = json_body(resp).await;
        assert_eq!(body["code"], ErrorCode::StudentNotFound as i32);
    }
}
