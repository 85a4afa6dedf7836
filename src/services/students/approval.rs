//! 学籍审核
//!
//! 通过：确保学生有可登录的账号（已有则激活，没有则生成密码新建），
//! 再将学籍置为 approved，最后尽力发送欢迎邮件和 WhatsApp。
//! 通知失败只记日志。

use std::sync::Arc;
use tracing::{info, warn};

use crate::errors::{PortalError, Result};
use crate::models::students::entities::{EnrollmentStatus, Student};
use crate::models::students::requests::UpdateStudentRequest;
use crate::models::students::responses::ApprovalResponse;
use crate::models::users::entities::{UserRole, UserStatus};
use crate::models::users::requests::NewUser;
use crate::services::integrations::Integrations;
use crate::services::messaging::email::OutgoingEmail;
use crate::services::system::DynamicConfig;
use crate::storage::Storage;
use crate::utils::normalize_phone;
use crate::utils::password::{generate_password, hash_password};

const GENERATED_PASSWORD_LENGTH: usize = 12;

pub async fn approve_student(
    storage: &Arc<dyn Storage>,
    integrations: &Integrations,
    student_id: i64,
) -> Result<ApprovalResponse> {
    let student = find_student(storage, student_id).await?;
    if student.enrollment_status == EnrollmentStatus::Approved {
        return Ok(ApprovalResponse {
            student,
            unchanged: true,
            account_created: false,
        });
    }

    let generated_password = match student.user_id {
        Some(user_id) => {
            storage.set_user_status(user_id, UserStatus::Active).await?;
            None
        }
        None => Some(create_account(storage, &student).await?),
    };

    let student = storage
        .set_student_enrollment_status(student.id, EnrollmentStatus::Approved)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Student {student_id} not found")))?;
    info!("Student {} approved", student.id);

    notify_approval(integrations, &student, generated_password.as_deref()).await;

    Ok(ApprovalResponse {
        student,
        unchanged: false,
        account_created: generated_password.is_some(),
    })
}

pub async fn reject_student(
    storage: &Arc<dyn Storage>,
    student_id: i64,
    reason: Option<String>,
) -> Result<ApprovalResponse> {
    let student = find_student(storage, student_id).await?;
    if student.enrollment_status == EnrollmentStatus::Rejected {
        return Ok(ApprovalResponse {
            student,
            unchanged: true,
            account_created: false,
        });
    }

    if let Some(user_id) = student.user_id {
        storage.set_user_status(user_id, UserStatus::Inactive).await?;
    }
    if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
        storage
            .update_student(
                student.id,
                UpdateStudentRequest {
                    notes: Some(reason),
                    ..Default::default()
                },
            )
            .await?;
    }

    let student = storage
        .set_student_enrollment_status(student.id, EnrollmentStatus::Rejected)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Student {student_id} not found")))?;
    info!("Student {} rejected", student.id);

    Ok(ApprovalResponse {
        student,
        unchanged: false,
        account_created: false,
    })
}

async fn find_student(storage: &Arc<dyn Storage>, student_id: i64) -> Result<Student> {
    storage
        .get_student_by_id(student_id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Student {student_id} not found")))
}

/// 以学籍号为用户名新建学生账号，返回明文密码
async fn create_account(storage: &Arc<dyn Storage>, student: &Student) -> Result<String> {
    if storage.get_user_by_email(&student.email).await?.is_some() {
        return Err(PortalError::conflict(format!(
            "A user with email {} already exists",
            student.email
        )));
    }

    let password = generate_password(GENERATED_PASSWORD_LENGTH);
    let user = storage
        .create_user(NewUser {
            username: student.registration_number.to_lowercase(),
            email: student.email.clone(),
            password_hash: hash_password(&password)?,
            role: UserRole::Student,
            status: UserStatus::Active,
            display_name: Some(student.full_name.clone()),
            phone: student.phone.clone(),
        })
        .await?;
    storage.link_student_user(student.id, user.id).await?;
    info!("Account {} created for student {}", user.id, student.id);

    Ok(password)
}

fn welcome_text(school: &str, student: &Student, password: Option<&str>) -> String {
    let mut text = format!(
        "Olá, {}! Sua matrícula na {} foi aprovada. Número de matrícula: {}.",
        student.full_name, school, student.registration_number
    );
    if let Some(password) = password {
        text.push_str(&format!(
            " Acesse o portal com o usuário {} e a senha provisória {}.",
            student.registration_number.to_lowercase(),
            password
        ));
    }
    text
}

async fn notify_approval(integrations: &Integrations, student: &Student, password: Option<&str>) {
    let school = DynamicConfig::system_name().await;
    let text = welcome_text(&school, student, password);

    let email = OutgoingEmail {
        to: vec![student.email.clone()],
        subject: format!("Matrícula aprovada - {school}"),
        html: format!("<p>{text}</p>"),
    };
    if let Err(e) = integrations.email().send(&email).await {
        warn!("Welcome email to student {} failed: {}", student.id, e);
    }

    let Some(phone) = student.contact_phone().and_then(normalize_phone) else {
        return;
    };
    match integrations.whatsapp() {
        Ok(sender) => {
            if let Err(e) = sender.send_text(&phone, &text).await {
                warn!("Welcome WhatsApp to student {} failed: {}", student.id, e);
            }
        }
        Err(e) => warn!("Welcome WhatsApp skipped: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::students::requests::NewStudent;
    use crate::services::testing::{FakeEmail, FakeSender, fake_integrations, memory_storage};

    fn pending_student(name: &str) -> NewStudent {
        NewStudent {
            user_id: None,
            full_name: name.to_string(),
            email: format!("{}@aluno.test", name.to_lowercase().replace(' ', ".")),
            phone: Some("11977776666".to_string()),
            birth_date: None,
            guardian_name: None,
            guardian_phone: None,
            class_name: Some("1A".to_string()),
            registration_number: format!("2025{}", name.len()),
            enrollment_status: EnrollmentStatus::Pending,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_approve_creates_account_and_notifies() {
        let storage = memory_storage().await;
        let student = storage.create_student(pending_student("Lia Souza")).await.unwrap();
        let email = Arc::new(FakeEmail::default());
        let whatsapp = Arc::new(FakeSender::new());
        let integrations = fake_integrations(email.clone(), whatsapp.clone(), vec![]);

        let result = approve_student(&storage, &integrations, student.id).await.unwrap();

        assert!(!result.unchanged);
        assert!(result.account_created);
        assert_eq!(result.student.enrollment_status, EnrollmentStatus::Approved);
        let user_id = result.student.user_id.unwrap();
        let user = storage.get_user_by_id(user_id).await.unwrap().unwrap();
        assert_eq!(user.status, UserStatus::Active);
        assert_eq!(user.role, UserRole::Student);

        assert_eq!(email.sent.lock().unwrap()[0].to, vec!["lia.souza@aluno.test"]);
        assert_eq!(whatsapp.phones(), vec!["5511977776666"]);
    }

    #[tokio::test]
    async fn test_approve_activates_existing_account() {
        let storage = memory_storage().await;
        let (user, student) = storage
            .create_student_with_account(
                NewUser {
                    username: "rui".to_string(),
                    email: "rui@aluno.test".to_string(),
                    password_hash: "hash".to_string(),
                    role: UserRole::Student,
                    status: UserStatus::Pending,
                    display_name: None,
                    phone: None,
                },
                pending_student("Rui"),
            )
            .await
            .unwrap();
        let integrations = fake_integrations(
            Arc::new(FakeEmail::default()),
            Arc::new(FakeSender::new()),
            vec![],
        );

        let result = approve_student(&storage, &integrations, student.id).await.unwrap();
        assert!(!result.account_created);
        let user = storage.get_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(user.status, UserStatus::Active);
    }

    #[tokio::test]
    async fn test_approve_twice_is_noop() {
        let storage = memory_storage().await;
        let student = storage.create_student(pending_student("Davi")).await.unwrap();
        let email = Arc::new(FakeEmail::default());
        let integrations = fake_integrations(email.clone(), Arc::new(FakeSender::new()), vec![]);

        approve_student(&storage, &integrations, student.id).await.unwrap();
        let second = approve_student(&storage, &integrations, student.id).await.unwrap();

        assert!(second.unchanged);
        assert_eq!(email.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_approval() {
        let storage = memory_storage().await;
        let student = storage.create_student(pending_student("Nina")).await.unwrap();
        let email = Arc::new(FakeEmail {
            fail: true,
            ..Default::default()
        });
        let mut whatsapp = FakeSender::new();
        whatsapp.fail_phones = vec!["5511977776666".to_string()];
        let integrations = fake_integrations(email, Arc::new(whatsapp), vec![]);

        let result = approve_student(&storage, &integrations, student.id).await.unwrap();
        assert_eq!(result.student.enrollment_status, EnrollmentStatus::Approved);
    }

    #[tokio::test]
    async fn test_reject_disables_account_and_keeps_reason() {
        let storage = memory_storage().await;
        let (user, student) = storage
            .create_student_with_account(
                NewUser {
                    username: "bia".to_string(),
                    email: "bia@aluno.test".to_string(),
                    password_hash: "hash".to_string(),
                    role: UserRole::Student,
                    status: UserStatus::Pending,
                    display_name: None,
                    phone: None,
                },
                pending_student("Bia"),
            )
            .await
            .unwrap();

        let result = reject_student(&storage, student.id, Some("Documentação incompleta".into()))
            .await
            .unwrap();
        assert_eq!(result.student.enrollment_status, EnrollmentStatus::Rejected);
        assert_eq!(result.student.notes.as_deref(), Some("Documentação incompleta"));
        let user = storage.get_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(user.status, UserStatus::Inactive);
    }

    #[tokio::test]
    async fn test_missing_student() {
        let storage = memory_storage().await;
        let integrations = fake_integrations(
            Arc::new(FakeEmail::default()),
            Arc::new(FakeSender::new()),
            vec![],
        );
        assert!(matches!(
            approve_student(&storage, &integrations, 404).await,
            Err(PortalError::NotFound(_))
        ));
    }
}
