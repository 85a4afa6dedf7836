//! 学生档案的录入（公开报名与管理员录入共用）

use chrono::{Datelike, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::errors::{PortalError, Result};
use crate::models::payments::entities::{Payment, PaymentKind};
use crate::models::payments::requests::CreatePaymentRequest;
use crate::models::students::entities::{EnrollmentStatus, Student};
use crate::models::students::requests::{CreateStudentRequest, EnrollmentRequest, NewStudent};
use crate::models::students::responses::EnrollmentResponse;
use crate::models::users::entities::{UserRole, UserStatus};
use crate::models::users::requests::NewUser;
use crate::services::integrations::Integrations;
use crate::services::payments::charge::create_charge_for_student;
use crate::services::system::DynamicConfig;
use crate::storage::Storage;
use crate::utils::normalize_phone;
use crate::utils::password::hash_password;
use crate::utils::random_code::generate_registration_number;
use crate::utils::validate::{validate_email, validate_password_simple, validate_required_text};

/// 校验后的联系信息
struct Contact {
    full_name: String,
    email: String,
    phone: Option<String>,
    guardian_phone: Option<String>,
}

fn optional_phone(raw: Option<&str>) -> Result<Option<String>> {
    match raw.map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(None),
        Some(phone) => normalize_phone(phone)
            .map(Some)
            .ok_or_else(|| PortalError::validation(format!("Invalid phone number: {phone}"))),
    }
}

fn validate_contact(
    full_name: &str,
    email: &str,
    phone: Option<&str>,
    guardian_phone: Option<&str>,
) -> Result<Contact> {
    validate_required_text(full_name, "full_name", 120).map_err(PortalError::validation)?;
    let email = email.trim().to_lowercase();
    validate_email(&email).map_err(PortalError::validation)?;

    Ok(Contact {
        full_name: full_name.trim().to_string(),
        email,
        phone: optional_phone(phone)?,
        guardian_phone: optional_phone(guardian_phone)?,
    })
}

async fn ensure_email_free(storage: &Arc<dyn Storage>, email: &str) -> Result<()> {
    if storage.get_student_by_email(email).await?.is_some()
        || storage.get_user_by_email(email).await?.is_some()
    {
        return Err(PortalError::conflict(format!(
            "A student with email {email} already exists"
        )));
    }
    Ok(())
}

async fn ensure_class_exists(storage: &Arc<dyn Storage>, class_name: Option<&str>) -> Result<()> {
    if let Some(name) = class_name
        && storage.get_class_by_name(name).await?.is_none()
    {
        return Err(PortalError::validation(format!("Unknown class: {name}")));
    }
    Ok(())
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn student_account(
    contact: &Contact,
    username: &str,
    password_hash: String,
    status: UserStatus,
) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: contact.email.clone(),
        password_hash,
        role: UserRole::Student,
        status,
        display_name: Some(contact.full_name.clone()),
        phone: contact.phone.clone(),
    }
}

/// 公开报名：创建待审核的账号和学籍，按需生成报名费
///
/// `fee_cents` 为 0 时不收费；收费失败不影响报名结果。
pub async fn enroll_student(
    storage: &Arc<dyn Storage>,
    integrations: &Integrations,
    request: EnrollmentRequest,
    fee_cents: i64,
) -> Result<EnrollmentResponse> {
    let contact = validate_contact(
        &request.full_name,
        &request.email,
        request.phone.as_deref(),
        request.guardian_phone.as_deref(),
    )?;
    validate_password_simple(&request.password).map_err(PortalError::validation)?;
    let class_name = clean(request.class_name);
    ensure_class_exists(storage, class_name.as_deref()).await?;
    ensure_email_free(storage, &contact.email).await?;

    let registration_number = generate_registration_number(Utc::now().year());
    let account = student_account(
        &contact,
        &registration_number.to_lowercase(),
        hash_password(&request.password)?,
        UserStatus::Pending,
    );
    let record = NewStudent {
        user_id: None,
        full_name: contact.full_name,
        email: contact.email,
        phone: contact.phone,
        birth_date: request.birth_date,
        guardian_name: clean(request.guardian_name),
        guardian_phone: contact.guardian_phone,
        class_name,
        registration_number,
        enrollment_status: EnrollmentStatus::Pending,
        notes: None,
    };

    let (_, student) = storage.create_student_with_account(account, record).await?;
    info!(
        "Enrollment received: student {} ({})",
        student.id, student.registration_number
    );

    let payment = if fee_cents > 0 {
        charge_enrollment_fee(storage, integrations, &student, fee_cents).await
    } else {
        None
    };

    Ok(EnrollmentResponse { student, payment })
}

async fn charge_enrollment_fee(
    storage: &Arc<dyn Storage>,
    integrations: &Integrations,
    student: &Student,
    fee_cents: i64,
) -> Option<Payment> {
    let provider = DynamicConfig::default_payment_provider().await;
    if !integrations.has_gateway(provider) {
        warn!("Enrollment fee skipped: provider {} is not configured", provider);
        return None;
    }

    let request = CreatePaymentRequest {
        student_id: student.id,
        amount_cents: fee_cents,
        description: format!("Taxa de matrícula {}", student.registration_number),
        due_date: None,
        kind: Some(PaymentKind::Enrollment),
        provider: Some(provider),
        billing_type: None,
    };
    match create_charge_for_student(storage, integrations, request).await {
        Ok(payment) => Some(payment),
        Err(e) => {
            warn!("Enrollment fee for student {} failed: {}", student.id, e);
            None
        }
    }
}

/// 管理员录入：学籍直接为 approved，提供密码时同时开通账号
pub async fn create_student_record(
    storage: &Arc<dyn Storage>,
    request: CreateStudentRequest,
) -> Result<Student> {
    let contact = validate_contact(
        &request.full_name,
        &request.email,
        request.phone.as_deref(),
        request.guardian_phone.as_deref(),
    )?;
    let class_name = clean(request.class_name);
    ensure_class_exists(storage, class_name.as_deref()).await?;
    ensure_email_free(storage, &contact.email).await?;

    let password = request.password.filter(|p| !p.is_empty());
    if let Some(password) = &password {
        validate_password_simple(password).map_err(PortalError::validation)?;
    }

    let registration_number = generate_registration_number(Utc::now().year());
    let account = match &password {
        Some(password) => Some(student_account(
            &contact,
            &registration_number.to_lowercase(),
            hash_password(password)?,
            UserStatus::Active,
        )),
        None => None,
    };
    let record = NewStudent {
        user_id: None,
        full_name: contact.full_name,
        email: contact.email,
        phone: contact.phone,
        birth_date: request.birth_date,
        guardian_name: clean(request.guardian_name),
        guardian_phone: contact.guardian_phone,
        class_name,
        registration_number,
        enrollment_status: EnrollmentStatus::Approved,
        notes: clean(request.notes),
    };

    let student = match account {
        Some(account) => storage.create_student_with_account(account, record).await?.1,
        None => storage.create_student(record).await?,
    };
    info!("Student {} created by admin", student.id);
    Ok(student)
}
