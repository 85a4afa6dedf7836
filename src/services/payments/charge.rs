//! 为学生生成收款
//!
//! 管理端、报名流程和边缘函数共用。先写入本地收款记录，再以本地 ID 作为
//! externalReference 向网关下单；网关失败时本地记录标记为取消。

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use super::gateway::{ChargeCustomer, ChargeRequest};
use crate::errors::{PortalError, Result};
use crate::models::payments::entities::{Payment, PaymentKind, PaymentProvider, PaymentStatus};
use crate::models::payments::requests::{CreatePaymentRequest, NewPayment};
use crate::services::integrations::Integrations;
use crate::services::system::DynamicConfig;
use crate::storage::Storage;
use crate::utils::normalize_phone;
use crate::utils::validate::validate_required_text;

/// 未指定到期日时的默认期限（天）
const DEFAULT_DUE_DAYS: i64 = 3;

pub async fn create_charge_for_student(
    storage: &Arc<dyn Storage>,
    integrations: &Integrations,
    request: CreatePaymentRequest,
) -> Result<Payment> {
    if request.amount_cents <= 0 {
        return Err(PortalError::validation("amount_cents must be greater than zero"));
    }
    validate_required_text(&request.description, "description", 200)
        .map_err(PortalError::validation)?;

    let student = storage
        .get_student_by_id(request.student_id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("Student {} not found", request.student_id)))?;

    let provider = match request.provider {
        Some(provider) => provider,
        None => DynamicConfig::default_payment_provider().await,
    };
    let gateway = match provider {
        PaymentProvider::Manual => None,
        other => Some(integrations.gateway(other)?),
    };

    let due_date = request
        .due_date
        .unwrap_or_else(|| Utc::now().date_naive() + Duration::days(DEFAULT_DUE_DAYS));

    let payment = storage
        .create_payment(NewPayment {
            student_id: student.id,
            description: request.description.trim().to_string(),
            kind: request.kind.unwrap_or(PaymentKind::Tuition),
            amount_cents: request.amount_cents,
            due_date,
            provider,
            billing_type: request.billing_type.clone(),
        })
        .await?;

    let Some(gateway) = gateway else {
        info!("Manual payment {} created for student {}", payment.id, student.id);
        return Ok(payment);
    };

    let charge_request = ChargeRequest {
        payment_id: payment.id,
        customer: ChargeCustomer {
            name: student.full_name.clone(),
            email: student.email.clone(),
            phone: student.contact_phone().and_then(normalize_phone),
        },
        amount_cents: payment.amount_cents,
        description: payment.description.clone(),
        due_date,
        billing_type: request.billing_type,
    };

    match gateway.create_charge(&charge_request).await {
        Ok(charge) => {
            let payment = storage
                .attach_payment_charge(payment.id, &charge.external_id, charge.payment_url)
                .await?
                .ok_or_else(|| PortalError::not_found(format!("Payment {} vanished", payment.id)))?;
            info!(
                "Charge {} created on {} for payment {}",
                charge.external_id, provider, payment.id
            );
            Ok(payment)
        }
        Err(e) => {
            warn!("Gateway {} rejected payment {}: {}", provider, payment.id, e);
            storage
                .update_payment_status(payment.id, PaymentStatus::Cancelled)
                .await?;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::students::entities::EnrollmentStatus;
    use crate::models::students::requests::NewStudent;
    use crate::services::testing::{FakeEmail, FakeGateway, FakeSender, fake_integrations, memory_storage};

    async fn seed_student(storage: &Arc<dyn Storage>) -> i64 {
        storage
            .create_student(NewStudent {
                user_id: None,
                full_name: "Caio Prado".to_string(),
                email: "caio@aluno.test".to_string(),
                phone: Some("(11) 98888-7777".to_string()),
                birth_date: None,
                guardian_name: None,
                guardian_phone: None,
                class_name: Some("2B".to_string()),
                registration_number: "2025CAIO01".to_string(),
                enrollment_status: EnrollmentStatus::Approved,
                notes: None,
            })
            .await
            .unwrap()
            .id
    }

    fn request(student_id: i64, provider: Option<PaymentProvider>) -> CreatePaymentRequest {
        CreatePaymentRequest {
            student_id,
            amount_cents: 45000,
            description: "Mensalidade abril".to_string(),
            due_date: None,
            kind: None,
            provider,
            billing_type: Some("PIX".to_string()),
        }
    }

    #[tokio::test]
    async fn test_charge_through_gateway() {
        let storage = memory_storage().await;
        let student_id = seed_student(&storage).await;
        let gateway = Arc::new(FakeGateway::new(PaymentProvider::Asaas));
        let integrations = fake_integrations(
            Arc::new(FakeEmail::default()),
            Arc::new(FakeSender::new()),
            vec![gateway.clone()],
        );

        let payment = create_charge_for_student(
            &storage,
            &integrations,
            request(student_id, Some(PaymentProvider::Asaas)),
        )
        .await
        .unwrap();

        assert_eq!(payment.external_id, Some(format!("ext_{}", payment.id)));
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.kind, PaymentKind::Tuition);
        let charges = gateway.charges.lock().unwrap();
        assert_eq!(charges[0].customer.phone.as_deref(), Some("5511988887777"));
        assert_eq!(charges[0].payment_id, payment.id);
    }

    #[tokio::test]
    async fn test_manual_payment_skips_gateway() {
        let storage = memory_storage().await;
        let student_id = seed_student(&storage).await;
        let integrations = fake_integrations(
            Arc::new(FakeEmail::default()),
            Arc::new(FakeSender::new()),
            vec![],
        );

        let payment = create_charge_for_student(
            &storage,
            &integrations,
            request(student_id, Some(PaymentProvider::Manual)),
        )
        .await
        .unwrap();
        assert_eq!(payment.provider, PaymentProvider::Manual);
        assert!(payment.external_id.is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_rejected_before_insert() {
        let storage = memory_storage().await;
        let student_id = seed_student(&storage).await;
        let integrations = fake_integrations(
            Arc::new(FakeEmail::default()),
            Arc::new(FakeSender::new()),
            vec![],
        );

        let err = create_charge_for_student(
            &storage,
            &integrations,
            request(student_id, Some(PaymentProvider::MercadoPago)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PortalError::Configuration(_)));
        assert!(storage.list_payments_by_student(student_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_failure_cancels_local_record() {
        let storage = memory_storage().await;
        let student_id = seed_student(&storage).await;
        let mut gateway = FakeGateway::new(PaymentProvider::Asaas);
        gateway.fail = true;
        let integrations = fake_integrations(
            Arc::new(FakeEmail::default()),
            Arc::new(FakeSender::new()),
            vec![Arc::new(gateway)],
        );

        let err = create_charge_for_student(
            &storage,
            &integrations,
            request(student_id, Some(PaymentProvider::Asaas)),
        )
        .await
        .unwrap_err();
        assert!(err.is_external());

        let payments = storage.list_payments_by_student(student_id).await.unwrap();
        assert_eq!(payments[0].status, PaymentStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_invalid_amount_and_missing_student() {
        let storage = memory_storage().await;
        let integrations = fake_integrations(
            Arc::new(FakeEmail::default()),
            Arc::new(FakeSender::new()),
            vec![],
        );

        let mut bad = request(1, Some(PaymentProvider::Manual));
        bad.amount_cents = 0;
        assert!(matches!(
            create_charge_for_student(&storage, &integrations, bad).await,
            Err(PortalError::Validation(_))
        ));

        assert!(matches!(
            create_charge_for_student(&storage, &integrations, request(99, Some(PaymentProvider::Manual))).await,
            Err(PortalError::NotFound(_))
        ));
    }
}
