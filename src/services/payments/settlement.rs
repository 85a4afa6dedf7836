//! 回调结算
//!
//! 各网关的回调先转换为 `SettlementEvent`，再统一走
//! 标记已支付 → 审核学籍（报名费）→ 通知 的处理链。
//! 已支付的收款不会重复结算，除退款与拒付外也不会被改回其他状态。

use std::sync::Arc;
use tracing::{info, warn};

use super::asaas::map_asaas_status;
use super::gateway::PaymentGateway;
use crate::errors::Result;
use crate::models::payments::entities::{Payment, PaymentKind, PaymentProvider, PaymentStatus};
use crate::models::payments::requests::{AsaasWebhookPayload, MercadoPagoWebhookPayload};
use crate::models::payments::responses::SettlementOutcome;
use crate::models::students::entities::EnrollmentStatus;
use crate::services::integrations::Integrations;
use crate::services::students::approval::approve_student;
use crate::storage::Storage;

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    Paid,
    StatusChanged(PaymentStatus),
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettlementEvent {
    pub provider: PaymentProvider,
    /// 网关侧 ID
    pub external_id: String,
    /// 下单时传入的本地收款 ID
    pub external_reference: Option<String>,
    pub event: PaymentEvent,
}

fn event_for_status(status: Option<PaymentStatus>) -> PaymentEvent {
    match status {
        Some(PaymentStatus::Paid) => PaymentEvent::Paid,
        Some(other) => PaymentEvent::StatusChanged(other),
        None => PaymentEvent::Ignored,
    }
}

/// Asaas 回调自带状态，直接按事件名转换
pub fn asaas_event(payload: &AsaasWebhookPayload) -> Option<SettlementEvent> {
    let payment = payload.payment.as_ref()?;
    let event = match payload.event.as_str() {
        "PAYMENT_RECEIVED" | "PAYMENT_CONFIRMED" | "PAYMENT_RECEIVED_IN_CASH" => PaymentEvent::Paid,
        "PAYMENT_OVERDUE" => PaymentEvent::StatusChanged(PaymentStatus::Overdue),
        "PAYMENT_REFUNDED" | "PAYMENT_CHARGEBACK_REQUESTED" => {
            PaymentEvent::StatusChanged(PaymentStatus::Refunded)
        }
        "PAYMENT_DELETED" => PaymentEvent::StatusChanged(PaymentStatus::Cancelled),
        "PAYMENT_UPDATED" => event_for_status(payment.status.as_deref().and_then(map_asaas_status)),
        _ => PaymentEvent::Ignored,
    };

    Some(SettlementEvent {
        provider: PaymentProvider::Asaas,
        external_id: payment.id.clone(),
        external_reference: payment.external_reference.clone(),
        event,
    })
}

/// Mercado Pago 回调只有支付 ID，需要向网关回查状态
pub async fn mercado_pago_event(
    payload: &MercadoPagoWebhookPayload,
    gateway: &dyn PaymentGateway,
) -> Result<Option<SettlementEvent>> {
    let is_payment = payload.kind.as_deref() == Some("payment")
        || payload
            .action
            .as_deref()
            .is_some_and(|a| a.starts_with("payment."));
    let Some(data) = payload.data.as_ref().filter(|_| is_payment) else {
        return Ok(None);
    };

    let remote = gateway.fetch_status(&data.id).await?;
    Ok(Some(SettlementEvent {
        provider: PaymentProvider::MercadoPago,
        external_id: data.id.clone(),
        external_reference: remote.external_reference,
        event: event_for_status(remote.status),
    }))
}

/// 共享密钥比对；未配置密钥时一律拒绝
pub fn verify_shared_secret(configured: &str, provided: Option<&str>) -> bool {
    !configured.is_empty() && provided == Some(configured)
}

async fn find_payment(storage: &Arc<dyn Storage>, event: &SettlementEvent) -> Result<Option<Payment>> {
    if let Some(id) = event
        .external_reference
        .as_deref()
        .and_then(|r| r.trim().parse::<i64>().ok())
        && let Some(payment) = storage.get_payment_by_id(id).await?
    {
        return Ok(Some(payment));
    }
    storage
        .find_payment_by_external_id(event.provider, &event.external_id)
        .await
}

pub async fn settle(
    storage: &Arc<dyn Storage>,
    integrations: &Integrations,
    event: SettlementEvent,
) -> Result<SettlementOutcome> {
    if event.event == PaymentEvent::Ignored {
        return Ok(SettlementOutcome::Ignored);
    }

    let Some(payment) = find_payment(storage, &event).await? else {
        warn!(
            "Webhook from {} for unknown payment {} (reference {:?})",
            event.provider, event.external_id, event.external_reference
        );
        return Ok(SettlementOutcome::UnknownPayment);
    };

    match event.event {
        PaymentEvent::Paid => {
            let paid_at = chrono::Utc::now().timestamp();
            if !storage.mark_payment_paid(payment.id, paid_at).await? {
                info!("Payment {} already settled, ignoring duplicate webhook", payment.id);
                return Ok(SettlementOutcome::AlreadySettled {
                    payment_id: payment.id,
                });
            }
            info!("Payment {} settled via {}", payment.id, event.provider);

            let student_approved = if payment.kind == PaymentKind::Enrollment {
                approve_after_payment(storage, integrations, &payment).await
            } else {
                false
            };

            Ok(SettlementOutcome::Settled {
                payment_id: payment.id,
                student_approved,
            })
        }
        PaymentEvent::StatusChanged(status) => {
            // 已支付的收款只接受退款，且不重新走审核
            if !storage.update_payment_status(payment.id, status).await? {
                info!("Payment {} keeps status {}, ignoring {}", payment.id, payment.status, status);
                return Ok(SettlementOutcome::AlreadySettled {
                    payment_id: payment.id,
                });
            }
            info!("Payment {} is now {}", payment.id, status);
            Ok(SettlementOutcome::StatusUpdated {
                payment_id: payment.id,
                status,
            })
        }
        PaymentEvent::Ignored => Ok(SettlementOutcome::Ignored),
    }
}

/// 报名费到账后审核学籍；失败只记日志，收款结算不回滚
async fn approve_after_payment(
    storage: &Arc<dyn Storage>,
    integrations: &Integrations,
    payment: &Payment,
) -> bool {
    match storage.get_student_by_id(payment.student_id).await {
        Ok(Some(student)) if student.enrollment_status == EnrollmentStatus::Pending => {}
        Ok(_) => return false,
        Err(e) => {
            warn!("Could not load student {}: {}", payment.student_id, e);
            return false;
        }
    }

    match approve_student(storage, integrations, payment.student_id).await {
        Ok(result) => !result.unchanged,
        Err(e) => {
            warn!(
                "Auto-approval after payment {} failed for student {}: {}",
                payment.id, payment.student_id, e
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payments::requests::{
        AsaasWebhookPayment, MercadoPagoWebhookData, NewPayment,
    };
    use crate::models::students::requests::NewStudent;
    use crate::services::payments::gateway::GatewayPaymentStatus;
    use crate::services::testing::{FakeEmail, FakeGateway, FakeSender, fake_integrations, memory_storage};
    use chrono::NaiveDate;

    async fn seed(storage: &Arc<dyn Storage>, kind: PaymentKind) -> Payment {
        let student = storage
            .create_student(NewStudent {
                user_id: None,
                full_name: "Téo Ramos".to_string(),
                email: "teo@aluno.test".to_string(),
                phone: None,
                birth_date: None,
                guardian_name: None,
                guardian_phone: None,
                class_name: None,
                registration_number: "2025TEO001".to_string(),
                enrollment_status: EnrollmentStatus::Pending,
                notes: None,
            })
            .await
            .unwrap();
        let payment = storage
            .create_payment(NewPayment {
                student_id: student.id,
                description: "Taxa de matrícula".to_string(),
                kind,
                amount_cents: 20000,
                due_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                provider: PaymentProvider::Asaas,
                billing_type: None,
            })
            .await
            .unwrap();
        storage
            .attach_payment_charge(payment.id, "pay_abc", None)
            .await
            .unwrap()
            .unwrap()
    }

    fn asaas(event: &str, reference: Option<String>) -> AsaasWebhookPayload {
        AsaasWebhookPayload {
            event: event.to_string(),
            payment: Some(AsaasWebhookPayment {
                id: "pay_abc".to_string(),
                external_reference: reference,
                status: None,
                value: Some(200.0),
            }),
        }
    }

    fn integrations() -> Integrations {
        fake_integrations(
            Arc::new(FakeEmail::default()),
            Arc::new(FakeSender::new()),
            vec![],
        )
    }

    #[test]
    fn test_asaas_event_mapping() {
        let paid = asaas_event(&asaas("PAYMENT_RECEIVED", None)).unwrap();
        assert_eq!(paid.event, PaymentEvent::Paid);
        let overdue = asaas_event(&asaas("PAYMENT_OVERDUE", None)).unwrap();
        assert_eq!(overdue.event, PaymentEvent::StatusChanged(PaymentStatus::Overdue));
        let deleted = asaas_event(&asaas("PAYMENT_DELETED", None)).unwrap();
        assert_eq!(deleted.event, PaymentEvent::StatusChanged(PaymentStatus::Cancelled));
        let created = asaas_event(&asaas("PAYMENT_CREATED", None)).unwrap();
        assert_eq!(created.event, PaymentEvent::Ignored);

        let no_payment = AsaasWebhookPayload {
            event: "PAYMENT_RECEIVED".to_string(),
            payment: None,
        };
        assert!(asaas_event(&no_payment).is_none());
    }

    #[test]
    fn test_shared_secret() {
        assert!(verify_shared_secret("tok", Some("tok")));
        assert!(!verify_shared_secret("tok", Some("other")));
        assert!(!verify_shared_secret("tok", None));
        assert!(!verify_shared_secret("", Some("")));
    }

    #[tokio::test]
    async fn test_enrollment_fee_settles_and_approves_once() {
        let storage = memory_storage().await;
        let payment = seed(&storage, PaymentKind::Enrollment).await;
        let integrations = integrations();
        let event = asaas_event(&asaas("PAYMENT_CONFIRMED", Some(payment.id.to_string()))).unwrap();

        let first = settle(&storage, &integrations, event.clone()).await.unwrap();
        assert_eq!(
            first,
            SettlementOutcome::Settled {
                payment_id: payment.id,
                student_approved: true
            }
        );
        let student = storage.get_student_by_id(payment.student_id).await.unwrap().unwrap();
        assert_eq!(student.enrollment_status, EnrollmentStatus::Approved);

        let second = settle(&storage, &integrations, event).await.unwrap();
        assert_eq!(
            second,
            SettlementOutcome::AlreadySettled {
                payment_id: payment.id
            }
        );
    }

    #[tokio::test]
    async fn test_lookup_by_external_id_when_reference_missing() {
        let storage = memory_storage().await;
        let payment = seed(&storage, PaymentKind::Tuition).await;
        let event = asaas_event(&asaas("PAYMENT_RECEIVED", None)).unwrap();

        let outcome = settle(&storage, &integrations(), event).await.unwrap();
        assert_eq!(
            outcome,
            SettlementOutcome::Settled {
                payment_id: payment.id,
                student_approved: false
            }
        );
        let stored = storage.get_payment_by_id(payment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Paid);
        assert!(stored.paid_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_payment_is_acknowledged() {
        let storage = memory_storage().await;
        let mut payload = asaas("PAYMENT_RECEIVED", Some("999".to_string()));
        if let Some(p) = payload.payment.as_mut() {
            p.id = "pay_other".to_string();
        }
        let outcome = settle(&storage, &integrations(), asaas_event(&payload).unwrap())
            .await
            .unwrap();
        assert_eq!(outcome, SettlementOutcome::UnknownPayment);
    }

    #[tokio::test]
    async fn test_overdue_never_overwrites_paid() {
        let storage = memory_storage().await;
        let payment = seed(&storage, PaymentKind::Tuition).await;
        let reference = Some(payment.id.to_string());
        let integrations = integrations();

        let outcome = settle(
            &storage,
            &integrations,
            asaas_event(&asaas("PAYMENT_OVERDUE", reference.clone())).unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(
            outcome,
            SettlementOutcome::StatusUpdated {
                payment_id: payment.id,
                status: PaymentStatus::Overdue
            }
        );

        settle(
            &storage,
            &integrations,
            asaas_event(&asaas("PAYMENT_RECEIVED", reference.clone())).unwrap(),
        )
        .await
        .unwrap();
        let late = settle(
            &storage,
            &integrations,
            asaas_event(&asaas("PAYMENT_OVERDUE", reference)).unwrap(),
        )
        .await
        .unwrap();
        assert!(matches!(late, SettlementOutcome::AlreadySettled { .. }));
        let stored = storage.get_payment_by_id(payment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_refund_after_payment_is_stored() {
        let storage = memory_storage().await;
        let payment = seed(&storage, PaymentKind::Enrollment).await;
        let reference = Some(payment.id.to_string());
        let integrations = integrations();

        settle(
            &storage,
            &integrations,
            asaas_event(&asaas("PAYMENT_RECEIVED", reference.clone())).unwrap(),
        )
        .await
        .unwrap();
        let refunded = settle(
            &storage,
            &integrations,
            asaas_event(&asaas("PAYMENT_REFUNDED", reference.clone())).unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(
            refunded,
            SettlementOutcome::StatusUpdated {
                payment_id: payment.id,
                status: PaymentStatus::Refunded
            }
        );
        let stored = storage.get_payment_by_id(payment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Refunded);
        // 学籍审核结果不受退款影响
        let student = storage.get_student_by_id(payment.student_id).await.unwrap().unwrap();
        assert_eq!(student.enrollment_status, EnrollmentStatus::Approved);

        let chargeback = settle(
            &storage,
            &integrations,
            asaas_event(&asaas("PAYMENT_CHARGEBACK_REQUESTED", reference)).unwrap(),
        )
        .await
        .unwrap();
        assert!(matches!(chargeback, SettlementOutcome::AlreadySettled { .. }));
    }

    #[tokio::test]
    async fn test_payment_updated_with_refunded_status() {
        let storage = memory_storage().await;
        let payment = seed(&storage, PaymentKind::Tuition).await;
        let integrations = integrations();
        storage.mark_payment_paid(payment.id, 1_000).await.unwrap();

        let mut payload = asaas("PAYMENT_UPDATED", Some(payment.id.to_string()));
        if let Some(p) = payload.payment.as_mut() {
            p.status = Some("REFUNDED".to_string());
        }
        let event = asaas_event(&payload).unwrap();
        assert_eq!(event.event, PaymentEvent::StatusChanged(PaymentStatus::Refunded));

        let outcome = settle(&storage, &integrations, event).await.unwrap();
        assert!(matches!(
            outcome,
            SettlementOutcome::StatusUpdated {
                status: PaymentStatus::Refunded,
                ..
            }
        ));
        assert_eq!(storage.sum_payments_paid_since(0).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mercado_pago_event_queries_gateway() {
        let gateway = FakeGateway::new(PaymentProvider::MercadoPago);
        *gateway.remote_status.lock().unwrap() = Some(GatewayPaymentStatus {
            status: Some(PaymentStatus::Paid),
            external_reference: Some("12".to_string()),
        });
        let payload = MercadoPagoWebhookPayload {
            kind: Some("payment".to_string()),
            action: Some("payment.updated".to_string()),
            data: Some(MercadoPagoWebhookData {
                id: "555".to_string(),
            }),
        };

        let event = mercado_pago_event(&payload, &gateway).await.unwrap().unwrap();
        assert_eq!(event.event, PaymentEvent::Paid);
        assert_eq!(event.external_reference.as_deref(), Some("12"));
        assert_eq!(event.external_id, "555");

        let merchant_order = MercadoPagoWebhookPayload {
            kind: Some("merchant_order".to_string()),
            action: None,
            data: Some(MercadoPagoWebhookData {
                id: "1".to_string(),
            }),
        };
        assert!(mercado_pago_event(&merchant_order, &gateway).await.unwrap().is_none());
    }
}
