use super::{SeaOrmStorage, db_error};
use crate::entity::payments::{ActiveModel, Column, Entity as Payments};
use crate::errors::Result;
use crate::models::{
    PaginationInfo, PaginationQuery,
    payments::{
        entities::{Payment, PaymentProvider, PaymentStatus},
        requests::{NewPayment, PaymentListQuery},
        responses::PaymentListResponse,
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, sea_query::Expr,
};

/// 已结算：已支付或已退款
const SETTLED_STATUSES: [&str; 2] = ["paid", "refunded"];

impl SeaOrmStorage {
    pub async fn create_payment_impl(&self, req: NewPayment) -> Result<Payment> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            student_id: Set(req.student_id),
            description: Set(req.description),
            kind: Set(req.kind.to_string()),
            amount_cents: Set(req.amount_cents),
            due_date: Set(req.due_date),
            status: Set(PaymentStatus::Pending.to_string()),
            provider: Set(req.provider.to_string()),
            billing_type: Set(req.billing_type),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| db_error("创建收款失败", e))?;

        Ok(result.into_payment())
    }

    pub async fn attach_payment_charge_impl(
        &self,
        id: i64,
        external_id: &str,
        payment_url: Option<String>,
    ) -> Result<Option<Payment>> {
        let result = Payments::update_many()
            .col_expr(Column::ExternalId, Expr::value(external_id.to_string()))
            .col_expr(Column::PaymentUrl, Expr::value(payment_url))
            .col_expr(Column::UpdatedAt, Expr::value(chrono::Utc::now().timestamp()))
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| db_error("保存网关收款信息失败", e))?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.get_payment_by_id_impl(id).await
    }

    pub async fn get_payment_by_id_impl(&self, id: i64) -> Result<Option<Payment>> {
        let result = Payments::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| db_error("查询收款失败", e))?;

        Ok(result.map(|m| m.into_payment()))
    }

    pub async fn find_payment_by_external_id_impl(
        &self,
        provider: PaymentProvider,
        external_id: &str,
    ) -> Result<Option<Payment>> {
        let result = Payments::find()
            .filter(Column::Provider.eq(provider.as_str()))
            .filter(Column::ExternalId.eq(external_id))
            .one(&self.db)
            .await
            .map_err(|e| db_error("查询收款失败", e))?;

        Ok(result.map(|m| m.into_payment()))
    }

    pub async fn list_payments_with_pagination_impl(
        &self,
        query: PaymentListQuery,
    ) -> Result<PaymentListResponse> {
        let (page, size) = PaginationQuery::normalize(query.page, query.size);

        let mut select = Payments::find();
        if let Some(status) = query.status {
            select = select.filter(Column::Status.eq(status.as_str()));
        }
        if let Some(student_id) = query.student_id {
            select = select.filter(Column::StudentId.eq(student_id));
        }
        if let Some(provider) = query.provider {
            select = select.filter(Column::Provider.eq(provider.as_str()));
        }

        let paginator = select
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| db_error("查询收款总数失败", e))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| db_error("查询收款页数失败", e))?;
        let items = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| db_error("查询收款列表失败", e))?;

        Ok(PaymentListResponse {
            items: items.into_iter().map(|m| m.into_payment()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    pub async fn list_payments_by_student_impl(&self, student_id: i64) -> Result<Vec<Payment>> {
        let result = Payments::find()
            .filter(Column::StudentId.eq(student_id))
            .order_by_asc(Column::DueDate)
            .all(&self.db)
            .await
            .map_err(|e| db_error("查询学生收款失败", e))?;

        Ok(result.into_iter().map(|m| m.into_payment()).collect())
    }

    /// 条件更新：已支付或已退款的收款不会被改写，重复回调返回 false
    pub async fn mark_payment_paid_impl(&self, id: i64, paid_at: i64) -> Result<bool> {
        let result = Payments::update_many()
            .col_expr(Column::Status, Expr::value(PaymentStatus::Paid.as_str()))
            .col_expr(Column::PaidAt, Expr::value(paid_at))
            .col_expr(Column::UpdatedAt, Expr::value(chrono::Utc::now().timestamp()))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.is_not_in(SETTLED_STATUSES))
            .exec(&self.db)
            .await
            .map_err(|e| db_error("更新收款状态失败", e))?;

        Ok(result.rows_affected > 0)
    }

    /// 退款是已支付收款唯一允许的去向；其余状态不覆盖已支付或已退款的收款
    pub async fn update_payment_status_impl(&self, id: i64, status: PaymentStatus) -> Result<bool> {
        let mut update = Payments::update_many()
            .col_expr(Column::Status, Expr::value(status.as_str()))
            .col_expr(Column::UpdatedAt, Expr::value(chrono::Utc::now().timestamp()))
            .filter(Column::Id.eq(id));
        update = if status == PaymentStatus::Refunded {
            update.filter(Column::Status.ne(PaymentStatus::Refunded.as_str()))
        } else {
            update.filter(Column::Status.is_not_in(SETTLED_STATUSES))
        };

        let result = update
            .exec(&self.db)
            .await
            .map_err(|e| db_error("更新收款状态失败", e))?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count_payments_by_status_impl(&self, status: PaymentStatus) -> Result<u64> {
        Payments::find()
            .filter(Column::Status.eq(status.as_str()))
            .count(&self.db)
            .await
            .map_err(|e| db_error("统计收款数量失败", e))
    }

    /// 指定时间之后已收金额（分）
    pub async fn sum_payments_paid_since_impl(&self, since: i64) -> Result<i64> {
        let amounts: Vec<i64> = Payments::find()
            .select_only()
            .column(Column::AmountCents)
            .filter(Column::Status.eq(PaymentStatus::Paid.as_str()))
            .filter(Column::PaidAt.gte(since))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| db_error("统计收款金额失败", e))?;

        Ok(amounts.into_iter().sum())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::payments::entities::PaymentKind;
    use crate::storage::sea_orm_storage::students::tests::new_student;
    use chrono::NaiveDate;

    pub(crate) fn new_payment(student_id: i64, amount_cents: i64) -> NewPayment {
        NewPayment {
            student_id,
            description: "Matrícula 2025".to_string(),
            kind: PaymentKind::Enrollment,
            amount_cents,
            due_date: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap(),
            provider: PaymentProvider::Asaas,
            billing_type: Some("PIX".to_string()),
        }
    }

    #[tokio::test]
    async fn test_mark_paid_is_idempotent() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let student = storage
            .create_student_impl(new_student("Caio", None))
            .await
            .unwrap();
        let payment = storage
            .create_payment_impl(new_payment(student.id, 15000))
            .await
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);

        assert!(storage.mark_payment_paid_impl(payment.id, 1_000).await.unwrap());
        assert!(!storage.mark_payment_paid_impl(payment.id, 2_000).await.unwrap());

        let paid = storage.get_payment_by_id_impl(payment.id).await.unwrap().unwrap();
        assert_eq!(paid.status, PaymentStatus::Paid);
        assert_eq!(paid.paid_at.map(|t| t.timestamp()), Some(1_000));

        // 已支付的收款不会被回调改成逾期
        assert!(!storage
            .update_payment_status_impl(payment.id, PaymentStatus::Overdue)
            .await
            .unwrap());
        assert_eq!(storage.sum_payments_paid_since_impl(500).await.unwrap(), 15000);
        assert_eq!(storage.sum_payments_paid_since_impl(1_500).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_refund_moves_paid_payment_and_is_final() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let student = storage
            .create_student_impl(new_student("Bia", None))
            .await
            .unwrap();
        let payment = storage
            .create_payment_impl(new_payment(student.id, 8000))
            .await
            .unwrap();
        storage.mark_payment_paid_impl(payment.id, 1_000).await.unwrap();

        assert!(storage
            .update_payment_status_impl(payment.id, PaymentStatus::Refunded)
            .await
            .unwrap());
        assert_eq!(storage.sum_payments_paid_since_impl(0).await.unwrap(), 0);

        // 退款后不再接受到账或其他状态
        assert!(!storage.mark_payment_paid_impl(payment.id, 2_000).await.unwrap());
        assert!(!storage
            .update_payment_status_impl(payment.id, PaymentStatus::Overdue)
            .await
            .unwrap());
        let stored = storage.get_payment_by_id_impl(payment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn test_lookup_by_external_id() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let student = storage
            .create_student_impl(new_student("Duda", None))
            .await
            .unwrap();
        let payment = storage
            .create_payment_impl(new_payment(student.id, 5000))
            .await
            .unwrap();
        storage
            .attach_payment_charge_impl(
                payment.id,
                "pay_123",
                Some("https://pay.example/123".to_string()),
            )
            .await
            .unwrap();

        let found = storage
            .find_payment_by_external_id_impl(PaymentProvider::Asaas, "pay_123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, payment.id);
        assert!(storage
            .find_payment_by_external_id_impl(PaymentProvider::MercadoPago, "pay_123")
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            storage
                .count_payments_by_status_impl(PaymentStatus::Pending)
                .await
                .unwrap(),
            1
        );
    }
}
