//! WhatsApp 群发任务与接收人

use super::{SeaOrmStorage, db_error};
use crate::entity::broadcast_recipients::{
    ActiveModel as RecipientActiveModel, Column as RecipientColumn, Entity as Recipients,
};
use crate::entity::broadcasts::{ActiveModel, Column, Entity as Broadcasts};
use crate::errors::Result;
use crate::models::{
    PaginationInfo, PaginationQuery,
    messaging::{
        entities::{Broadcast, BroadcastRecipient, BroadcastStatus, RecipientStatus},
        requests::{NewBroadcast, NewRecipient},
        responses::BroadcastListResponse,
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, sea_query::Expr,
};

impl SeaOrmStorage {
    /// 创建任务与接收人，初始状态为运行中
    pub async fn create_broadcast_impl(
        &self,
        broadcast: NewBroadcast,
        recipients: Vec<NewRecipient>,
    ) -> Result<Broadcast> {
        let now = chrono::Utc::now().timestamp();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| db_error("开启事务失败", e))?;

        let created = ActiveModel {
            message: Set(broadcast.message),
            status: Set(BroadcastStatus::Running.to_string()),
            total: Set(recipients.len() as i32),
            sent: Set(0),
            failed: Set(0),
            created_by: Set(broadcast.created_by),
            min_delay_ms: Set(broadcast.min_delay_ms),
            max_delay_ms: Set(broadcast.max_delay_ms),
            finished_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| db_error("创建群发任务失败", e))?;

        if !recipients.is_empty() {
            let rows = recipients.into_iter().map(|r| RecipientActiveModel {
                broadcast_id: Set(created.id),
                student_id: Set(r.student_id),
                name: Set(r.name),
                phone: Set(r.phone),
                status: Set(RecipientStatus::Pending.to_string()),
                error: Set(None),
                sent_at: Set(None),
                ..Default::default()
            });
            Recipients::insert_many(rows)
                .exec(&txn)
                .await
                .map_err(|e| db_error("写入群发接收人失败", e))?;
        }

        txn.commit()
            .await
            .map_err(|e| db_error("提交事务失败", e))?;

        Ok(created.into_broadcast())
    }

    pub async fn get_broadcast_by_id_impl(&self, id: i64) -> Result<Option<Broadcast>> {
        let result = Broadcasts::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| db_error("查询群发任务失败", e))?;

        Ok(result.map(|m| m.into_broadcast()))
    }

    pub async fn list_broadcasts_with_pagination_impl(
        &self,
        page: Option<i64>,
        size: Option<i64>,
    ) -> Result<BroadcastListResponse> {
        let (page, size) = PaginationQuery::normalize(page, size);

        let paginator = Broadcasts::find()
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| db_error("查询群发总数失败", e))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| db_error("查询群发页数失败", e))?;
        let items = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| db_error("查询群发列表失败", e))?;

        Ok(BroadcastListResponse {
            items: items.into_iter().map(|m| m.into_broadcast()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    /// 按插入顺序返回，发送顺序即此顺序
    pub async fn list_broadcast_recipients_impl(
        &self,
        broadcast_id: i64,
        status: Option<RecipientStatus>,
    ) -> Result<Vec<BroadcastRecipient>> {
        let mut select = Recipients::find().filter(RecipientColumn::BroadcastId.eq(broadcast_id));
        if let Some(status) = status {
            select = select.filter(RecipientColumn::Status.eq(status.as_str()));
        }

        let result = select
            .order_by_asc(RecipientColumn::Id)
            .all(&self.db)
            .await
            .map_err(|e| db_error("查询群发接收人失败", e))?;

        Ok(result.into_iter().map(|m| m.into_recipient()).collect())
    }

    pub async fn mark_recipient_sent_impl(&self, broadcast_id: i64, recipient_id: i64) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| db_error("开启事务失败", e))?;

        let updated = Recipients::update_many()
            .col_expr(RecipientColumn::Status, Expr::value(RecipientStatus::Sent.as_str()))
            .col_expr(RecipientColumn::Error, Expr::value(Option::<String>::None))
            .col_expr(RecipientColumn::SentAt, Expr::value(now))
            .filter(RecipientColumn::Id.eq(recipient_id))
            .filter(RecipientColumn::BroadcastId.eq(broadcast_id))
            .filter(RecipientColumn::Status.ne(RecipientStatus::Sent.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| db_error("更新接收人状态失败", e))?;

        if updated.rows_affected > 0 {
            Broadcasts::update_many()
                .col_expr(Column::Sent, Expr::cust("sent + 1"))
                .col_expr(Column::UpdatedAt, Expr::value(now))
                .filter(Column::Id.eq(broadcast_id))
                .exec(&txn)
                .await
                .map_err(|e| db_error("更新群发进度失败", e))?;
        }

        txn.commit()
            .await
            .map_err(|e| db_error("提交事务失败", e))
    }

    pub async fn mark_recipient_failed_impl(
        &self,
        broadcast_id: i64,
        recipient_id: i64,
        error: &str,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| db_error("开启事务失败", e))?;

        let updated = Recipients::update_many()
            .col_expr(RecipientColumn::Status, Expr::value(RecipientStatus::Failed.as_str()))
            .col_expr(RecipientColumn::Error, Expr::value(error.to_string()))
            .filter(RecipientColumn::Id.eq(recipient_id))
            .filter(RecipientColumn::BroadcastId.eq(broadcast_id))
            .filter(RecipientColumn::Status.eq(RecipientStatus::Pending.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| db_error("更新接收人状态失败", e))?;

        if updated.rows_affected > 0 {
            Broadcasts::update_many()
                .col_expr(Column::Failed, Expr::cust("failed + 1"))
                .col_expr(Column::UpdatedAt, Expr::value(now))
                .filter(Column::Id.eq(broadcast_id))
                .exec(&txn)
                .await
                .map_err(|e| db_error("更新群发进度失败", e))?;
        }

        txn.commit()
            .await
            .map_err(|e| db_error("提交事务失败", e))
    }

    /// 进入已结束状态时记录结束时间
    pub async fn set_broadcast_status_impl(&self, id: i64, status: BroadcastStatus) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let finished_at = status.is_finished().then_some(now);

        let result = Broadcasts::update_many()
            .col_expr(Column::Status, Expr::value(status.as_str()))
            .col_expr(Column::FinishedAt, Expr::value(finished_at))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| db_error("更新群发状态失败", e))?;

        Ok(result.rows_affected > 0)
    }

    pub async fn reset_failed_recipients_impl(&self, broadcast_id: i64) -> Result<u64> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| db_error("开启事务失败", e))?;

        let reset = Recipients::update_many()
            .col_expr(RecipientColumn::Status, Expr::value(RecipientStatus::Pending.as_str()))
            .col_expr(RecipientColumn::Error, Expr::value(Option::<String>::None))
            .filter(RecipientColumn::BroadcastId.eq(broadcast_id))
            .filter(RecipientColumn::Status.eq(RecipientStatus::Failed.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| db_error("重置失败接收人失败", e))?
            .rows_affected;

        if reset > 0 {
            Broadcasts::update_many()
                .col_expr(Column::Failed, Expr::cust(format!("failed - {reset}")))
                .col_expr(Column::UpdatedAt, Expr::value(chrono::Utc::now().timestamp()))
                .filter(Column::Id.eq(broadcast_id))
                .exec(&txn)
                .await
                .map_err(|e| db_error("更新群发进度失败", e))?;
        }

        txn.commit()
            .await
            .map_err(|e| db_error("提交事务失败", e))?;

        Ok(reset)
    }

    pub async fn pause_running_broadcasts_impl(&self) -> Result<u64> {
        let result = Broadcasts::update_many()
            .col_expr(Column::Status, Expr::value(BroadcastStatus::Paused.as_str()))
            .col_expr(Column::UpdatedAt, Expr::value(chrono::Utc::now().timestamp()))
            .filter(Column::Status.eq(BroadcastStatus::Running.as_str()))
            .exec(&self.db)
            .await
            .map_err(|e| db_error("暂停遗留群发任务失败", e))?;

        Ok(result.rows_affected)
    }

    pub async fn count_active_broadcasts_impl(&self) -> Result<u64> {
        Broadcasts::find()
            .filter(Column::Status.is_in([
                BroadcastStatus::Running.as_str(),
                BroadcastStatus::Paused.as_str(),
            ]))
            .count(&self.db)
            .await
            .map_err(|e| db_error("统计群发任务失败", e))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::users::entities::UserRole;
    use crate::storage::sea_orm_storage::users::tests::new_user;

    pub(crate) async fn seed_broadcast(storage: &SeaOrmStorage, phones: &[&str]) -> Broadcast {
        let admin = storage
            .create_user_impl(new_user("secretaria", UserRole::Admin))
            .await
            .unwrap();
        storage
            .create_broadcast_impl(
                NewBroadcast {
                    message: "Reunião de pais sexta-feira".to_string(),
                    created_by: admin.id,
                    min_delay_ms: 0,
                    max_delay_ms: 0,
                },
                phones
                    .iter()
                    .map(|p| NewRecipient {
                        student_id: None,
                        name: None,
                        phone: p.to_string(),
                    })
                    .collect(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_progress_counters() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let broadcast = seed_broadcast(&storage, &["5511999990001", "5511999990002"]).await;
        assert_eq!(broadcast.total, 2);
        assert_eq!(broadcast.status, BroadcastStatus::Running);

        let recipients = storage
            .list_broadcast_recipients_impl(broadcast.id, Some(RecipientStatus::Pending))
            .await
            .unwrap();
        assert_eq!(recipients.len(), 2);

        storage
            .mark_recipient_sent_impl(broadcast.id, recipients[0].id)
            .await
            .unwrap();
        // 重复标记不会重复计数
        storage
            .mark_recipient_sent_impl(broadcast.id, recipients[0].id)
            .await
            .unwrap();
        storage
            .mark_recipient_failed_impl(broadcast.id, recipients[1].id, "timeout")
            .await
            .unwrap();

        let current = storage.get_broadcast_by_id_impl(broadcast.id).await.unwrap().unwrap();
        assert_eq!((current.sent, current.failed, current.pending()), (1, 1, 0));

        assert_eq!(storage.reset_failed_recipients_impl(broadcast.id).await.unwrap(), 1);
        let current = storage.get_broadcast_by_id_impl(broadcast.id).await.unwrap().unwrap();
        assert_eq!((current.sent, current.failed, current.pending()), (1, 0, 1));
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let broadcast = seed_broadcast(&storage, &["5511999990003"]).await;

        assert_eq!(storage.count_active_broadcasts_impl().await.unwrap(), 1);
        assert_eq!(storage.pause_running_broadcasts_impl().await.unwrap(), 1);
        let paused = storage.get_broadcast_by_id_impl(broadcast.id).await.unwrap().unwrap();
        assert_eq!(paused.status, BroadcastStatus::Paused);
        assert!(paused.finished_at.is_none());

        storage
            .set_broadcast_status_impl(broadcast.id, BroadcastStatus::Completed)
            .await
            .unwrap();
        let done = storage.get_broadcast_by_id_impl(broadcast.id).await.unwrap().unwrap();
        assert!(done.finished_at.is_some());
        assert_eq!(storage.count_active_broadcasts_impl().await.unwrap(), 0);
    }
}
