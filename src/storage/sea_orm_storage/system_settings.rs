//! 系统设置存储实现

use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};

use super::{SeaOrmStorage, db_error};
use crate::entity::prelude::{SystemSettings, SystemSettingsAudit};
use crate::entity::{system_settings, system_settings_audit};
use crate::errors::{PortalError, Result};
use crate::models::{
    PaginationInfo, PaginationQuery,
    system::{
        entities::SystemSetting, requests::SettingAuditQuery, responses::SettingAuditListResponse,
    },
};

impl SeaOrmStorage {
    /// 获取所有设置
    pub(crate) async fn list_all_settings_impl(&self) -> Result<Vec<SystemSetting>> {
        let settings = SystemSettings::find()
            .order_by(system_settings::Column::Key, Order::Asc)
            .all(&self.db)
            .await
            .map_err(|e| db_error("获取设置列表失败", e))?;

        Ok(settings.into_iter().map(|s| s.into_setting()).collect())
    }

    pub(crate) async fn get_setting_by_key_impl(&self, key: &str) -> Result<Option<SystemSetting>> {
        let setting = SystemSettings::find_by_id(key.to_string())
            .one(&self.db)
            .await
            .map_err(|e| db_error("获取设置失败", e))?;

        Ok(setting.map(|s| s.into_setting()))
    }

    /// 更新设置并写入审计日志
    pub(crate) async fn update_setting_impl(
        &self,
        key: &str,
        value: &str,
        user_id: i64,
        ip_address: Option<String>,
    ) -> Result<SystemSetting> {
        let now = chrono::Utc::now().timestamp();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| db_error("开启事务失败", e))?;

        let existing = SystemSettings::find_by_id(key.to_string())
            .one(&txn)
            .await
            .map_err(|e| db_error("获取设置失败", e))?
            .ok_or_else(|| PortalError::not_found(format!("配置项不存在: {key}")))?;

        let old_value = existing.value.clone();

        let mut active_model: system_settings::ActiveModel = existing.into();
        active_model.value = Set(value.to_string());
        active_model.updated_at = Set(now);
        active_model.updated_by = Set(Some(user_id));

        let updated = active_model
            .update(&txn)
            .await
            .map_err(|e| db_error("更新设置失败", e))?;

        let audit = system_settings_audit::ActiveModel {
            setting_key: Set(key.to_string()),
            old_value: Set(Some(old_value)),
            new_value: Set(value.to_string()),
            changed_by: Set(user_id),
            changed_at: Set(now),
            ip_address: Set(ip_address),
            ..Default::default()
        };
        audit
            .insert(&txn)
            .await
            .map_err(|e| db_error("创建审计日志失败", e))?;

        txn.commit()
            .await
            .map_err(|e| db_error("提交事务失败", e))?;

        Ok(updated.into_setting())
    }

    pub(crate) async fn list_setting_audits_impl(
        &self,
        query: SettingAuditQuery,
    ) -> Result<SettingAuditListResponse> {
        let (page, size) = PaginationQuery::normalize(query.page, query.size);

        let mut find = SystemSettingsAudit::find();
        if let Some(key) = &query.key {
            find = find.filter(system_settings_audit::Column::SettingKey.eq(key.as_str()));
        }

        let paginator = find
            .order_by_desc(system_settings_audit::Column::ChangedAt)
            .order_by_desc(system_settings_audit::Column::Id)
            .paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| db_error("统计审计日志失败", e))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| db_error("统计审计日志页数失败", e))?;
        let audits = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| db_error("获取审计日志失败", e))?;

        Ok(SettingAuditListResponse {
            audits: audits.into_iter().map(|a| a.into_audit()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::entities::UserRole;
    use crate::storage::sea_orm_storage::users::tests::new_user;

    #[tokio::test]
    async fn test_update_setting_writes_audit() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let admin = storage
            .create_user_impl(new_user("secretaria", UserRole::Admin))
            .await
            .unwrap();

        let before = storage
            .get_setting_by_key_impl("school.enrollment_fee_cents")
            .await
            .unwrap()
            .unwrap();

        let updated = storage
            .update_setting_impl(
                "school.enrollment_fee_cents",
                "25000",
                admin.id,
                Some("127.0.0.1".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(updated.value, "25000");
        assert_eq!(updated.updated_by, Some(admin.id));

        let audits = storage
            .list_setting_audits_impl(SettingAuditQuery {
                key: Some("school.enrollment_fee_cents".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(audits.pagination.total, 1);
        assert_eq!(audits.audits[0].old_value.as_deref(), Some(before.value.as_str()));
        assert_eq!(audits.audits[0].new_value, "25000");
    }

    #[tokio::test]
    async fn test_update_unknown_setting_is_not_found() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let admin = storage
            .create_user_impl(new_user("secretaria", UserRole::Admin))
            .await
            .unwrap();

        let result = storage
            .update_setting_impl("nope.key", "1", admin.id, None)
            .await;
        assert!(matches!(result, Err(PortalError::NotFound(_))));
        assert!(!storage.list_all_settings_impl().await.unwrap().is_empty());
    }
}
