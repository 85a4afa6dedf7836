//! 文件存储操作

use super::{SeaOrmStorage, db_error};
use crate::entity::files::{ActiveModel, Column, Entity as Files};
use crate::errors::Result;
use crate::models::files::{entities::File, requests::NewFile};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

impl SeaOrmStorage {
    /// 创建文件记录，下载令牌在此生成
    pub async fn create_file_impl(&self, file: NewFile) -> Result<File> {
        let model = ActiveModel {
            download_token: Set(uuid::Uuid::new_v4().to_string()),
            original_name: Set(file.original_name),
            stored_name: Set(file.stored_name),
            file_size: Set(file.file_size),
            file_type: Set(file.file_type),
            user_id: Set(file.user_id),
            created_at: Set(chrono::Utc::now().timestamp()),
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| db_error("上传文件记录失败", e))?;

        Ok(result.into_file())
    }

    /// 通过 token 获取文件
    pub async fn get_file_by_token_impl(&self, token: &str) -> Result<Option<File>> {
        let result = Files::find()
            .filter(Column::DownloadToken.eq(token))
            .one(&self.db)
            .await
            .map_err(|e| db_error("查询文件失败", e))?;

        Ok(result.map(|m| m.into_file()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::entities::UserRole;
    use crate::storage::sea_orm_storage::users::tests::new_user;

    #[tokio::test]
    async fn test_file_record_round_trip() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let user = storage
            .create_user_impl(new_user("prof", UserRole::Teacher))
            .await
            .unwrap();

        let file = storage
            .create_file_impl(NewFile {
                original_name: "aula.pdf".to_string(),
                stored_name: "abc.pdf".to_string(),
                file_size: 1024,
                file_type: ".pdf".to_string(),
                user_id: user.id,
            })
            .await
            .unwrap();
        assert_eq!(file.download_token.len(), 36);

        let found = storage
            .get_file_by_token_impl(&file.download_token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.stored_name, "abc.pdf");
        assert!(storage.get_file_by_token_impl("missing").await.unwrap().is_none());
    }
}
