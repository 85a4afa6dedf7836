use super::{SeaOrmStorage, db_error};
use crate::entity::materials::{ActiveModel, Column, Entity as Materials};
use crate::errors::Result;
use crate::models::{
    PaginationInfo, PaginationQuery,
    materials::{
        entities::Material,
        requests::{MaterialListQuery, NewMaterial, UpdateMaterialRequest},
        responses::MaterialListResponse,
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};

impl SeaOrmStorage {
    pub async fn create_material_impl(&self, req: NewMaterial) -> Result<Material> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            title: Set(req.title),
            description: Set(req.description),
            subject_id: Set(req.subject_id),
            class_name: Set(req.class_name),
            file_token: Set(req.file_token),
            link_url: Set(req.link_url),
            uploaded_by: Set(req.uploaded_by),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| db_error("创建资料失败", e))?;

        Ok(result.into_material())
    }

    pub async fn get_material_by_id_impl(&self, id: i64) -> Result<Option<Material>> {
        let result = Materials::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| db_error("查询资料失败", e))?;

        Ok(result.map(|m| m.into_material()))
    }

    pub async fn list_materials_with_pagination_impl(
        &self,
        query: MaterialListQuery,
    ) -> Result<MaterialListResponse> {
        let (page, size) = PaginationQuery::normalize(query.page, query.size);

        let mut select = Materials::find();
        if let Some(ref class_name) = query.class_name {
            select = select.filter(Column::ClassName.eq(class_name.as_str()));
        }
        if let Some(subject_id) = query.subject_id {
            select = select.filter(Column::SubjectId.eq(subject_id));
        }

        let paginator = select
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| db_error("查询资料总数失败", e))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| db_error("查询资料页数失败", e))?;
        let items = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| db_error("查询资料列表失败", e))?;

        Ok(MaterialListResponse {
            items: items.into_iter().map(|m| m.into_material()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    pub async fn update_material_impl(
        &self,
        id: i64,
        update: UpdateMaterialRequest,
    ) -> Result<Option<Material>> {
        if self.get_material_by_id_impl(id).await?.is_none() {
            return Ok(None);
        }

        let mut model = ActiveModel {
            id: Set(id),
            updated_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        };
        if let Some(title) = update.title {
            model.title = Set(title);
        }
        if let Some(description) = update.description {
            model.description = Set(Some(description));
        }
        if let Some(subject_id) = update.subject_id {
            model.subject_id = Set(Some(subject_id));
        }
        if let Some(file_token) = update.file_token {
            model.file_token = Set(Some(file_token).filter(|t| !t.is_empty()));
        }
        if let Some(link_url) = update.link_url {
            model.link_url = Set(Some(link_url).filter(|l| !l.is_empty()));
        }

        let updated = model
            .update(&self.db)
            .await
            .map_err(|e| db_error("更新资料失败", e))?;

        Ok(Some(updated.into_material()))
    }

    pub async fn delete_material_impl(&self, id: i64) -> Result<bool> {
        let result = Materials::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| db_error("删除资料失败", e))?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::entities::UserRole;
    use crate::storage::sea_orm_storage::users::tests::new_user;

    #[tokio::test]
    async fn test_material_link_lifecycle() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let teacher = storage
            .create_user_impl(new_user("prof", UserRole::Teacher))
            .await
            .unwrap();

        let material = storage
            .create_material_impl(NewMaterial {
                title: "Lista 1".to_string(),
                description: None,
                subject_id: None,
                class_name: "1A".to_string(),
                file_token: None,
                link_url: Some("https://example.com/lista1".to_string()),
                uploaded_by: teacher.id,
            })
            .await
            .unwrap();

        let updated = storage
            .update_material_impl(
                material.id,
                UpdateMaterialRequest {
                    title: Some("Lista 1 (revisada)".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Lista 1 (revisada)");
        assert_eq!(updated.link_url.as_deref(), Some("https://example.com/lista1"));

        let other_class = storage
            .list_materials_with_pagination_impl(MaterialListQuery {
                class_name: Some("2B".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(other_class.items.is_empty());

        assert!(storage.delete_material_impl(material.id).await.unwrap());
        assert!(storage.get_material_by_id_impl(material.id).await.unwrap().is_none());
    }
}
