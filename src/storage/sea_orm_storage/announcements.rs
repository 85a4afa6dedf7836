use super::{SeaOrmStorage, db_error};
use crate::entity::announcements::{ActiveModel, Column, Entity as Announcements};
use crate::errors::Result;
use crate::models::{
    PaginationInfo, PaginationQuery,
    announcements::{
        entities::{Announcement, AnnouncementVisibility, Audience},
        requests::{AnnouncementListQuery, NewAnnouncement, UpdateAnnouncementRequest},
        responses::AnnouncementListResponse,
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

/// 可见范围转为查询条件，与 `AnnouncementVisibility::can_see` 保持一致
fn visibility_condition(visibility: &AnnouncementVisibility) -> Option<Condition> {
    match visibility {
        AnnouncementVisibility::Everything => None,
        AnnouncementVisibility::Restricted {
            audiences,
            class_name,
        } => {
            let mut condition = Condition::any().add(
                Column::Audience.is_in(audiences.iter().map(|a| a.as_str().to_string())),
            );
            if let Some(class_name) = class_name {
                condition = condition.add(
                    Condition::all()
                        .add(Column::Audience.eq(Audience::Class.as_str()))
                        .add(Column::ClassName.eq(class_name.as_str())),
                );
            }
            Some(condition)
        }
    }
}

impl SeaOrmStorage {
    pub async fn create_announcement_impl(&self, req: NewAnnouncement) -> Result<Announcement> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            title: Set(req.title),
            content: Set(req.content),
            audience: Set(req.audience.to_string()),
            class_name: Set(req.class_name),
            pinned: Set(req.pinned),
            author_id: Set(req.author_id),
            published_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| db_error("发布公告失败", e))?;

        Ok(result.into_announcement())
    }

    pub async fn get_announcement_by_id_impl(&self, id: i64) -> Result<Option<Announcement>> {
        let result = Announcements::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| db_error("查询公告失败", e))?;

        Ok(result.map(|m| m.into_announcement()))
    }

    /// 置顶优先，其次按发布时间倒序
    pub async fn list_announcements_with_pagination_impl(
        &self,
        query: AnnouncementListQuery,
    ) -> Result<AnnouncementListResponse> {
        let (page, size) = PaginationQuery::normalize(query.page, query.size);

        let mut select = Announcements::find();
        if let Some(condition) = visibility_condition(&query.visibility) {
            select = select.filter(condition);
        }
        if let Some(audience) = query.audience {
            select = select.filter(Column::Audience.eq(audience.as_str()));
        }

        let paginator = select
            .order_by_desc(Column::Pinned)
            .order_by_desc(Column::PublishedAt)
            .order_by_desc(Column::Id)
            .paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| db_error("查询公告总数失败", e))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| db_error("查询公告页数失败", e))?;
        let items = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| db_error("查询公告列表失败", e))?;

        Ok(AnnouncementListResponse {
            items: items.into_iter().map(|m| m.into_announcement()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    pub async fn update_announcement_impl(
        &self,
        id: i64,
        update: UpdateAnnouncementRequest,
    ) -> Result<Option<Announcement>> {
        if self.get_announcement_by_id_impl(id).await?.is_none() {
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
        if let Some(content) = update.content {
            model.content = Set(content);
        }
        if let Some(audience) = update.audience {
            model.audience = Set(audience.to_string());
            // 非班级公告不保留班级名
            if audience != Audience::Class {
                model.class_name = Set(None);
            }
        }
        if let Some(class_name) = update.class_name {
            model.class_name = Set(Some(class_name));
        }
        if let Some(pinned) = update.pinned {
            model.pinned = Set(pinned);
        }

        let updated = model
            .update(&self.db)
            .await
            .map_err(|e| db_error("更新公告失败", e))?;

        Ok(Some(updated.into_announcement()))
    }

    pub async fn delete_announcement_impl(&self, id: i64) -> Result<bool> {
        let result = Announcements::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| db_error("删除公告失败", e))?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::entities::UserRole;
    use crate::storage::sea_orm_storage::users::tests::new_user;

    async fn publish(
        storage: &SeaOrmStorage,
        author_id: i64,
        title: &str,
        audience: Audience,
        class_name: Option<&str>,
        pinned: bool,
    ) {
        storage
            .create_announcement_impl(NewAnnouncement {
                title: title.to_string(),
                content: "conteúdo".to_string(),
                audience,
                class_name: class_name.map(str::to_string),
                pinned,
                author_id,
            })
            .await
            .unwrap();
    }

    fn query(visibility: AnnouncementVisibility) -> AnnouncementListQuery {
        AnnouncementListQuery {
            page: None,
            size: None,
            visibility,
            audience: None,
        }
    }

    #[tokio::test]
    async fn test_student_sees_only_relevant_announcements() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let admin = storage
            .create_user_impl(new_user("diretora", UserRole::Admin))
            .await
            .unwrap();

        publish(&storage, admin.id, "geral", Audience::All, None, false).await;
        publish(&storage, admin.id, "alunos", Audience::Students, None, false).await;
        publish(&storage, admin.id, "professores", Audience::Teachers, None, false).await;
        publish(&storage, admin.id, "turma 1A", Audience::Class, Some("1A"), true).await;
        publish(&storage, admin.id, "turma 2B", Audience::Class, Some("2B"), false).await;

        let student = storage
            .list_announcements_with_pagination_impl(query(AnnouncementVisibility::for_reader(
                UserRole::Student,
                Some("1A".to_string()),
            )))
            .await
            .unwrap();
        let titles: Vec<_> = student.items.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles.len(), 3);
        // 置顶公告排在最前
        assert_eq!(titles[0], "turma 1A");
        assert!(titles.contains(&"geral") && titles.contains(&"alunos"));

        let teacher = storage
            .list_announcements_with_pagination_impl(query(AnnouncementVisibility::for_reader(
                UserRole::Teacher,
                None,
            )))
            .await
            .unwrap();
        assert_eq!(teacher.pagination.total, 4);

        let admin_view = storage
            .list_announcements_with_pagination_impl(query(AnnouncementVisibility::Everything))
            .await
            .unwrap();
        assert_eq!(admin_view.pagination.total, 5);
    }
}
