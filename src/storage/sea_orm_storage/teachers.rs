use super::{SeaOrmStorage, db_error};
use crate::entity::teachers::{ActiveModel, Column, Entity as Teachers};
use crate::entity::users::Entity as Users;
use crate::errors::Result;
use crate::models::{
    PaginationInfo, PaginationQuery,
    teachers::{
        entities::Teacher,
        requests::{NewTeacher, TeacherListQuery, UpdateTeacherRequest},
        responses::TeacherListResponse,
    },
    users::{entities::User, requests::NewUser},
};
use crate::utils::contains_pattern;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

impl SeaOrmStorage {
    /// 教师档案与登录账号同一事务写入
    pub async fn create_teacher_with_account_impl(
        &self,
        user: NewUser,
        teacher: NewTeacher,
    ) -> Result<(User, Teacher)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| db_error("开启事务失败", e))?;

        let user = Self::insert_user_on(&txn, user).await?;

        let now = chrono::Utc::now().timestamp();
        let model = ActiveModel {
            user_id: Set(user.id),
            full_name: Set(teacher.full_name),
            email: Set(teacher.email),
            phone: Set(teacher.phone),
            specialty: Set(teacher.specialty),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let teacher = model
            .insert(&txn)
            .await
            .map_err(|e| db_error("创建教师失败", e))?;

        txn.commit()
            .await
            .map_err(|e| db_error("提交事务失败", e))?;

        Ok((user, teacher.into_teacher()))
    }

    pub async fn get_teacher_by_id_impl(&self, id: i64) -> Result<Option<Teacher>> {
        let result = Teachers::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| db_error("查询教师失败", e))?;

        Ok(result.map(|m| m.into_teacher()))
    }

    pub async fn get_teacher_by_user_id_impl(&self, user_id: i64) -> Result<Option<Teacher>> {
        let result = Teachers::find()
            .filter(Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .map_err(|e| db_error("查询教师失败", e))?;

        Ok(result.map(|m| m.into_teacher()))
    }

    pub async fn get_teacher_by_email_impl(&self, email: &str) -> Result<Option<Teacher>> {
        let result = Teachers::find()
            .filter(Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(|e| db_error("查询教师失败", e))?;

        Ok(result.map(|m| m.into_teacher()))
    }

    pub async fn list_teachers_with_pagination_impl(
        &self,
        query: TeacherListQuery,
    ) -> Result<TeacherListResponse> {
        let (page, size) = PaginationQuery::normalize(query.page, query.size);

        let mut select = Teachers::find();
        if let Some(ref search) = query.search
            && !search.trim().is_empty()
        {
            select = select.filter(
                Condition::any()
                    .add(Column::FullName.like(contains_pattern(search)))
                    .add(Column::Email.like(contains_pattern(search)))
                    .add(Column::Specialty.like(contains_pattern(search))),
            );
        }

        let paginator = select
            .order_by_asc(Column::FullName)
            .paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| db_error("查询教师总数失败", e))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| db_error("查询教师页数失败", e))?;
        let teachers = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| db_error("查询教师列表失败", e))?;

        Ok(TeacherListResponse {
            items: teachers.into_iter().map(|m| m.into_teacher()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    pub async fn update_teacher_impl(
        &self,
        id: i64,
        update: UpdateTeacherRequest,
    ) -> Result<Option<Teacher>> {
        if self.get_teacher_by_id_impl(id).await?.is_none() {
            return Ok(None);
        }

        let mut model = ActiveModel {
            id: Set(id),
            updated_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        };
        if let Some(full_name) = update.full_name {
            model.full_name = Set(full_name);
        }
        if let Some(phone) = update.phone {
            model.phone = Set(Some(phone));
        }
        if let Some(specialty) = update.specialty {
            model.specialty = Set(Some(specialty));
        }

        let updated = model
            .update(&self.db)
            .await
            .map_err(|e| db_error("更新教师失败", e))?;

        Ok(Some(updated.into_teacher()))
    }

    /// 删除账号，档案随外键级联删除
    pub async fn delete_teacher_impl(&self, id: i64) -> Result<bool> {
        let Some(teacher) = self.get_teacher_by_id_impl(id).await? else {
            return Ok(false);
        };

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| db_error("开启事务失败", e))?;
        Teachers::delete_by_id(teacher.id)
            .exec(&txn)
            .await
            .map_err(|e| db_error("删除教师失败", e))?;
        Users::delete_by_id(teacher.user_id)
            .exec(&txn)
            .await
            .map_err(|e| db_error("删除教师账号失败", e))?;
        txn.commit()
            .await
            .map_err(|e| db_error("提交事务失败", e))?;

        Ok(true)
    }

    pub async fn count_teachers_impl(&self) -> Result<u64> {
        Teachers::find()
            .count(&self.db)
            .await
            .map_err(|e| db_error("统计教师数量失败", e))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::users::entities::UserRole;
    use crate::storage::sea_orm_storage::users::tests::new_user;

    pub(crate) fn new_teacher(name: &str) -> NewTeacher {
        NewTeacher {
            full_name: name.to_string(),
            email: format!("{}@prof.test", name.to_lowercase()),
            phone: None,
            specialty: Some("Matemática".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_delete_teacher_removes_account() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let (user, teacher) = storage
            .create_teacher_with_account_impl(new_user("marcos", UserRole::Teacher), new_teacher("Marcos"))
            .await
            .unwrap();
        assert_eq!(teacher.user_id, user.id);
        assert_eq!(storage.count_teachers_impl().await.unwrap(), 1);

        assert!(storage.delete_teacher_impl(teacher.id).await.unwrap());
        assert!(storage.get_user_by_id_impl(user.id).await.unwrap().is_none());
        assert!(storage.get_teacher_by_id_impl(teacher.id).await.unwrap().is_none());
        assert!(!storage.delete_teacher_impl(teacher.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_search_by_specialty() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        storage
            .create_teacher_with_account_impl(new_user("lucia", UserRole::Teacher), new_teacher("Lucia"))
            .await
            .unwrap();

        let result = storage
            .list_teachers_with_pagination_impl(TeacherListQuery {
                search: Some("matem".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(result.items.len(), 1);
    }
}
