use super::{SeaOrmStorage, db_error};
use crate::entity::classes::{ActiveModel, Column, Entity as Classes};
use crate::entity::prelude::{Announcements, Attendance, Materials, Students, Subjects};
use crate::entity::{announcements, attendance, materials, students, subjects};
use crate::errors::Result;
use crate::models::{
    PaginationInfo, PaginationQuery,
    classes::{
        entities::Class,
        requests::{ClassListQuery, CreateClassRequest, UpdateClassRequest},
        responses::ClassListResponse,
    },
};
use crate::utils::contains_pattern;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, sea_query::Expr,
};

impl SeaOrmStorage {
    pub async fn create_class_impl(&self, req: CreateClassRequest) -> Result<Class> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            name: Set(req.name),
            grade_level: Set(req.grade_level),
            shift: Set(req.shift.to_string()),
            school_year: Set(req.school_year),
            homeroom_teacher_id: Set(req.homeroom_teacher_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| db_error("创建班级失败", e))?;

        Ok(result.into_class())
    }

    pub async fn get_class_by_id_impl(&self, id: i64) -> Result<Option<Class>> {
        let result = Classes::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| db_error("查询班级失败", e))?;

        Ok(result.map(|m| m.into_class()))
    }

    pub async fn get_class_by_name_impl(&self, name: &str) -> Result<Option<Class>> {
        let result = Classes::find()
            .filter(Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(|e| db_error("查询班级失败", e))?;

        Ok(result.map(|m| m.into_class()))
    }

    pub async fn list_classes_with_pagination_impl(
        &self,
        query: ClassListQuery,
    ) -> Result<ClassListResponse> {
        let (page, size) = PaginationQuery::normalize(query.page, query.size);

        let mut select = Classes::find();

        if let Some(year) = query.school_year {
            select = select.filter(Column::SchoolYear.eq(year));
        }

        if let Some(ref search) = query.search
            && !search.trim().is_empty()
        {
            select = select.filter(Column::Name.like(contains_pattern(search)));
        }

        let paginator = select
            .order_by_desc(Column::SchoolYear)
            .order_by_asc(Column::Name)
            .paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| db_error("查询班级总数失败", e))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| db_error("查询班级页数失败", e))?;
        let classes = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| db_error("查询班级列表失败", e))?;

        Ok(ClassListResponse {
            items: classes.into_iter().map(|m| m.into_class()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    /// 更新班级；改名时在同一事务内同步所有按名称引用的记录
    pub async fn update_class_impl(
        &self,
        id: i64,
        update: UpdateClassRequest,
    ) -> Result<Option<Class>> {
        let Some(existing) = self.get_class_by_id_impl(id).await? else {
            return Ok(None);
        };

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| db_error("开启事务失败", e))?;

        let mut model = ActiveModel {
            id: Set(id),
            updated_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        };
        if let Some(grade_level) = update.grade_level {
            model.grade_level = Set(Some(grade_level));
        }
        if let Some(shift) = update.shift {
            model.shift = Set(shift.to_string());
        }
        if let Some(year) = update.school_year {
            model.school_year = Set(year);
        }
        if let Some(teacher_id) = update.homeroom_teacher_id {
            model.homeroom_teacher_id = Set(Some(teacher_id));
        }

        let renamed = update
            .name
            .filter(|name| name != &existing.name);
        if let Some(ref new_name) = renamed {
            model.name = Set(new_name.clone());
        }

        let updated = model
            .update(&txn)
            .await
            .map_err(|e| db_error("更新班级失败", e))?;

        if let Some(new_name) = renamed {
            let old = existing.name.as_str();
            Students::update_many()
                .col_expr(students::Column::ClassName, Expr::value(new_name.clone()))
                .filter(students::Column::ClassName.eq(old))
                .exec(&txn)
                .await
                .map_err(|e| db_error("同步学生班级失败", e))?;
            Subjects::update_many()
                .col_expr(subjects::Column::ClassName, Expr::value(new_name.clone()))
                .filter(subjects::Column::ClassName.eq(old))
                .exec(&txn)
                .await
                .map_err(|e| db_error("同步科目班级失败", e))?;
            Announcements::update_many()
                .col_expr(announcements::Column::ClassName, Expr::value(new_name.clone()))
                .filter(announcements::Column::ClassName.eq(old))
                .exec(&txn)
                .await
                .map_err(|e| db_error("同步公告班级失败", e))?;
            Materials::update_many()
                .col_expr(materials::Column::ClassName, Expr::value(new_name.clone()))
                .filter(materials::Column::ClassName.eq(old))
                .exec(&txn)
                .await
                .map_err(|e| db_error("同步资料班级失败", e))?;
            Attendance::update_many()
                .col_expr(attendance::Column::ClassName, Expr::value(new_name))
                .filter(attendance::Column::ClassName.eq(old))
                .exec(&txn)
                .await
                .map_err(|e| db_error("同步考勤班级失败", e))?;
        }

        txn.commit()
            .await
            .map_err(|e| db_error("提交事务失败", e))?;

        Ok(Some(updated.into_class()))
    }

    pub async fn delete_class_impl(&self, id: i64) -> Result<bool> {
        let result = Classes::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| db_error("删除班级失败", e))?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count_classes_impl(&self) -> Result<u64> {
        Classes::find()
            .count(&self.db)
            .await
            .map_err(|e| db_error("统计班级数量失败", e))
    }

    pub async fn count_class_references_impl(&self, name: &str) -> Result<u64> {
        let students = Students::find()
            .filter(students::Column::ClassName.eq(name))
            .count(&self.db)
            .await
            .map_err(|e| db_error("统计班级学生失败", e))?;
        let subjects = Subjects::find()
            .filter(subjects::Column::ClassName.eq(name))
            .count(&self.db)
            .await
            .map_err(|e| db_error("统计班级科目失败", e))?;

        Ok(students + subjects)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::classes::entities::Shift;
    use crate::storage::sea_orm_storage::students::tests::new_student;

    pub(crate) fn new_class(name: &str) -> CreateClassRequest {
        CreateClassRequest {
            name: name.to_string(),
            grade_level: Some("1º ano".to_string()),
            shift: Shift::Morning,
            school_year: 2025,
            homeroom_teacher_id: None,
        }
    }

    #[tokio::test]
    async fn test_rename_propagates_to_students() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let class = storage.create_class_impl(new_class("1A")).await.unwrap();
        let student = storage
            .create_student_impl(new_student("Ana", Some("1A")))
            .await
            .unwrap();

        let updated = storage
            .update_class_impl(
                class.id,
                UpdateClassRequest {
                    name: Some("1A-Manhã".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "1A-Manhã");

        let student = storage.get_student_by_id_impl(student.id).await.unwrap().unwrap();
        assert_eq!(student.class_name.as_deref(), Some("1A-Manhã"));
        assert_eq!(storage.count_class_references_impl("1A").await.unwrap(), 0);
        assert_eq!(storage.count_class_references_impl("1A-Manhã").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_class_name_conflicts() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        storage.create_class_impl(new_class("2B")).await.unwrap();
        let err = storage.create_class_impl(new_class("2B")).await.unwrap_err();
        assert!(matches!(err, crate::errors::PortalError::Conflict(_)));
    }
}
