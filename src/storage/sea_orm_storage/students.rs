use super::{SeaOrmStorage, db_error};
use crate::entity::students::{ActiveModel, Column, Entity as Students};
use crate::errors::Result;
use crate::models::{
    PaginationInfo, PaginationQuery,
    students::{
        entities::{EnrollmentStatus, Student},
        requests::{NewStudent, StudentFilter, StudentListQuery, UpdateStudentRequest},
        responses::StudentListResponse,
    },
    users::{entities::User, requests::NewUser},
};
use crate::utils::contains_pattern;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait, sea_query::Expr,
};

impl SeaOrmStorage {
    async fn insert_student_on<C: ConnectionTrait>(conn: &C, student: NewStudent) -> Result<Student> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            user_id: Set(student.user_id),
            full_name: Set(student.full_name),
            email: Set(student.email),
            phone: Set(student.phone),
            birth_date: Set(student.birth_date),
            guardian_name: Set(student.guardian_name),
            guardian_phone: Set(student.guardian_phone),
            class_name: Set(student.class_name),
            registration_number: Set(student.registration_number),
            enrollment_status: Set(student.enrollment_status.to_string()),
            notes: Set(student.notes),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(conn)
            .await
            .map_err(|e| db_error("创建学生失败", e))?;

        Ok(result.into_student())
    }

    pub async fn create_student_impl(&self, student: NewStudent) -> Result<Student> {
        Self::insert_student_on(&self.db, student).await
    }

    /// 账号与学生记录同时写入，任一失败则整体回滚
    pub async fn create_student_with_account_impl(
        &self,
        user: NewUser,
        mut student: NewStudent,
    ) -> Result<(User, Student)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| db_error("开启事务失败", e))?;

        let user = Self::insert_user_on(&txn, user).await?;
        student.user_id = Some(user.id);
        let student = Self::insert_student_on(&txn, student).await?;

        txn.commit()
            .await
            .map_err(|e| db_error("提交事务失败", e))?;

        Ok((user, student))
    }

    pub async fn get_student_by_id_impl(&self, id: i64) -> Result<Option<Student>> {
        let result = Students::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| db_error("查询学生失败", e))?;

        Ok(result.map(|m| m.into_student()))
    }

    pub async fn get_student_by_email_impl(&self, email: &str) -> Result<Option<Student>> {
        let result = Students::find()
            .filter(Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(|e| db_error("查询学生失败", e))?;

        Ok(result.map(|m| m.into_student()))
    }

    pub async fn get_student_by_user_id_impl(&self, user_id: i64) -> Result<Option<Student>> {
        let result = Students::find()
            .filter(Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .map_err(|e| db_error("查询学生失败", e))?;

        Ok(result.map(|m| m.into_student()))
    }

    pub async fn get_students_by_ids_impl(&self, ids: &[i64]) -> Result<Vec<Student>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = Students::find()
            .filter(Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(|e| db_error("批量查询学生失败", e))?;

        Ok(result.into_iter().map(|m| m.into_student()).collect())
    }

    /// 分页列出学生
    pub async fn list_students_with_pagination_impl(
        &self,
        query: StudentListQuery,
    ) -> Result<StudentListResponse> {
        let (page, size) = PaginationQuery::normalize(query.page, query.size);

        let mut select = Students::find();

        if let Some(status) = query.status {
            select = select.filter(Column::EnrollmentStatus.eq(status.to_string()));
        }

        if let Some(ref class_name) = query.class_name {
            select = select.filter(Column::ClassName.eq(class_name.as_str()));
        }

        if let Some(ref search) = query.search
            && !search.trim().is_empty()
        {
            select = select.filter(
                Condition::any()
                    .add(Column::FullName.like(contains_pattern(search)))
                    .add(Column::Email.like(contains_pattern(search)))
                    .add(Column::RegistrationNumber.like(contains_pattern(search))),
            );
        }

        let paginator = select
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| db_error("查询学生总数失败", e))?;
        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| db_error("查询学生页数失败", e))?;
        let students = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| db_error("查询学生列表失败", e))?;

        Ok(StudentListResponse {
            items: students.into_iter().map(|m| m.into_student()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    /// 不分页，按姓名排序
    pub async fn list_students_impl(&self, filter: StudentFilter) -> Result<Vec<Student>> {
        let mut select = Students::find();

        if let Some(status) = filter.status {
            select = select.filter(Column::EnrollmentStatus.eq(status.to_string()));
        }
        if let Some(ref class_name) = filter.class_name {
            select = select.filter(Column::ClassName.eq(class_name.as_str()));
        }

        let result = select
            .order_by_asc(Column::FullName)
            .all(&self.db)
            .await
            .map_err(|e| db_error("查询学生列表失败", e))?;

        Ok(result.into_iter().map(|m| m.into_student()).collect())
    }

    pub async fn update_student_impl(
        &self,
        id: i64,
        update: UpdateStudentRequest,
    ) -> Result<Option<Student>> {
        if self.get_student_by_id_impl(id).await?.is_none() {
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
        if let Some(birth_date) = update.birth_date {
            model.birth_date = Set(Some(birth_date));
        }
        if let Some(guardian_name) = update.guardian_name {
            model.guardian_name = Set(Some(guardian_name));
        }
        if let Some(guardian_phone) = update.guardian_phone {
            model.guardian_phone = Set(Some(guardian_phone));
        }
        if let Some(class_name) = update.class_name {
            // 空字符串表示移出班级
            model.class_name = Set(Some(class_name).filter(|c| !c.trim().is_empty()));
        }
        if let Some(notes) = update.notes {
            model.notes = Set(Some(notes));
        }

        let updated = model
            .update(&self.db)
            .await
            .map_err(|e| db_error("更新学生失败", e))?;

        Ok(Some(updated.into_student()))
    }

    pub async fn set_student_enrollment_status_impl(
        &self,
        id: i64,
        status: EnrollmentStatus,
    ) -> Result<Option<Student>> {
        let result = Students::update_many()
            .col_expr(Column::EnrollmentStatus, Expr::value(status.to_string()))
            .col_expr(Column::UpdatedAt, Expr::value(chrono::Utc::now().timestamp()))
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| db_error("更新学籍状态失败", e))?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.get_student_by_id_impl(id).await
    }

    pub async fn link_student_user_impl(&self, student_id: i64, user_id: i64) -> Result<bool> {
        let result = Students::update_many()
            .col_expr(Column::UserId, Expr::value(user_id))
            .col_expr(Column::UpdatedAt, Expr::value(chrono::Utc::now().timestamp()))
            .filter(Column::Id.eq(student_id))
            .exec(&self.db)
            .await
            .map_err(|e| db_error("关联学生账号失败", e))?;

        Ok(result.rows_affected > 0)
    }

    pub async fn delete_student_impl(&self, id: i64) -> Result<bool> {
        let result = Students::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| db_error("删除学生失败", e))?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count_students_by_status_impl(&self) -> Result<Vec<(EnrollmentStatus, u64)>> {
        let mut counts = Vec::with_capacity(EnrollmentStatus::ALL.len());
        for status in EnrollmentStatus::ALL {
            let count = Students::find()
                .filter(Column::EnrollmentStatus.eq(status.to_string()))
                .count(&self.db)
                .await
                .map_err(|e| db_error("统计学生数量失败", e))?;
            counts.push((*status, count));
        }
        Ok(counts)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::errors::PortalError;
    use crate::models::users::entities::UserRole;
    use crate::storage::sea_orm_storage::users::tests::new_user;

    pub(crate) fn new_student(name: &str, class_name: Option<&str>) -> NewStudent {
        NewStudent {
            user_id: None,
            full_name: name.to_string(),
            email: format!("{}@aluno.test", name.to_lowercase().replace(' ', ".")),
            phone: Some("11988887777".to_string()),
            birth_date: None,
            guardian_name: None,
            guardian_phone: None,
            class_name: class_name.map(str::to_string),
            registration_number: format!("2025-{}", name.to_uppercase().replace(' ', "")),
            enrollment_status: EnrollmentStatus::Approved,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_enrollment_creates_linked_account() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let mut student = new_student("Joana Lima", Some("1A"));
        student.enrollment_status = EnrollmentStatus::Pending;

        let (user, student) = storage
            .create_student_with_account_impl(new_user("joana", UserRole::Student), student)
            .await
            .unwrap();
        assert_eq!(student.user_id, Some(user.id));

        let found = storage
            .get_student_by_user_id_impl(user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, student.id);
    }

    #[tokio::test]
    async fn test_failed_enrollment_rolls_back_account() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        storage
            .create_student_impl(new_student("Pedro", None))
            .await
            .unwrap();

        // 学生邮箱重复导致第二步失败
        let err = storage
            .create_student_with_account_impl(new_user("pedro2", UserRole::Student), {
                let mut s = new_student("Pedro", None);
                s.registration_number = "2025-OTHER".to_string();
                s
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Conflict(_)));
        assert!(storage
            .get_user_by_username_impl("pedro2")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_filter_pending_and_counts() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let mut pending = new_student("Rita", Some("2B"));
        pending.enrollment_status = EnrollmentStatus::Pending;
        storage.create_student_impl(pending).await.unwrap();
        storage
            .create_student_impl(new_student("Sofia", Some("2B")))
            .await
            .unwrap();

        let result = storage
            .list_students_with_pagination_impl(StudentListQuery {
                status: Some(EnrollmentStatus::Pending),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].full_name, "Rita");

        let counts = storage.count_students_by_status_impl().await.unwrap();
        assert!(counts.contains(&(EnrollmentStatus::Pending, 1)));
        assert!(counts.contains(&(EnrollmentStatus::Approved, 1)));
        assert!(counts.contains(&(EnrollmentStatus::Rejected, 0)));
    }

    #[tokio::test]
    async fn test_update_clears_class_on_empty_string() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let student = storage
            .create_student_impl(new_student("Tiago", Some("3C")))
            .await
            .unwrap();

        let updated = storage
            .update_student_impl(
                student.id,
                UpdateStudentRequest {
                    class_name: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.class_name, None);
    }
}
