//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod announcements;
mod attendance;
mod broadcasts;
mod classes;
mod files;
mod grades;
mod materials;
mod payments;
mod students;
mod subjects;
mod system_settings;
mod teachers;
mod users;

use crate::config::AppConfig;
use crate::errors::{PortalError, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr};
use std::time::Duration;
use tracing::info;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

/// 将数据库错误映射为业务错误；唯一约束冲突与外键缺失单独区分
pub(crate) fn db_error(context: &str, e: DbErr) -> PortalError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            PortalError::conflict(format!("{context}: 记录已存在"))
        }
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            PortalError::validation(format!("{context}: 关联记录不存在"))
        }
        _ => PortalError::database_operation(format!("{context}: {e}")),
    }
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        let db_url = Self::build_database_url(&config.database.url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite://") {
            Self::connect_sqlite(&db_url, config).await?
        } else {
            Self::connect_generic(&db_url, config).await?
        };

        // 运行迁移
        Migrator::up(&db, None)
            .await
            .map_err(|e| PortalError::database_operation(format!("数据库迁移失败: {e}")))?;

        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(Self { db })
    }

    /// 单连接的内存数据库，已完成迁移
    #[cfg(test)]
    pub(crate) async fn new_in_memory() -> Result<Self> {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1).sqlx_logging(false);

        let db = Database::connect(opt)
            .await
            .map_err(|e| PortalError::database_connection(format!("SQLite 连接失败: {e}")))?;
        Migrator::up(&db, None)
            .await
            .map_err(|e| PortalError::database_operation(format!("数据库迁移失败: {e}")))?;

        Ok(Self { db })
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| PortalError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database.pool_size)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(300))
            .connect_with(opt)
            .await
            .map_err(|e| PortalError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.database.pool_size)
            .min_connections(2)
            .connect_timeout(Duration::from_secs(config.database.timeout))
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false);

        Database::connect(opt)
            .await
            .map_err(|e| PortalError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite://") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") {
            Ok(format!("sqlite://{url}?mode=rwc"))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(PortalError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }
}

// Storage trait 实现
use crate::models::{
    announcements::{
        entities::Announcement,
        requests::{AnnouncementListQuery, NewAnnouncement, UpdateAnnouncementRequest},
        responses::AnnouncementListResponse,
    },
    attendance::{
        entities::{AttendanceRecord, AttendanceStatus},
        requests::{AttendanceEntry, AttendanceFilter, AttendanceListQuery},
        responses::AttendanceListResponse,
    },
    classes::{
        entities::Class,
        requests::{ClassListQuery, CreateClassRequest, UpdateClassRequest},
        responses::ClassListResponse,
    },
    files::{entities::File, requests::NewFile},
    grades::{
        entities::{Assessment, Grade},
        requests::{
            AssessmentListQuery, CreateAssessmentRequest, GradeEntry, UpdateAssessmentRequest,
        },
        responses::AssessmentListResponse,
    },
    materials::{
        entities::Material,
        requests::{MaterialListQuery, NewMaterial, UpdateMaterialRequest},
        responses::MaterialListResponse,
    },
    messaging::{
        entities::{Broadcast, BroadcastRecipient, BroadcastStatus, RecipientStatus},
        requests::{NewBroadcast, NewRecipient},
        responses::BroadcastListResponse,
    },
    payments::{
        entities::{Payment, PaymentProvider, PaymentStatus},
        requests::{NewPayment, PaymentListQuery},
        responses::PaymentListResponse,
    },
    students::{
        entities::{EnrollmentStatus, Student},
        requests::{NewStudent, StudentFilter, StudentListQuery, UpdateStudentRequest},
        responses::StudentListResponse,
    },
    subjects::{
        entities::Subject,
        requests::{CreateSubjectRequest, SubjectListQuery, UpdateSubjectRequest},
        responses::SubjectListResponse,
    },
    system::{
        entities::SystemSetting, requests::SettingAuditQuery, responses::SettingAuditListResponse,
    },
    teachers::{
        entities::Teacher,
        requests::{NewTeacher, TeacherListQuery, UpdateTeacherRequest},
        responses::TeacherListResponse,
    },
    users::{
        entities::{User, UserStatus},
        requests::{NewUser, UserListQuery, UserUpdate},
        responses::UserListResponse,
    },
};
use crate::storage::Storage;
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
impl Storage for SeaOrmStorage {
    async fn ping(&self) -> Result<()> {
        self.db
            .execute_unprepared("SELECT 1")
            .await
            .map(|_| ())
            .map_err(|e| PortalError::database_connection(format!("数据库不可用: {e}")))
    }

    // 用户模块
    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.create_user_impl(user).await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.get_user_by_id_impl(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.get_user_by_username_impl(username).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.get_user_by_email_impl(email).await
    }

    async fn get_user_by_username_or_email(&self, identifier: &str) -> Result<Option<User>> {
        self.get_user_by_username_or_email_impl(identifier).await
    }

    async fn list_users_with_pagination(&self, query: UserListQuery) -> Result<UserListResponse> {
        self.list_users_with_pagination_impl(query).await
    }

    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<Option<User>> {
        self.update_user_impl(id, update).await
    }

    async fn set_user_status(&self, id: i64, status: UserStatus) -> Result<bool> {
        self.set_user_status_impl(id, status).await
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        self.delete_user_impl(id).await
    }

    async fn update_last_login(&self, id: i64) -> Result<bool> {
        self.update_last_login_impl(id).await
    }

    async fn count_users(&self) -> Result<u64> {
        self.count_users_impl().await
    }

    // 学生模块
    async fn create_student(&self, student: NewStudent) -> Result<Student> {
        self.create_student_impl(student).await
    }

    async fn create_student_with_account(
        &self,
        user: NewUser,
        student: NewStudent,
    ) -> Result<(User, Student)> {
        self.create_student_with_account_impl(user, student).await
    }

    async fn get_student_by_id(&self, id: i64) -> Result<Option<Student>> {
        self.get_student_by_id_impl(id).await
    }

    async fn get_student_by_email(&self, email: &str) -> Result<Option<Student>> {
        self.get_student_by_email_impl(email).await
    }

    async fn get_student_by_user_id(&self, user_id: i64) -> Result<Option<Student>> {
        self.get_student_by_user_id_impl(user_id).await
    }

    async fn get_students_by_ids(&self, ids: &[i64]) -> Result<Vec<Student>> {
        self.get_students_by_ids_impl(ids).await
    }

    async fn list_students_with_pagination(
        &self,
        query: StudentListQuery,
    ) -> Result<StudentListResponse> {
        self.list_students_with_pagination_impl(query).await
    }

    async fn list_students(&self, filter: StudentFilter) -> Result<Vec<Student>> {
        self.list_students_impl(filter).await
    }

    async fn update_student(
        &self,
        id: i64,
        update: UpdateStudentRequest,
    ) -> Result<Option<Student>> {
        self.update_student_impl(id, update).await
    }

    async fn set_student_enrollment_status(
        &self,
        id: i64,
        status: EnrollmentStatus,
    ) -> Result<Option<Student>> {
        self.set_student_enrollment_status_impl(id, status).await
    }

    async fn link_student_user(&self, student_id: i64, user_id: i64) -> Result<bool> {
        self.link_student_user_impl(student_id, user_id).await
    }

    async fn delete_student(&self, id: i64) -> Result<bool> {
        self.delete_student_impl(id).await
    }

    async fn count_students_by_status(&self) -> Result<Vec<(EnrollmentStatus, u64)>> {
        self.count_students_by_status_impl().await
    }

    // 教师模块
    async fn create_teacher_with_account(
        &self,
        user: NewUser,
        teacher: NewTeacher,
    ) -> Result<(User, Teacher)> {
        self.create_teacher_with_account_impl(user, teacher).await
    }

    async fn get_teacher_by_id(&self, id: i64) -> Result<Option<Teacher>> {
        self.get_teacher_by_id_impl(id).await
    }

    async fn get_teacher_by_user_id(&self, user_id: i64) -> Result<Option<Teacher>> {
        self.get_teacher_by_user_id_impl(user_id).await
    }

    async fn get_teacher_by_email(&self, email: &str) -> Result<Option<Teacher>> {
        self.get_teacher_by_email_impl(email).await
    }

    async fn list_teachers_with_pagination(
        &self,
        query: TeacherListQuery,
    ) -> Result<TeacherListResponse> {
        self.list_teachers_with_pagination_impl(query).await
    }

    async fn update_teacher(
        &self,
        id: i64,
        update: UpdateTeacherRequest,
    ) -> Result<Option<Teacher>> {
        self.update_teacher_impl(id, update).await
    }

    async fn delete_teacher(&self, id: i64) -> Result<bool> {
        self.delete_teacher_impl(id).await
    }

    async fn count_teachers(&self) -> Result<u64> {
        self.count_teachers_impl().await
    }

    // 班级模块
    async fn create_class(&self, class: CreateClassRequest) -> Result<Class> {
        self.create_class_impl(class).await
    }

    async fn get_class_by_id(&self, id: i64) -> Result<Option<Class>> {
        self.get_class_by_id_impl(id).await
    }

    async fn get_class_by_name(&self, name: &str) -> Result<Option<Class>> {
        self.get_class_by_name_impl(name).await
    }

    async fn list_classes_with_pagination(
        &self,
        query: ClassListQuery,
    ) -> Result<ClassListResponse> {
        self.list_classes_with_pagination_impl(query).await
    }

    async fn update_class(&self, id: i64, update: UpdateClassRequest) -> Result<Option<Class>> {
        self.update_class_impl(id, update).await
    }

    async fn delete_class(&self, id: i64) -> Result<bool> {
        self.delete_class_impl(id).await
    }

    async fn count_classes(&self) -> Result<u64> {
        self.count_classes_impl().await
    }

    async fn count_class_references(&self, name: &str) -> Result<u64> {
        self.count_class_references_impl(name).await
    }

    // 科目模块
    async fn create_subject(&self, subject: CreateSubjectRequest) -> Result<Subject> {
        self.create_subject_impl(subject).await
    }

    async fn get_subject_by_id(&self, id: i64) -> Result<Option<Subject>> {
        self.get_subject_by_id_impl(id).await
    }

    async fn get_subjects_by_ids(&self, ids: &[i64]) -> Result<Vec<Subject>> {
        self.get_subjects_by_ids_impl(ids).await
    }

    async fn list_subjects_with_pagination(
        &self,
        query: SubjectListQuery,
    ) -> Result<SubjectListResponse> {
        self.list_subjects_with_pagination_impl(query).await
    }

    async fn list_subjects_by_teacher(&self, teacher_id: i64) -> Result<Vec<Subject>> {
        self.list_subjects_by_teacher_impl(teacher_id).await
    }

    async fn update_subject(
        &self,
        id: i64,
        update: UpdateSubjectRequest,
    ) -> Result<Option<Subject>> {
        self.update_subject_impl(id, update).await
    }

    async fn delete_subject(&self, id: i64) -> Result<bool> {
        self.delete_subject_impl(id).await
    }

    async fn count_subjects(&self) -> Result<u64> {
        self.count_subjects_impl().await
    }

    // 评估与成绩模块
    async fn create_assessment(&self, assessment: CreateAssessmentRequest) -> Result<Assessment> {
        self.create_assessment_impl(assessment).await
    }

    async fn get_assessment_by_id(&self, id: i64) -> Result<Option<Assessment>> {
        self.get_assessment_by_id_impl(id).await
    }

    async fn get_assessments_by_ids(&self, ids: &[i64]) -> Result<Vec<Assessment>> {
        self.get_assessments_by_ids_impl(ids).await
    }

    async fn list_assessments_with_pagination(
        &self,
        query: AssessmentListQuery,
    ) -> Result<AssessmentListResponse> {
        self.list_assessments_with_pagination_impl(query).await
    }

    async fn update_assessment(
        &self,
        id: i64,
        update: UpdateAssessmentRequest,
    ) -> Result<Option<Assessment>> {
        self.update_assessment_impl(id, update).await
    }

    async fn delete_assessment(&self, id: i64) -> Result<bool> {
        self.delete_assessment_impl(id).await
    }

    async fn count_assessments_for_subjects(&self, subject_ids: &[i64]) -> Result<u64> {
        self.count_assessments_for_subjects_impl(subject_ids).await
    }

    async fn upsert_grades(
        &self,
        assessment_id: i64,
        entries: Vec<GradeEntry>,
        graded_by: i64,
    ) -> Result<Vec<Grade>> {
        self.upsert_grades_impl(assessment_id, entries, graded_by)
            .await
    }

    async fn list_grades_by_assessment(&self, assessment_id: i64) -> Result<Vec<Grade>> {
        self.list_grades_by_assessment_impl(assessment_id).await
    }

    async fn list_grades_by_student(&self, student_id: i64) -> Result<Vec<Grade>> {
        self.list_grades_by_student_impl(student_id).await
    }

    // 考勤模块
    async fn upsert_attendance(
        &self,
        class_name: &str,
        date: NaiveDate,
        subject_id: Option<i64>,
        entries: Vec<AttendanceEntry>,
        recorded_by: i64,
    ) -> Result<Vec<AttendanceRecord>> {
        self.upsert_attendance_impl(class_name, date, subject_id, entries, recorded_by)
            .await
    }

    async fn list_attendance_with_pagination(
        &self,
        query: AttendanceListQuery,
    ) -> Result<AttendanceListResponse> {
        self.list_attendance_with_pagination_impl(query).await
    }

    async fn list_attendance_statuses(
        &self,
        filter: AttendanceFilter,
    ) -> Result<Vec<AttendanceStatus>> {
        self.list_attendance_statuses_impl(filter).await
    }

    // 公告模块
    async fn create_announcement(&self, announcement: NewAnnouncement) -> Result<Announcement> {
        self.create_announcement_impl(announcement).await
    }

    async fn get_announcement_by_id(&self, id: i64) -> Result<Option<Announcement>> {
        self.get_announcement_by_id_impl(id).await
    }

    async fn list_announcements_with_pagination(
        &self,
        query: AnnouncementListQuery,
    ) -> Result<AnnouncementListResponse> {
        self.list_announcements_with_pagination_impl(query).await
    }

    async fn update_announcement(
        &self,
        id: i64,
        update: UpdateAnnouncementRequest,
    ) -> Result<Option<Announcement>> {
        self.update_announcement_impl(id, update).await
    }

    async fn delete_announcement(&self, id: i64) -> Result<bool> {
        self.delete_announcement_impl(id).await
    }

    // 学习资料模块
    async fn create_material(&self, material: NewMaterial) -> Result<Material> {
        self.create_material_impl(material).await
    }

    async fn get_material_by_id(&self, id: i64) -> Result<Option<Material>> {
        self.get_material_by_id_impl(id).await
    }

    async fn list_materials_with_pagination(
        &self,
        query: MaterialListQuery,
    ) -> Result<MaterialListResponse> {
        self.list_materials_with_pagination_impl(query).await
    }

    async fn update_material(
        &self,
        id: i64,
        update: UpdateMaterialRequest,
    ) -> Result<Option<Material>> {
        self.update_material_impl(id, update).await
    }

    async fn delete_material(&self, id: i64) -> Result<bool> {
        self.delete_material_impl(id).await
    }

    // 文件模块
    async fn create_file(&self, file: NewFile) -> Result<File> {
        self.create_file_impl(file).await
    }

    async fn get_file_by_token(&self, token: &str) -> Result<Option<File>> {
        self.get_file_by_token_impl(token).await
    }

    // 收款模块
    async fn create_payment(&self, payment: NewPayment) -> Result<Payment> {
        self.create_payment_impl(payment).await
    }

    async fn attach_payment_charge(
        &self,
        id: i64,
        external_id: &str,
        payment_url: Option<String>,
    ) -> Result<Option<Payment>> {
        self.attach_payment_charge_impl(id, external_id, payment_url)
            .await
    }

    async fn get_payment_by_id(&self, id: i64) -> Result<Option<Payment>> {
        self.get_payment_by_id_impl(id).await
    }

    async fn find_payment_by_external_id(
        &self,
        provider: PaymentProvider,
        external_id: &str,
    ) -> Result<Option<Payment>> {
        self.find_payment_by_external_id_impl(provider, external_id)
            .await
    }

    async fn list_payments_with_pagination(
        &self,
        query: PaymentListQuery,
    ) -> Result<PaymentListResponse> {
        self.list_payments_with_pagination_impl(query).await
    }

    async fn list_payments_by_student(&self, student_id: i64) -> Result<Vec<Payment>> {
        self.list_payments_by_student_impl(student_id).await
    }

    async fn mark_payment_paid(&self, id: i64, paid_at: i64) -> Result<bool> {
        self.mark_payment_paid_impl(id, paid_at).await
    }

    async fn update_payment_status(&self, id: i64, status: PaymentStatus) -> Result<bool> {
        self.update_payment_status_impl(id, status).await
    }

    async fn count_payments_by_status(&self, status: PaymentStatus) -> Result<u64> {
        self.count_payments_by_status_impl(status).await
    }

    async fn sum_payments_paid_since(&self, since: i64) -> Result<i64> {
        self.sum_payments_paid_since_impl(since).await
    }

    // 群发模块
    async fn create_broadcast(
        &self,
        broadcast: NewBroadcast,
        recipients: Vec<NewRecipient>,
    ) -> Result<Broadcast> {
        self.create_broadcast_impl(broadcast, recipients).await
    }

    async fn get_broadcast_by_id(&self, id: i64) -> Result<Option<Broadcast>> {
        self.get_broadcast_by_id_impl(id).await
    }

    async fn list_broadcasts_with_pagination(
        &self,
        page: Option<i64>,
        size: Option<i64>,
    ) -> Result<BroadcastListResponse> {
        self.list_broadcasts_with_pagination_impl(page, size).await
    }

    async fn list_broadcast_recipients(
        &self,
        broadcast_id: i64,
        status: Option<RecipientStatus>,
    ) -> Result<Vec<BroadcastRecipient>> {
        self.list_broadcast_recipients_impl(broadcast_id, status)
            .await
    }

    async fn mark_recipient_sent(&self, broadcast_id: i64, recipient_id: i64) -> Result<()> {
        self.mark_recipient_sent_impl(broadcast_id, recipient_id)
            .await
    }

    async fn mark_recipient_failed(
        &self,
        broadcast_id: i64,
        recipient_id: i64,
        error: &str,
    ) -> Result<()> {
        self.mark_recipient_failed_impl(broadcast_id, recipient_id, error)
            .await
    }

    async fn set_broadcast_status(&self, id: i64, status: BroadcastStatus) -> Result<bool> {
        self.set_broadcast_status_impl(id, status).await
    }

    async fn reset_failed_recipients(&self, broadcast_id: i64) -> Result<u64> {
        self.reset_failed_recipients_impl(broadcast_id).await
    }

    async fn pause_running_broadcasts(&self) -> Result<u64> {
        self.pause_running_broadcasts_impl().await
    }

    async fn count_active_broadcasts(&self) -> Result<u64> {
        self.count_active_broadcasts_impl().await
    }

    // 系统设置模块
    async fn list_all_settings(&self) -> Result<Vec<SystemSetting>> {
        self.list_all_settings_impl().await
    }

    async fn get_setting_by_key(&self, key: &str) -> Result<Option<SystemSetting>> {
        self.get_setting_by_key_impl(key).await
    }

    async fn update_setting(
        &self,
        key: &str,
        value: &str,
        user_id: i64,
        ip_address: Option<String>,
    ) -> Result<SystemSetting> {
        self.update_setting_impl(key, value, user_id, ip_address)
            .await
    }

    async fn list_setting_audits(
        &self,
        query: SettingAuditQuery,
    ) -> Result<SettingAuditListResponse> {
        self.list_setting_audits_impl(query).await
    }
}
