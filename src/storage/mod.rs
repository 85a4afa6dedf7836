use chrono::NaiveDate;

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

use crate::errors::Result;
use std::sync::Arc;

pub mod sea_orm_storage;

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 连通性检查
    async fn ping(&self) -> Result<()>;

    /// 用户管理方法
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    // 登录时按用户名或邮箱查找
    async fn get_user_by_username_or_email(&self, identifier: &str) -> Result<Option<User>>;
    async fn list_users_with_pagination(&self, query: UserListQuery) -> Result<UserListResponse>;
    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<Option<User>>;
    async fn set_user_status(&self, id: i64, status: UserStatus) -> Result<bool>;
    async fn delete_user(&self, id: i64) -> Result<bool>;
    async fn update_last_login(&self, id: i64) -> Result<bool>;
    async fn count_users(&self) -> Result<u64>;

    /// 学生与报名
    async fn create_student(&self, student: NewStudent) -> Result<Student>;
    // 同一事务内创建账号与学生记录，学生记录关联新账号
    async fn create_student_with_account(
        &self,
        user: NewUser,
        student: NewStudent,
    ) -> Result<(User, Student)>;
    async fn get_student_by_id(&self, id: i64) -> Result<Option<Student>>;
    async fn get_student_by_email(&self, email: &str) -> Result<Option<Student>>;
    async fn get_student_by_user_id(&self, user_id: i64) -> Result<Option<Student>>;
    async fn get_students_by_ids(&self, ids: &[i64]) -> Result<Vec<Student>>;
    async fn list_students_with_pagination(
        &self,
        query: StudentListQuery,
    ) -> Result<StudentListResponse>;
    async fn list_students(&self, filter: StudentFilter) -> Result<Vec<Student>>;
    async fn update_student(&self, id: i64, update: UpdateStudentRequest)
    -> Result<Option<Student>>;
    async fn set_student_enrollment_status(
        &self,
        id: i64,
        status: EnrollmentStatus,
    ) -> Result<Option<Student>>;
    async fn link_student_user(&self, student_id: i64, user_id: i64) -> Result<bool>;
    async fn delete_student(&self, id: i64) -> Result<bool>;
    async fn count_students_by_status(&self) -> Result<Vec<(EnrollmentStatus, u64)>>;

    /// 教师
    async fn create_teacher_with_account(
        &self,
        user: NewUser,
        teacher: NewTeacher,
    ) -> Result<(User, Teacher)>;
    async fn get_teacher_by_id(&self, id: i64) -> Result<Option<Teacher>>;
    async fn get_teacher_by_user_id(&self, user_id: i64) -> Result<Option<Teacher>>;
    async fn get_teacher_by_email(&self, email: &str) -> Result<Option<Teacher>>;
    async fn list_teachers_with_pagination(
        &self,
        query: TeacherListQuery,
    ) -> Result<TeacherListResponse>;
    async fn update_teacher(&self, id: i64, update: UpdateTeacherRequest)
    -> Result<Option<Teacher>>;
    // 删除教师档案及其登录账号
    async fn delete_teacher(&self, id: i64) -> Result<bool>;
    async fn count_teachers(&self) -> Result<u64>;

    /// 班级
    async fn create_class(&self, class: CreateClassRequest) -> Result<Class>;
    async fn get_class_by_id(&self, id: i64) -> Result<Option<Class>>;
    async fn get_class_by_name(&self, name: &str) -> Result<Option<Class>>;
    async fn list_classes_with_pagination(&self, query: ClassListQuery)
    -> Result<ClassListResponse>;
    async fn update_class(&self, id: i64, update: UpdateClassRequest) -> Result<Option<Class>>;
    async fn delete_class(&self, id: i64) -> Result<bool>;
    async fn count_classes(&self) -> Result<u64>;
    // 仍引用该班级名的学生与科目数量
    async fn count_class_references(&self, name: &str) -> Result<u64>;

    /// 科目
    async fn create_subject(&self, subject: CreateSubjectRequest) -> Result<Subject>;
    async fn get_subject_by_id(&self, id: i64) -> Result<Option<Subject>>;
    async fn get_subjects_by_ids(&self, ids: &[i64]) -> Result<Vec<Subject>>;
    async fn list_subjects_with_pagination(
        &self,
        query: SubjectListQuery,
    ) -> Result<SubjectListResponse>;
    async fn list_subjects_by_teacher(&self, teacher_id: i64) -> Result<Vec<Subject>>;
    async fn update_subject(&self, id: i64, update: UpdateSubjectRequest)
    -> Result<Option<Subject>>;
    async fn delete_subject(&self, id: i64) -> Result<bool>;
    async fn count_subjects(&self) -> Result<u64>;

    /// 评估与成绩
    async fn create_assessment(&self, assessment: CreateAssessmentRequest) -> Result<Assessment>;
    async fn get_assessment_by_id(&self, id: i64) -> Result<Option<Assessment>>;
    async fn get_assessments_by_ids(&self, ids: &[i64]) -> Result<Vec<Assessment>>;
    async fn list_assessments_with_pagination(
        &self,
        query: AssessmentListQuery,
    ) -> Result<AssessmentListResponse>;
    async fn update_assessment(
        &self,
        id: i64,
        update: UpdateAssessmentRequest,
    ) -> Result<Option<Assessment>>;
    async fn delete_assessment(&self, id: i64) -> Result<bool>;
    async fn count_assessments_for_subjects(&self, subject_ids: &[i64]) -> Result<u64>;
    // 按 (评估, 学生) 覆盖写入
    async fn upsert_grades(
        &self,
        assessment_id: i64,
        entries: Vec<GradeEntry>,
        graded_by: i64,
    ) -> Result<Vec<Grade>>;
    async fn list_grades_by_assessment(&self, assessment_id: i64) -> Result<Vec<Grade>>;
    async fn list_grades_by_student(&self, student_id: i64) -> Result<Vec<Grade>>;

    /// 考勤
    // 按 (学生, 日期, 科目) 覆盖写入
    async fn upsert_attendance(
        &self,
        class_name: &str,
        date: NaiveDate,
        subject_id: Option<i64>,
        entries: Vec<AttendanceEntry>,
        recorded_by: i64,
    ) -> Result<Vec<AttendanceRecord>>;
    async fn list_attendance_with_pagination(
        &self,
        query: AttendanceListQuery,
    ) -> Result<AttendanceListResponse>;
    async fn list_attendance_statuses(
        &self,
        filter: AttendanceFilter,
    ) -> Result<Vec<AttendanceStatus>>;

    /// 公告
    async fn create_announcement(&self, announcement: NewAnnouncement) -> Result<Announcement>;
    async fn get_announcement_by_id(&self, id: i64) -> Result<Option<Announcement>>;
    async fn list_announcements_with_pagination(
        &self,
        query: AnnouncementListQuery,
    ) -> Result<AnnouncementListResponse>;
    async fn update_announcement(
        &self,
        id: i64,
        update: UpdateAnnouncementRequest,
    ) -> Result<Option<Announcement>>;
    async fn delete_announcement(&self, id: i64) -> Result<bool>;

    /// 学习资料
    async fn create_material(&self, material: NewMaterial) -> Result<Material>;
    async fn get_material_by_id(&self, id: i64) -> Result<Option<Material>>;
    async fn list_materials_with_pagination(
        &self,
        query: MaterialListQuery,
    ) -> Result<MaterialListResponse>;
    async fn update_material(
        &self,
        id: i64,
        update: UpdateMaterialRequest,
    ) -> Result<Option<Material>>;
    async fn delete_material(&self, id: i64) -> Result<bool>;

    /// 文件管理方法
    async fn create_file(&self, file: NewFile) -> Result<File>;
    async fn get_file_by_token(&self, token: &str) -> Result<Option<File>>;

    /// 收款
    async fn create_payment(&self, payment: NewPayment) -> Result<Payment>;
    // 记录网关返回的收款信息
    async fn attach_payment_charge(
        &self,
        id: i64,
        external_id: &str,
        payment_url: Option<String>,
    ) -> Result<Option<Payment>>;
    async fn get_payment_by_id(&self, id: i64) -> Result<Option<Payment>>;
    async fn find_payment_by_external_id(
        &self,
        provider: PaymentProvider,
        external_id: &str,
    ) -> Result<Option<Payment>>;
    async fn list_payments_with_pagination(
        &self,
        query: PaymentListQuery,
    ) -> Result<PaymentListResponse>;
    async fn list_payments_by_student(&self, student_id: i64) -> Result<Vec<Payment>>;
    // 仅当尚未支付时生效，返回是否本次完成结算
    async fn mark_payment_paid(&self, id: i64, paid_at: i64) -> Result<bool>;
    // 已支付的收款不会被改回其他状态
    async fn update_payment_status(&self, id: i64, status: PaymentStatus) -> Result<bool>;
    async fn count_payments_by_status(&self, status: PaymentStatus) -> Result<u64>;
    async fn sum_payments_paid_since(&self, since: i64) -> Result<i64>;

    /// WhatsApp 群发
    async fn create_broadcast(
        &self,
        broadcast: NewBroadcast,
        recipients: Vec<NewRecipient>,
    ) -> Result<Broadcast>;
    async fn get_broadcast_by_id(&self, id: i64) -> Result<Option<Broadcast>>;
    async fn list_broadcasts_with_pagination(
        &self,
        page: Option<i64>,
        size: Option<i64>,
    ) -> Result<BroadcastListResponse>;
    async fn list_broadcast_recipients(
        &self,
        broadcast_id: i64,
        status: Option<RecipientStatus>,
    ) -> Result<Vec<BroadcastRecipient>>;
    async fn mark_recipient_sent(&self, broadcast_id: i64, recipient_id: i64) -> Result<()>;
    async fn mark_recipient_failed(
        &self,
        broadcast_id: i64,
        recipient_id: i64,
        error: &str,
    ) -> Result<()>;
    async fn set_broadcast_status(&self, id: i64, status: BroadcastStatus) -> Result<bool>;
    // 失败的接收人重置为待发送，返回重置数量
    async fn reset_failed_recipients(&self, broadcast_id: i64) -> Result<u64>;
    // 进程重启后，将遗留的运行中任务标记为暂停
    async fn pause_running_broadcasts(&self) -> Result<u64>;
    async fn count_active_broadcasts(&self) -> Result<u64>;

    /// 系统设置
    async fn list_all_settings(&self) -> Result<Vec<SystemSetting>>;
    async fn get_setting_by_key(&self, key: &str) -> Result<Option<SystemSetting>>;
    async fn update_setting(
        &self,
        key: &str,
        value: &str,
        user_id: i64,
        ip_address: Option<String>,
    ) -> Result<SystemSetting>;
    async fn list_setting_audits(&self, query: SettingAuditQuery)
    -> Result<SettingAuditListResponse>;
}

/// 按 `database.url` 连接数据库并执行迁移
pub async fn create_storage() -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}
