pub mod announcements;
pub mod attendance;
pub mod auth;
pub mod classes;
pub mod common;
pub mod dashboard;
pub mod files;
pub mod functions;
pub mod grades;
pub mod materials;
pub mod messaging;
pub mod payments;
pub mod students;
pub mod subjects;
pub mod system;
pub mod teachers;
pub mod users;

pub use common::{
    ApiResponse, FunctionResponse, PaginatedResponse, PaginationInfo, PaginationQuery,
    internal_error_response, portal_error_response,
};

/// 服务启动时间
#[derive(Debug, Clone, Copy)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

/// 业务错误码
///
/// 0 表示成功；1xxx 通用；2xxx 认证；3xxx 用户；4xxx 教务；
/// 5xxx 文件；6xxx 支付；7xxx 消息；8xxx 系统设置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    Conflict = 1009,
    RateLimitExceeded = 1029,
    InternalServerError = 1500,
    ServiceUnavailable = 1503,

    AuthFailed = 2000,
    EnrollmentPending = 2001,
    AccountDisabled = 2002,
    InvalidToken = 2003,

    UserNotFound = 3000,
    UserAlreadyExists = 3001,
    UserNameInvalid = 3002,
    UserEmailInvalid = 3003,
    UserPasswordInvalid = 3004,
    UserEmailAlreadyExists = 3005,
    UserUpdateFailed = 3006,
    UserDeleteFailed = 3007,
    UserCreationFailed = 3008,
    CanNotDeleteCurrentUser = 3009,
    UserLinkedToTeacher = 3010,

    StudentNotFound = 4000,
    StudentEmailAlreadyExists = 4001,
    StudentNotPending = 4002,
    StudentInvalid = 4003,
    TeacherNotFound = 4100,
    TeacherEmailAlreadyExists = 4101,
    ClassNotFound = 4200,
    ClassNameAlreadyExists = 4201,
    ClassInUse = 4202,
    SubjectNotFound = 4300,
    AssessmentNotFound = 4400,
    ScoreOutOfRange = 4401,
    GradePermissionDenied = 4402,
    AttendanceInvalid = 4500,
    AnnouncementNotFound = 4600,
    MaterialNotFound = 4700,
    MaterialSourceMissing = 4701,

    FileNotFound = 5000,
    FileUploadFailed = 5001,
    FileTypeNotAllowed = 5002,
    FileSizeExceeded = 5003,
    MultifileUploadNotAllowed = 5004,

    PaymentNotFound = 6000,
    PaymentGatewayError = 6001,
    PaymentProviderNotConfigured = 6002,
    PaymentInvalidState = 6003,
    WebhookUnauthorized = 6004,
    PaymentInvalid = 6005,

    MessagingNotConfigured = 7000,
    MessagingFailed = 7001,
    InvalidPhone = 7002,
    BroadcastNotFound = 7003,
    BroadcastInvalidState = 7004,
    BroadcastNoRecipients = 7005,

    SettingNotFound = 8000,
    SettingInvalidValue = 8001,
}
