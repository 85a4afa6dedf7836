pub mod announcements;
pub mod attendance;
pub mod auth;
pub mod classes;
pub mod dashboard;
pub mod files;
pub mod functions;
pub mod grades;
pub mod integrations;
pub mod materials;
pub mod messaging;
pub mod payments;
pub mod portal;
pub mod students;
pub mod subjects;
pub mod system;
pub mod teachers;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

pub use announcements::AnnouncementService;
pub use attendance::AttendanceService;
pub use auth::AuthService;
pub use classes::ClassService;
pub use dashboard::DashboardService;
pub use files::FileService;
pub use functions::FunctionService;
pub use grades::GradeService;
pub use materials::MaterialService;
pub use messaging::MessagingService;
pub use payments::PaymentService;
pub use portal::PortalService;
pub use students::StudentService;
pub use subjects::SubjectService;
pub use system::SystemService;
pub use teachers::TeacherService;
pub use users::UserService;

use actix_web::{HttpRequest, HttpResponse};

use crate::middlewares::RequireJWT;
use crate::models::users::entities::User;
use crate::models::{ApiResponse, ErrorCode};

/// 当前登录用户；路由已挂 RequireJWT，取不到时按未登录处理
pub(crate) fn current_user(request: &HttpRequest) -> Result<User, HttpResponse> {
    RequireJWT::extract_user_claims(request).ok_or_else(|| {
        HttpResponse::Unauthorized().json(ApiResponse::error_empty(
            ErrorCode::Unauthorized,
            "用户未登录",
        ))
    })
}
