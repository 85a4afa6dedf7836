pub mod announcements;

pub mod assessments;

pub mod attendance;

pub mod auth;

pub mod classes;

pub mod dashboard;

pub mod enrollments;

pub mod files;

pub mod functions;

pub mod materials;

pub mod messaging;

pub mod payments;

pub mod portal;

pub mod students;

pub mod subjects;

pub mod system;

pub mod teachers;

pub mod users;

pub mod frontend;

pub use announcements::configure_announcement_routes;
pub use assessments::configure_assessment_routes;
pub use attendance::configure_attendance_routes;
pub use auth::configure_auth_routes;
pub use classes::configure_classes_routes;
pub use dashboard::configure_dashboard_routes;
pub use enrollments::configure_enrollment_routes;
pub use files::configure_file_routes;
pub use frontend::configure_frontend_routes;
pub use functions::configure_function_routes;
pub use materials::configure_material_routes;
pub use messaging::configure_messaging_routes;
pub use payments::{configure_payment_routes, configure_webhook_routes};
pub use portal::configure_portal_routes;
pub use students::configure_student_routes;
pub use subjects::configure_subject_routes;
pub use system::configure_system_routes;
pub use teachers::configure_teacher_routes;
pub use users::configure_user_routes;

use actix_web::web;

/// 注册全部 API 路由；前端兜底路由需最后注册
pub fn configure_api_routes(cfg: &mut web::ServiceConfig) {
    configure_auth_routes(cfg);
    configure_enrollment_routes(cfg);
    configure_user_routes(cfg);
    configure_student_routes(cfg);
    configure_teacher_routes(cfg);
    configure_classes_routes(cfg);
    configure_subject_routes(cfg);
    configure_assessment_routes(cfg);
    configure_attendance_routes(cfg);
    configure_announcement_routes(cfg);
    configure_material_routes(cfg);
    configure_file_routes(cfg);
    configure_payment_routes(cfg);
    configure_webhook_routes(cfg);
    configure_messaging_routes(cfg);
    configure_function_routes(cfg);
    configure_dashboard_routes(cfg);
    configure_portal_routes(cfg);
    configure_system_routes(cfg);
}
