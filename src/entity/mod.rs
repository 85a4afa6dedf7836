//! SeaORM 实体定义
//!
//! 与 models 模块中的业务实体分离：存储层用它们读写数据库，
//! 再通过各自的 `into_*` 转换为业务实体。时间统一存为秒级时间戳。

pub mod prelude;

pub mod announcements;
pub mod assessments;
pub mod attendance;
pub mod broadcast_recipients;
pub mod broadcasts;
pub mod classes;
pub mod files;
pub mod grades;
pub mod materials;
pub mod payments;
pub mod students;
pub mod subjects;
pub mod system_settings;
pub mod system_settings_audit;
pub mod teachers;
pub mod users;
