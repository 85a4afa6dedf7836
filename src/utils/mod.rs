pub mod extractor;
pub mod file_magic;
pub mod http;
pub mod jwt;
pub mod parameter_error_handler;
pub mod password;
pub mod phone;
pub mod random_code;
pub mod sql;
pub mod time;
pub mod validate;

pub use extractor::{SafeFileToken, SafeIDI64, SafeSettingKey};
pub use file_magic::validate_magic_bytes;
pub use parameter_error_handler::{json_error_handler, query_error_handler};
pub use phone::normalize_phone;
pub use sql::{contains_pattern, escape_like_pattern};
