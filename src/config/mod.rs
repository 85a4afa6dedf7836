//! 静态配置
//!
//! 启动时从配置文件与环境变量加载，运行期间只读。
//! 可在线修改的配置见 `services::system::DynamicConfig`。

mod r#impl;
mod structs;

pub use structs::*;
