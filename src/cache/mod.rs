//! 对象缓存
//!
//! 后端通过 `declare_object_cache_plugin!` 在程序加载时注册，
//! 启动阶段按配置的 `cache.type` 选择（redis 失败时回退到 moka）。

pub mod object_cache;
pub mod register;

use async_trait::async_trait;

/// 缓存查询结果
#[derive(Debug, Clone, PartialEq)]
pub enum CacheResult<T> {
    Found(T),
    NotFound,
    /// 键存在但无法取值（后端错误等）
    ExistsButNoValue,
}

impl<T> CacheResult<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            CacheResult::Found(v) => Some(v),
            _ => None,
        }
    }
}

#[async_trait]
pub trait ObjectCache: Send + Sync {
    async fn get_raw(&self, key: &str) -> CacheResult<String>;

    /// ttl 为 0 时使用后端默认值
    async fn insert_raw(&self, key: String, value: String, ttl: u64);

    async fn remove(&self, key: &str);

    async fn invalidate_all(&self);
}

/// 注册缓存后端
///
/// ```rust,ignore
/// declare_object_cache_plugin!("moka", MokaCacheWrapper);
/// ```
#[macro_export]
macro_rules! declare_object_cache_plugin {
    ($name:literal, $ty:ty) => {
        #[ctor::ctor]
        unsafe fn __register_object_cache_plugin() {
            $crate::cache::register::register_object_cache_plugin(
                $name,
                std::sync::Arc::new(|| {
                    Box::pin(async {
                        let cache = <$ty>::new().map_err($crate::errors::PortalError::cache_connection)?;
                        Ok(Box::new(cache) as Box<dyn $crate::cache::ObjectCache>)
                    })
                }),
            );
        }
    };
}

/// 用户缓存键（按 access token 索引）
pub fn user_token_key(token: &str) -> String {
    format!("user:{token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_result_into_option() {
        assert_eq!(CacheResult::Found(3).into_option(), Some(3));
        assert_eq!(CacheResult::<i32>::NotFound.into_option(), None);
        assert_eq!(CacheResult::<i32>::ExistsButNoValue.into_option(), None);
    }

    #[test]
    fn test_user_token_key() {
        assert_eq!(user_token_key("abc"), "user:abc");
    }
}
