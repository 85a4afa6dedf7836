use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};

use crate::cache::{ObjectCache, user_token_key};
use crate::models::ApiResponse;
use crate::utils::jwt::JwtUtils;

/// 处理用户登出
///
/// 清空 refresh_token cookie，并移除当前 access token 对应的用户缓存。
pub async fn handle_logout(request: &HttpRequest) -> ActixResult<HttpResponse> {
    if let (Some(token), Some(cache)) = (
        JwtUtils::extract_bearer_token(request),
        request.app_data::<web::Data<Arc<dyn ObjectCache>>>(),
    ) {
        cache.remove(&user_token_key(&token)).await;
    }

    // max_age=0 会让浏览器删除该 cookie
    let empty_cookie = JwtUtils::create_empty_refresh_token_cookie();

    Ok(HttpResponse::Ok()
        .cookie(empty_cookie)
        .json(ApiResponse::<()>::success_empty("登出成功")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheResult;
    use crate::cache::object_cache::moka::MokaCacheWrapper;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn test_logout_clears_cookie_and_cache() {
        let cache: Arc<dyn ObjectCache> = Arc::new(MokaCacheWrapper::with_capacity(100, 60));
        cache
            .insert_raw(user_token_key("abc"), "{}".to_string(), 60)
            .await;

        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer abc"))
            .app_data(web::Data::new(cache.clone()))
            .to_http_request();
        let resp = handle_logout(&req).await.unwrap();

        let cookie = resp.cookies().find(|c| c.name() == "refresh_token").unwrap();
        assert_eq!(cookie.value(), "");
        assert!(matches!(
            cache.get_raw(&user_token_key("abc")).await,
            CacheResult::NotFound
        ));
    }
}
