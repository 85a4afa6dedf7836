use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::UserService;
use crate::models::users::requests::{UserListParams, UserListQuery};
use crate::models::{ApiResponse, internal_error_response};

/// 账号列表，按角色、状态与关键字（用户名、邮箱、显示名）过滤
pub async fn list_users(
    service: &UserService,
    query: UserListParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let query = UserListQuery::from(query);

    match service
        .get_storage(request)
        .list_users_with_pagination(query)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "获取用户列表成功"))),
        Err(e) => Ok(internal_error_response(format!("获取用户列表失败: {e}"))),
    }
}
