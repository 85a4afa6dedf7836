use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use crate::models::auth::requests::UpdateProfileRequest;
use crate::models::users::requests::UserUpdate;
use crate::models::users::responses::UserResponse;
use crate::models::{ApiResponse, ErrorCode, internal_error_response};
use crate::services::current_user;
use crate::utils::normalize_phone;
use crate::utils::password::{hash_password, verify_password};
use crate::utils::validate::{validate_http_url, validate_password_simple, validate_required_text};

use super::AuthService;

fn bad_request(code: ErrorCode, message: impl Into<String>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(code, message)))
}

pub async fn handle_update_profile(
    service: &AuthService,
    update_data: UpdateProfileRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let current = match current_user(request) {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let storage = service.get_storage(request);

    // 中间件缓存的用户不含最新密码哈希，这里重新读取
    let user = match storage.get_user_by_id(current.id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::UserNotFound,
                "用户不存在",
            )));
        }
        Err(e) => return Ok(internal_error_response(format!("获取用户失败: {e}"))),
    };

    let mut update = UserUpdate::default();

    if let Some(name) = update_data.display_name {
        if let Err(msg) = validate_required_text(&name, "display_name", 100) {
            return bad_request(ErrorCode::BadRequest, msg);
        }
        update.display_name = Some(name.trim().to_string());
    }

    if let Some(phone) = update_data.phone {
        match normalize_phone(&phone) {
            Some(normalized) => update.phone = Some(normalized),
            None => return bad_request(ErrorCode::InvalidPhone, "手机号格式不正确"),
        }
    }

    if let Some(url) = update_data.avatar_url {
        if let Err(msg) = validate_http_url(&url) {
            return bad_request(ErrorCode::BadRequest, msg);
        }
        update.avatar_url = Some(url.trim().to_string());
    }

    // 修改密码必须先验证当前密码
    if let Some(new_password) = update_data.new_password {
        let confirmed = update_data
            .current_password
            .as_deref()
            .is_some_and(|current| verify_password(current, &user.password_hash));
        if !confirmed {
            return bad_request(ErrorCode::AuthFailed, "当前密码不正确");
        }
        if let Err(msg) = validate_password_simple(&new_password) {
            return bad_request(ErrorCode::UserPasswordInvalid, msg);
        }
        match hash_password(&new_password) {
            Ok(hash) => update.password_hash = Some(hash),
            Err(e) => return Ok(internal_error_response(format!("密码哈希失败: {e}"))),
        }
    }

    match storage.update_user(user.id, update).await {
        Ok(Some(user)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            UserResponse { user },
            "用户信息更新成功",
        ))),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::UserNotFound,
            "用户不存在",
        ))),
        Err(e) => Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::UserUpdateFailed,
            format!("更新用户信息失败: {e}"),
        ))),
    }
}
