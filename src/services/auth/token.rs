use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use crate::middlewares::{check_user_status, create_error_response};
use crate::models::auth::responses::{
    RefreshTokenResponse, TokenVerificationResponse, UserInfoResponse,
};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::current_user;
use crate::services::system::DynamicConfig;
use crate::utils::jwt::JwtUtils;

use super::AuthService;

fn login_expired() -> HttpResponse {
    // 清除无效的 refresh token cookie
    HttpResponse::Unauthorized()
        .cookie(JwtUtils::create_empty_refresh_token_cookie())
        .json(ApiResponse::error_empty(
            ErrorCode::Unauthorized,
            "Login expired or invalid, please login again",
        ))
}

pub async fn handle_refresh_token(
    service: &AuthService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(refresh_token) = JwtUtils::extract_refresh_token_from_cookie(request) else {
        return Ok(HttpResponse::Unauthorized().json(ApiResponse::error_empty(
            ErrorCode::Unauthorized,
            "Unauthorized access, please login",
        )));
    };

    let claims = match JwtUtils::verify_refresh_token(&refresh_token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::info!("Refresh token rejected: {}", e);
            return Ok(login_expired());
        }
    };
    let Some(user_id) = claims.user_id() else {
        return Ok(login_expired());
    };

    // 令牌签发后账号可能已被删除、停用或改了角色，以数据库为准
    let storage = service.get_storage(request);
    let user = match storage.get_user_by_id(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return Ok(login_expired()),
        Err(e) => {
            tracing::error!("Refresh token user lookup failed: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    "Token refresh failed",
                )),
            );
        }
    };
    if let Err((status, code, message)) = check_user_status(&user) {
        return Ok(create_error_response(status, code, message));
    }

    let access_minutes = DynamicConfig::access_token_expiry().await;
    match JwtUtils::generate_access_token(user.id, user.role, access_minutes) {
        Ok(access_token) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            RefreshTokenResponse {
                access_token,
                expires_in: access_minutes * 60,
            },
            "Token refreshed successfully",
        ))),
        Err(e) => {
            tracing::error!("Failed to generate access token: {}", e);
            Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    "Token refresh failed",
                )),
            )
        }
    }
}

/// RequireJWT 已完成校验，能走到这里即有效
pub async fn handle_verify_token(request: &HttpRequest) -> ActixResult<HttpResponse> {
    if let Err(resp) = current_user(request) {
        return Ok(resp);
    }
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        TokenVerificationResponse { is_valid: true },
        "Token is valid",
    )))
}

pub async fn handle_get_user(request: &HttpRequest) -> ActixResult<HttpResponse> {
    match current_user(request) {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            UserInfoResponse { user },
            "User information retrieved successfully",
        ))),
        Err(resp) => Ok(resp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::entities::{UserRole, UserStatus};
    use crate::services::testing::{json_body, memory_storage, request_as, seed_user};
    use actix_web::{cookie::Cookie, http::StatusCode, test::TestRequest, web};

    async fn refresh_with(
        storage: &std::sync::Arc<dyn crate::storage::Storage>,
        token: &str,
    ) -> HttpResponse {
        let req = TestRequest::default()
            .app_data(web::Data::new(storage.clone()))
            .cookie(Cookie::new("refresh_token", token.to_string()))
            .to_http_request();
        handle_refresh_token(&AuthService::new_lazy(), &req).await.unwrap()
    }

    #[actix_web::test]
    async fn test_refresh_issues_access_token() {
        let storage = memory_storage().await;
        let user = seed_user(&storage, "prof.rui", UserRole::Teacher, UserStatus::Active).await;
        let pair =
            JwtUtils::generate_token_pair(user.id, user.role, 15, chrono::Duration::days(1)).unwrap();

        let resp = refresh_with(&storage, &pair.refresh_token).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        let claims =
            JwtUtils::verify_access_token(body["data"]["access_token"].as_str().unwrap()).unwrap();
        assert_eq!(claims.user_id(), Some(user.id));
    }

    #[actix_web::test]
    async fn test_refresh_rejects_access_token_and_disabled_user() {
        let storage = memory_storage().await;
        let user = seed_user(&storage, "aluno.x", UserRole::Student, UserStatus::Active).await;
        let pair =
            JwtUtils::generate_token_pair(user.id, user.role, 15, chrono::Duration::days(1)).unwrap();

        // access token 不能当 refresh token 用
        let resp = refresh_with(&storage, &pair.access_token).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        storage
            .set_user_status(user.id, UserStatus::Suspended)
            .await
            .unwrap();
        let resp = refresh_with(&storage, &pair.refresh_token).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_get_user_requires_login() {
        let storage = memory_storage().await;
        let anonymous = request_as(&storage, None, None);
        assert_eq!(
            handle_get_user(&anonymous).await.unwrap().status(),
            StatusCode::UNAUTHORIZED
        );

        let user = seed_user(&storage, "diretor", UserRole::Admin, UserStatus::Active).await;
        let req = request_as(&storage, Some(&user), None);
        let body = json_body(handle_get_user(&req).await.unwrap()).await;
        assert_eq!(body["data"]["user"]["username"], "diretor");
    }
}
