/*!
 * JWT 认证中间件
 *
 * 校验 `Authorization: Bearer <token>` 中的 access token，并把当前用户放进请求扩展。
 *
 * ```rust,ignore
 * web::scope("/api/v1/students")
 *     .wrap(RequireRole::new_any(UserRole::admin_roles()))
 *     .wrap(RequireJWT)
 * ```
 *
 * 用户先按 token 从缓存读取，未命中再查库；只有 `active` 账号可以通过。
 * 报名待审核的学生（`pending`）与被停用的账号在这里被拒绝。
 */

use crate::cache::{CacheResult, ObjectCache, user_token_key};
use crate::config::AppConfig;
use crate::models::ErrorCode;
use crate::models::users::entities::{User, UserRole, UserStatus};
use crate::storage::Storage;
use crate::utils::jwt::JwtUtils;
use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
    web,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::{rc::Rc, sync::Arc};
use tracing::{debug, info};

use super::create_error_response;

#[derive(Clone)]
pub struct RequireJWT;

/// 认证失败原因
#[derive(Debug, PartialEq, Eq)]
enum AuthFailure {
    MissingToken,
    InvalidToken,
    UserNotFound,
    Inactive(UserStatus),
    Internal,
}

impl AuthFailure {
    fn status(&self) -> StatusCode {
        match self {
            AuthFailure::Inactive(_) => StatusCode::FORBIDDEN,
            AuthFailure::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn code(&self) -> ErrorCode {
        match self {
            AuthFailure::MissingToken => ErrorCode::Unauthorized,
            AuthFailure::InvalidToken | AuthFailure::UserNotFound => ErrorCode::InvalidToken,
            AuthFailure::Inactive(UserStatus::Pending) => ErrorCode::EnrollmentPending,
            AuthFailure::Inactive(_) => ErrorCode::AccountDisabled,
            AuthFailure::Internal => ErrorCode::InternalServerError,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AuthFailure::MissingToken => "Missing or invalid Authorization header",
            AuthFailure::InvalidToken => "Invalid or expired token",
            AuthFailure::UserNotFound => "User not found",
            AuthFailure::Inactive(UserStatus::Pending) => "Enrollment pending approval",
            AuthFailure::Inactive(_) => "Account is disabled",
            AuthFailure::Internal => "Authentication unavailable",
        }
    }
}

/// 登录前检查账号状态，与中间件的拒绝规则一致
pub fn check_user_status(user: &User) -> Result<(), (StatusCode, ErrorCode, &'static str)> {
    if user.is_active() {
        return Ok(());
    }
    let failure = AuthFailure::Inactive(user.status);
    Err((failure.status(), failure.code(), failure.message()))
}

async fn authenticate(req: &ServiceRequest) -> Result<User, AuthFailure> {
    let token = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(AuthFailure::MissingToken)?;

    let claims = JwtUtils::verify_access_token(token).map_err(|err| {
        info!("JWT token validation failed: {}", err);
        AuthFailure::InvalidToken
    })?;

    let cache = req
        .app_data::<web::Data<Arc<dyn ObjectCache>>>()
        .map(|data| data.get_ref().clone());

    let cache_key = user_token_key(token);
    if let Some(cache) = &cache {
        if let CacheResult::Found(json) = cache.get_raw(&cache_key).await {
            match serde_json::from_str::<User>(&json) {
                Ok(user) => return Ok(user),
                Err(_) => {
                    debug!("Dropping undecodable cached user for token");
                    cache.remove(&cache_key).await;
                }
            }
        }
    }

    let storage = req
        .app_data::<web::Data<Arc<dyn Storage>>>()
        .map(|data| data.get_ref().clone())
        .ok_or(AuthFailure::Internal)?;

    let user_id = claims.user_id().ok_or(AuthFailure::InvalidToken)?;
    let user = storage
        .get_user_by_id(user_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load user {} during authentication: {}", user_id, e);
            AuthFailure::Internal
        })?
        .ok_or(AuthFailure::UserNotFound)?;

    if !user.is_active() {
        return Err(AuthFailure::Inactive(user.status));
    }

    // 缓存中的用户带着密码哈希，便于改密码时校验
    if let Some(cache) = &cache
        && let Ok(user_json) = serde_json::to_string(&CachedUser::from(&user))
    {
        cache
            .insert_raw(cache_key, user_json, AppConfig::get().cache.default_ttl)
            .await;
    }

    Ok(user)
}

/// `User` 序列化时跳过密码哈希，缓存使用同字段的完整结构
#[derive(serde::Serialize)]
struct CachedUser<'a> {
    id: i64,
    username: &'a str,
    email: &'a str,
    password_hash: &'a str,
    role: UserRole,
    status: UserStatus,
    display_name: &'a Option<String>,
    phone: &'a Option<String>,
    avatar_url: &'a Option<String>,
    last_login: Option<chrono::DateTime<chrono::Utc>>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl<'a> From<&'a User> for CachedUser<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            id: user.id,
            username: &user.username,
            email: &user.email,
            password_hash: &user.password_hash,
            role: user.role,
            status: user.status,
            display_name: &user.display_name,
            phone: &user.phone,
            avatar_url: &user.avatar_url,
            last_login: user.last_login,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireJWT
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireJWTMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireJWTMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RequireJWTMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequireJWTMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        Box::pin(async move {
            if req.method() == actix_web::http::Method::OPTIONS {
                return Ok(req.into_response(
                    create_error_response(StatusCode::NO_CONTENT, ErrorCode::Success, "")
                        .map_into_right_body(),
                ));
            }

            match authenticate(&req).await {
                Ok(user) => {
                    debug!("JWT authentication successful for ID: {}", user.id);
                    req.extensions_mut().insert(user);
                    let res = srv.call(req).await?.map_into_left_body();
                    Ok(res)
                }
                Err(failure) => {
                    info!(
                        "JWT authentication failed for request to {}: {:?}",
                        req.path(),
                        failure
                    );
                    Ok(req.into_response(
                        create_error_response(failure.status(), failure.code(), failure.message())
                            .map_into_right_body(),
                    ))
                }
            }
        })
    }
}

impl RequireJWT {
    /// 从请求扩展中取出当前用户，须在 RequireJWT 之后使用
    pub fn extract_user_claims(req: &actix_web::HttpRequest) -> Option<User> {
        req.extensions().get::<User>().cloned()
    }

    pub fn extract_user_id(req: &actix_web::HttpRequest) -> Option<i64> {
        req.extensions().get::<User>().map(|user| user.id)
    }
}
